/// Default chunk size in words
pub const DEFAULT_MAX_WORDS: usize = 5000;

/// A word-aligned slice of the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the chunk sequence, from 0
    pub index: usize,

    /// Words joined with single spaces
    pub text: String,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Split `text` on whitespace and group the words into chunks of at most
/// `max_words`. Empty text yields no chunks; a `max_words` of 0 counts as 1.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(max_words.max(1))
        .enumerate()
        .map(|(index, group)| Chunk {
            index,
            text: group.join(" "),
        })
        .collect()
}
