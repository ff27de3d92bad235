//! Sentence-boundary chunk builder.
//!
//! Packs a message's sentences into [`Chunk`]s whose content holds at
//! most `max_words` words, and prefixes every chunk with the message's
//! header block so each chunk is self-describing when retrieved alone.
//!
//! # Algorithm
//!
//! 1. Keep a buffer of sentences and its running word count.
//! 2. For each sentence: if adding it would push the count over
//!    `max_words` and the buffer is non-empty, flush the buffer as a
//!    chunk and start a new one.
//! 3. Append the sentence to the buffer.
//! 4. Flush whatever remains.
//!
//! Boundaries always fall between sentences. A single sentence longer
//! than `max_words` is never split; it forms a chunk on its own.
//!
//! # Example
//!
//! ```rust
//! use mailrag_core::chunk::ChunkBuilder;
//! use mailrag_core::models::Message;
//!
//! let msg = Message {
//!     subject: "Status".into(),
//!     sender: "Alice".into(),
//!     receiver: "Team".into(),
//!     body: String::new(),
//! };
//! let sentences = vec!["One two.".to_string(), "Three four.".to_string()];
//! let chunks = ChunkBuilder::new(3).build(&msg, &sentences);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].chunk_id, 1);
//! ```

use crate::models::{Chunk, Message, CONTENT_MARKER};

/// Default content word budget per chunk.
pub const DEFAULT_MAX_WORDS: usize = 350;

#[derive(Debug, Clone, Copy)]
pub struct ChunkBuilder {
    max_words: usize,
}

impl Default for ChunkBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORDS)
    }
}

impl ChunkBuilder {
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Pack `sentences` into chunks with contiguous ids starting at 0.
    ///
    /// `source_file` is left empty; the caller tags chunks with their
    /// origin. No sentences means no chunks.
    pub fn build(&self, message: &Message, sentences: &[String]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut word_count = 0usize;

        for sentence in sentences {
            let words = sentence.split_whitespace().count();

            if word_count + words > self.max_words && !current.is_empty() {
                chunks.push(make_chunk(message, chunks.len(), &current));
                current.clear();
                word_count = 0;
            }

            current.push(sentence);
            word_count += words;
        }

        if !current.is_empty() {
            chunks.push(make_chunk(message, chunks.len(), &current));
        }

        chunks
    }
}

/// Render the header block followed by the content block.
pub fn build_chunk_text(subject: &str, sender: &str, receiver: &str, content: &str) -> String {
    format!(
        "Subject: {}\nFrom: {}\nTo: {}\n{}{}\n",
        subject, sender, receiver, CONTENT_MARKER, content
    )
}

fn make_chunk(message: &Message, chunk_id: usize, sentences: &[&str]) -> Chunk {
    Chunk {
        chunk_id,
        text: build_chunk_text(
            &message.subject,
            &message.sender,
            &message.receiver,
            &sentences.join(" "),
        ),
        source_file: String::new(),
        embedding: None,
    }
}
