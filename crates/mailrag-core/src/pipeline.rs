//! Per-message normalization pipeline.
//!
//! Drives one raw message through parse → strip → segment → chunk and
//! tags each chunk with its source file. Every message is processed
//! independently; nothing is shared between files.

use tracing::debug;

use crate::boilerplate::BoilerplateStripper;
use crate::chunk::ChunkBuilder;
use crate::error::Result;
use crate::message::parse_message;
use crate::models::Chunk;
use crate::sentence::{PunctuationSegmenter, SentenceSegmenter};

pub struct MessagePipeline {
    stripper: BoilerplateStripper,
    segmenter: Box<dyn SentenceSegmenter>,
    builder: ChunkBuilder,
}

impl Default for MessagePipeline {
    fn default() -> Self {
        Self::new(ChunkBuilder::default())
    }
}

impl MessagePipeline {
    pub fn new(builder: ChunkBuilder) -> Self {
        Self {
            stripper: BoilerplateStripper::default(),
            segmenter: Box::new(PunctuationSegmenter),
            builder,
        }
    }

    pub fn with_stripper(mut self, stripper: BoilerplateStripper) -> Self {
        self.stripper = stripper;
        self
    }

    pub fn with_segmenter(mut self, segmenter: impl SentenceSegmenter + 'static) -> Self {
        self.segmenter = Box::new(segmenter);
        self
    }

    pub fn max_words(&self) -> usize {
        self.builder.max_words()
    }

    /// Turn one raw message into its chunks.
    ///
    /// An empty result is valid: the body held nothing but boilerplate.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedMessage`](crate::error::Error::MalformedMessage)
    /// when a required header is missing.
    pub fn process(&self, raw: &str, source_file: &str) -> Result<Vec<Chunk>> {
        let message = parse_message(raw)?;
        let cleaned = self.stripper.strip(&message.body, &message.sender);
        let sentences = self.segmenter.segment(&cleaned);
        let mut chunks = self.builder.build(&message, &sentences);

        for chunk in &mut chunks {
            chunk.source_file = source_file.to_string();
        }

        debug!(
            source_file,
            sentences = sentences.len(),
            chunks = chunks.len(),
            "processed message"
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const EXAMPLE: &str = "Subject: Deployment\nFrom: Alice\nTo: Team\n\nHi Team,\nThe deployment is delayed due to a config issue. We expect it resolved by Friday.\nThanks,\nAlice";

    #[test]
    fn test_example_message_one_chunk() {
        let chunks = MessagePipeline::default().process(EXAMPLE, "deploy.txt").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].source_file, "deploy.txt");
        assert_eq!(
            chunks[0].content(),
            "The deployment is delayed due to a config issue. We expect it resolved by Friday."
        );
        assert!(chunks[0].text.starts_with("Subject: Deployment\nFrom: Alice\nTo: Team\n"));
        assert!(chunks[0].embedding.is_none());
    }

    #[test]
    fn test_salutation_only_body_yields_no_chunks() {
        let raw = "Subject: Thanks\nFrom: Alice\nTo: Bob\n\nThanks, Alice";
        let chunks = MessagePipeline::default().process(raw, "t.txt").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_malformed_propagates() {
        let raw = "Subject: x\nTo: Bob\n\nBody.";
        assert!(matches!(
            MessagePipeline::default().process(raw, "bad.txt"),
            Err(Error::MalformedMessage { field: "From" })
        ));
    }

    struct LineSegmenter;

    impl SentenceSegmenter for LineSegmenter {
        fn segment(&self, text: &str) -> Vec<String> {
            text.split(" | ").map(str::to_string).collect()
        }
    }

    #[test]
    fn test_custom_segmenter() {
        let raw = "Subject: s\nFrom: Zed\nTo: Bob\n\nalpha beta | gamma delta";
        let pipeline = MessagePipeline::new(ChunkBuilder::new(2)).with_segmenter(LineSegmenter);
        let chunks = pipeline.process(raw, "s.txt").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content(), "alpha beta");
        assert_eq!(chunks[1].content(), "gamma delta");
    }
}
