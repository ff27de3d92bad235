//! # mailrag core
//!
//! Pure logic for mailrag: the message model, the message-to-chunk
//! pipeline, the embedding trait, the index store trait, and cosine
//! retrieval.
//!
//! This crate performs no filesystem walking, no network calls, and owns
//! no async runtime. The application crate supplies embedding backends,
//! persisted stores, and the CLI.
//!
//! ## Pipeline
//!
//! ```text
//! raw text ─▶ parse_message ─▶ BoilerplateStripper ─▶ SentenceSegmenter ─▶ ChunkBuilder
//!                                                                              │
//!                 Retriever ◀── IndexStore ◀── Embedder ◀───────────────────────┘
//! ```
//!
//! ```rust
//! use mailrag_core::pipeline::MessagePipeline;
//!
//! let raw = "Subject: Release\nFrom: Alice\nTo: Team\n\n\
//!            Hi Team,\nThe release is on Monday.\nThanks,\nAlice";
//! let chunks = MessagePipeline::default().process(raw, "release.txt").unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].content(), "The release is on Monday.");
//! ```

pub mod boilerplate;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod message;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod sentence;
pub mod store;
