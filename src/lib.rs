//! # mailrag
//!
//! Turn a directory of plain-text email messages into a semantic index,
//! then answer natural-language questions by retrieving the most similar
//! chunks and handing them to a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ CorpusWalker│──▶│ Chunk+Embed  │──▶│ JSON/SQLite  │
//! │  *.txt mail │   │ (core+model) │   │    index     │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                        ┌────────────────────┘
//!                        ▼
//!                 ┌──────────────┐   ┌──────────────┐
//!                 │  Retriever   │──▶│  Generator   │
//!                 │ cosine top-K │   │  (chat LLM)  │
//!                 └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mailrag index                          # build the index
//! mailrag search "deployment delay"      # ranked chunks only
//! mailrag query "Why is the deployment late?"
//! mailrag stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Directory walk and per-file chunking |
//! | [`embedding`] | Embedding providers |
//! | [`store`] | JSON and SQLite index files |
//! | [`indexer`] | The indexing pass |
//! | [`query`] | Retrieval and answering |
//! | [`generation`] | Prompt template and chat-completion client |
//! | [`http`] | Retrying JSON client shared by remote providers |

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod generation;
pub mod http;
pub mod indexer;
pub mod query;
pub mod store;
