//! Corpus walker.
//!
//! Scans the configured message directory, runs every eligible file
//! through the [`MessagePipeline`], and concatenates the resulting chunks
//! into one corpus-wide sequence. Files are visited in sorted
//! relative-path order, so the corpus order is deterministic for a given
//! directory snapshot.
//!
//! Each file gets a [`FileOutcome`]: chunked, empty (nothing left after
//! boilerplate stripping, a valid result), or failed. A failure either
//! aborts the walk or is recorded and skipped, per
//! [`MalformedPolicy`].

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use mailrag_core::chunk::ChunkBuilder;
use mailrag_core::models::Chunk;
use mailrag_core::pipeline::MessagePipeline;

use crate::config::{Config, CorpusConfig, MalformedPolicy};

/// What happened to one message file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Produced this many chunks.
    Chunked(usize),
    /// Parsed fine but yielded zero chunks.
    Empty,
    /// Could not be read or parsed; the message explains why.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    /// Path relative to the corpus root; also the chunks' `source_file`.
    pub source_file: String,
    pub outcome: FileOutcome,
}

/// Result of one walk over the corpus directory.
#[derive(Debug, Default)]
pub struct Corpus {
    pub chunks: Vec<Chunk>,
    pub files: Vec<FileReport>,
}

impl Corpus {
    pub fn files_chunked(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Chunked(_)))
            .count()
    }

    pub fn empty_files(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Empty)
            .map(|f| f.source_file.as_str())
            .collect()
    }

    pub fn failed_files(&self) -> Vec<(&str, &str)> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Failed(reason) => Some((f.source_file.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

pub struct CorpusWalker {
    config: CorpusConfig,
    pipeline: MessagePipeline,
}

impl CorpusWalker {
    pub fn new(config: CorpusConfig, pipeline: MessagePipeline) -> Self {
        Self { config, pipeline }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.corpus.clone(),
            MessagePipeline::new(ChunkBuilder::new(config.chunking.max_words)),
        )
    }

    /// Sorted `(absolute path, relative identifier)` pairs of eligible files.
    pub fn discover(&self) -> Result<Vec<(PathBuf, String)>> {
        let root = &self.config.dir;
        if !root.is_dir() {
            bail!("Corpus directory does not exist: {}", root.display());
        }

        let include_set = build_globset(&self.config.include_globs)?;

        let mut default_excludes = vec!["**/.git/**".to_string()];
        default_excludes.extend(self.config.exclude_globs.clone());
        let exclude_set = build_globset(&default_excludes)?;

        let mut files = Vec::new();
        let walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }

            files.push((path.to_path_buf(), rel_str));
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }

    /// Walk the corpus and chunk every eligible file.
    ///
    /// # Errors
    ///
    /// Under [`MalformedPolicy::Abort`], the first unreadable or malformed
    /// file aborts the walk with an error naming that file. Directory
    /// traversal errors always abort.
    pub fn walk(&self) -> Result<Corpus> {
        let files = self.discover()?;
        let mut corpus = Corpus::default();

        for (path, source_file) in files {
            match self.process_file(&path, &source_file) {
                Ok(chunks) if chunks.is_empty() => {
                    warn!(source_file = %source_file, "message has no content after boilerplate removal");
                    corpus.files.push(FileReport {
                        source_file,
                        outcome: FileOutcome::Empty,
                    });
                }
                Ok(chunks) => {
                    debug!(source_file = %source_file, chunks = chunks.len(), "chunked message");
                    corpus.files.push(FileReport {
                        source_file,
                        outcome: FileOutcome::Chunked(chunks.len()),
                    });
                    corpus.chunks.extend(chunks);
                }
                Err(e) => match self.config.on_malformed {
                    MalformedPolicy::Abort => return Err(e),
                    MalformedPolicy::Skip => {
                        warn!(source_file = %source_file, error = %format!("{:#}", e), "skipping message");
                        corpus.files.push(FileReport {
                            source_file,
                            outcome: FileOutcome::Failed(format!("{:#}", e)),
                        });
                    }
                },
            }
        }

        info!(
            files = corpus.files.len(),
            chunks = corpus.chunks.len(),
            "corpus walk complete"
        );
        Ok(corpus)
    }

    fn process_file(&self, path: &Path, source_file: &str) -> Result<Vec<Chunk>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message file {}", source_file))?;
        let chunks = self
            .pipeline
            .process(&raw, source_file)
            .with_context(|| format!("Failed to parse message {}", source_file))?;
        Ok(chunks)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
