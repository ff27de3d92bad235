use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use mailrag::config::{Config, IndexFormat, MalformedPolicy};
use mailrag::generation::Generator;
use mailrag::indexer::build_index;
use mailrag::query::{answer_question, search_index};
use mailrag::store::{open_store, JsonIndexStore, SqliteIndexStore};
use mailrag_core::embedding::Embedder;
use mailrag_core::error::{Error, Result as CoreResult};
use mailrag_core::store::IndexStore;

const DIMS: usize = 64;

/// Bag-of-words hashing embedder: deterministic and offline.
struct HashEmbedder {
    name: &'static str,
}

impl HashEmbedder {
    fn new() -> Self {
        Self { name: "hash-test" }
    }
}

fn fnv1a(word: &str) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        self.name
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed_many(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMS];
                v[0] = 0.1;
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| w.len() > 3)
                {
                    let slot = 1 + (fnv1a(&word.to_lowercase()) % (DIMS as u64 - 1)) as usize;
                    v[slot] += 1.0;
                }
                v
            })
            .collect())
    }
}

#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(Vec<String>, String)>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, context: &[String], question: &str) -> anyhow::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((context.to_vec(), question.to_string()));
        Ok(format!("answer from {} excerpts", context.len()))
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn setup_corpus() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let mail = tmp.path().join("emails");
    fs::create_dir_all(&mail).unwrap();

    write(
        &mail,
        "deploy.txt",
        "Subject: Deployment status\nFrom: Alice\nTo: Team\n\nHi Team,\n\
         The deployment is delayed due to a configuration issue. \
         We expect the deployment resolved by Friday.\nThanks,\nAlice",
    );
    write(
        &mail,
        "budget.txt",
        "Subject: Budget approval\nFrom: Carol\nTo: Finance\n\nHello Finance,\n\
         The marketing budget was approved yesterday. \
         Spending on advertising campaigns starts next quarter.\nRegards,\nCarol",
    );
    write(
        &mail,
        "party.txt",
        "Subject: Office party\nFrom: Dave\nTo: Everyone\n\nDear all,\n\
         The summer party happens in the garden. Bring snacks and music.\nCheers,\nDave",
    );
    write(&mail, "readme.md", "not a message");

    let config = Config::minimal(&mail, tmp.path().join("index.json"));
    (tmp, config)
}

#[tokio::test]
async fn test_index_then_search_finds_relevant_message() {
    let (_tmp, config) = setup_corpus();
    let store = JsonIndexStore::new(&config.index.path);
    let embedder = HashEmbedder::new();

    let report = build_index(&config, &embedder, &store).await.unwrap();
    assert_eq!(report.files_seen, 3);
    assert_eq!(report.files_chunked, 3);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.dims, Some(DIMS));
    assert_eq!(report.model_name, "hash-test");

    let index = store.load().await.unwrap();
    assert_eq!(index.len(), 3);
    let order: Vec<&str> = index.chunks.iter().map(|c| c.source_file.as_str()).collect();
    assert_eq!(order, vec!["budget.txt", "deploy.txt", "party.txt"]);

    let hits = search_index(&index, &embedder, "Why is the deployment delayed?", 2)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].source_file, "deploy.txt");
    assert!(hits[0].score >= hits[1].score);
    assert!(hits[0].text.contains("configuration issue"));
}

#[tokio::test]
async fn test_answer_receives_top_k_in_rank_order() {
    let (_tmp, config) = setup_corpus();
    let store = JsonIndexStore::new(&config.index.path);
    let embedder = HashEmbedder::new();
    build_index(&config, &embedder, &store).await.unwrap();

    let generator = RecordingGenerator::default();
    let outcome = answer_question(
        &embedder,
        &generator,
        &store,
        "  When is the budget spending starting?  ",
        2,
    )
    .await
    .unwrap();

    assert_eq!(outcome.answer, "answer from 2 excerpts");
    assert_eq!(outcome.results[0].source_file, "budget.txt");

    let calls = generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (context, question) = &calls[0];
    let expected: Vec<String> = outcome.results.iter().map(|r| r.text.clone()).collect();
    assert_eq!(context, &expected);
    assert_eq!(question, "When is the budget spending starting?");
}

#[tokio::test]
async fn test_json_and_sqlite_hold_identical_indexes() {
    let (tmp, mut config) = setup_corpus();
    let embedder = HashEmbedder::new();

    let json = JsonIndexStore::new(&config.index.path);
    build_index(&config, &embedder, &json).await.unwrap();

    config.index.path = tmp.path().join("index.sqlite");
    config.index.format = IndexFormat::Sqlite;
    let sqlite = open_store(&config.index);
    build_index(&config, &embedder, sqlite.as_ref()).await.unwrap();

    let from_json = json.load().await.unwrap();
    let from_sqlite = SqliteIndexStore::new(&config.index.path).load().await.unwrap();
    assert_eq!(from_json, from_sqlite);
}

#[tokio::test]
async fn test_model_mismatch_rejected() {
    let (_tmp, config) = setup_corpus();
    let store = JsonIndexStore::new(&config.index.path);
    build_index(&config, &HashEmbedder::new(), &store).await.unwrap();

    let other = HashEmbedder { name: "other-model" };
    let err = answer_question(&other, &RecordingGenerator::default(), &store, "budget?", 3)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("hash-test"), "{}", message);
    assert!(message.contains("other-model"), "{}", message);
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let (_tmp, config) = setup_corpus();
    let store = JsonIndexStore::new(&config.index.path);
    let embedder = HashEmbedder::new();
    build_index(&config, &embedder, &store).await.unwrap();

    let generator = RecordingGenerator::default();
    assert!(answer_question(&embedder, &generator, &store, "   ", 3)
        .await
        .is_err());
    assert!(generator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_file_aborts_by_default() {
    let (_tmp, config) = setup_corpus();
    write(&config.corpus.dir, "broken.txt", "From: Eve\nTo: Team\n\nNo subject.");
    let store = JsonIndexStore::new(&config.index.path);

    let err = build_index(&config, &HashEmbedder::new(), &store)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("broken.txt"));
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::MalformedMessage { field: "Subject" })
    ));
    assert!(!config.index.path.exists());
}

#[tokio::test]
async fn test_malformed_file_skipped_when_configured() {
    let (_tmp, mut config) = setup_corpus();
    write(&config.corpus.dir, "broken.txt", "From: Eve\nTo: Team\n\nNo subject.");
    config.corpus.on_malformed = MalformedPolicy::Skip;
    let store = JsonIndexStore::new(&config.index.path);

    let report = build_index(&config, &HashEmbedder::new(), &store)
        .await
        .unwrap();
    assert_eq!(report.files_seen, 4);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.skipped_files.len(), 1);
    assert_eq!(report.skipped_files[0].0, "broken.txt");
}

#[tokio::test]
async fn test_empty_message_reported_not_failed() {
    let (_tmp, config) = setup_corpus();
    write(
        &config.corpus.dir,
        "thanks.txt",
        "Subject: Thanks\nFrom: Frank\nTo: Team\n\nThanks, Frank",
    );
    let store = JsonIndexStore::new(&config.index.path);

    let report = build_index(&config, &HashEmbedder::new(), &store)
        .await
        .unwrap();
    assert_eq!(report.empty_files, vec!["thanks.txt".to_string()]);
    assert!(report.skipped_files.is_empty());
    assert_eq!(report.chunks, 3);
}

#[tokio::test]
async fn test_empty_corpus_builds_empty_index() {
    let tmp = TempDir::new().unwrap();
    let mail = tmp.path().join("emails");
    fs::create_dir_all(&mail).unwrap();
    let config = Config::minimal(&mail, tmp.path().join("index.json"));
    let store = JsonIndexStore::new(&config.index.path);
    let embedder = HashEmbedder::new();

    let report = build_index(&config, &embedder, &store).await.unwrap();
    assert_eq!(report.chunks, 0);
    assert_eq!(report.dims, None);

    let index = store.load().await.unwrap();
    assert!(index.is_empty());
    let hits = search_index(&index, &embedder, "anything at all", 3)
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_corrupt_index_detected_on_load() {
    let (_tmp, config) = setup_corpus();
    fs::write(&config.index.path, r#"{"version":1,"model_name":"hash-test","chunks":[{"chunk_id":0}]}"#)
        .unwrap();

    let store = JsonIndexStore::new(&config.index.path);
    let err = answer_question(
        &HashEmbedder::new(),
        &RecordingGenerator::default(),
        &store,
        "budget?",
        3,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptIndex(_))
    ));
}

#[tokio::test]
async fn test_rebuild_is_deterministic() {
    let (_tmp, config) = setup_corpus();
    let store = JsonIndexStore::new(&config.index.path);
    let embedder = HashEmbedder::new();

    build_index(&config, &embedder, &store).await.unwrap();
    let first = store.load().await.unwrap();
    build_index(&config, &embedder, &store).await.unwrap();
    let second = store.load().await.unwrap();
    assert_eq!(first, second);
}
