use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use mailrag::store::JsonIndexStore;
use mailrag_core::models::{Chunk, Index};
use mailrag_core::store::IndexStore;

fn mailrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mailrag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let mail_dir = root.join("emails");
    fs::create_dir_all(mail_dir.join("2024")).unwrap();
    fs::write(
        mail_dir.join("deploy.txt"),
        "Subject: Deployment\nFrom: Alice\nTo: Team\n\nHi Team,\nThe deployment is delayed due to a config issue. We expect it resolved by Friday.\nThanks,\nAlice",
    )
    .unwrap();
    fs::write(
        mail_dir.join("2024/offsite.txt"),
        "Subject: Offsite\nFrom: Bob\nTo: Team\n\nHello all,\nThe offsite moves to the lake house. Buses leave at nine.\nCheers,\nBob",
    )
    .unwrap();
    fs::write(
        mail_dir.join("thanks.txt"),
        "Subject: Thanks\nFrom: Carol\nTo: Team\n\nThanks, Carol",
    )
    .unwrap();
    fs::write(mail_dir.join("notes.md"), "# not an email").unwrap();

    let config_content = format!(
        r#"[corpus]
dir = "{}/emails"

[index]
path = "{}/email_index.json"

[embedding]
provider = "disabled"

[generation]
provider = "disabled"
"#,
        root.display(),
        root.display()
    );

    let config_path = root.join("mailrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mailrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mailrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("MAILRAG_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mailrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn write_index(path: &Path) {
    let index = Index::new(
        "hash-test",
        vec![
            Chunk {
                chunk_id: 0,
                text: "Subject: Deployment\nFrom: Alice\nTo: Team\n\nContent:\nDelayed.\n"
                    .to_string(),
                source_file: "deploy.txt".to_string(),
                embedding: Some(vec![1.0, 0.0, 0.0]),
            },
            Chunk {
                chunk_id: 0,
                text: "Subject: Offsite\nFrom: Bob\nTo: Team\n\nContent:\nLake house.\n"
                    .to_string(),
                source_file: "2024/offsite.txt".to_string(),
                embedding: Some(vec![0.0, 1.0, 0.0]),
            },
        ],
    );
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(JsonIndexStore::new(path).save(&index))
        .unwrap();
}

#[test]
fn test_index_dry_run_reports_counts() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mailrag(&config_path, &["index", "--dry-run"]);
    assert!(success, "dry run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files found: 3"), "{}", stdout);
    assert!(stdout.contains("files chunked: 2"), "{}", stdout);
    assert!(stdout.contains("chunks: 2"), "{}", stdout);
    assert!(stdout.contains("empty messages: 1"), "{}", stdout);
    assert!(stdout.contains("thanks.txt"), "{}", stdout);
    assert!(!tmp.path().join("email_index.json").exists());
}

#[test]
fn test_index_with_disabled_embedder_fails() {
    let (tmp, config_path) = setup_test_env();

    let (_stdout, stderr, success) = run_mailrag(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "{}", stderr);
    assert!(!tmp.path().join("email_index.json").exists());
}

#[test]
fn test_index_disabled_embedder_with_empty_corpus_fails() {
    let (tmp, config_path) = setup_test_env();
    let mail_dir = tmp.path().join("emails");
    fs::remove_dir_all(&mail_dir).unwrap();
    fs::create_dir_all(&mail_dir).unwrap();

    let (stdout, stderr, success) = run_mailrag(&config_path, &["index"]);
    assert!(!success, "index succeeded: stdout={}", stdout);
    assert!(stderr.contains("embedding provider is disabled"), "{}", stderr);
    assert!(!tmp.path().join("email_index.json").exists());
}

#[test]
fn test_malformed_message_aborts_index() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("emails/broken.txt"),
        "Subject: Missing sender\nTo: Team\n\nBody.",
    )
    .unwrap();

    let (_stdout, stderr, success) = run_mailrag(&config_path, &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("broken.txt"), "{}", stderr);
    assert!(stderr.contains("From"), "{}", stderr);
}

#[test]
fn test_stats_without_index_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_stdout, stderr, success) = run_mailrag(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("mailrag index"), "{}", stderr);
}

#[test]
fn test_stats_describes_index() {
    let (tmp, config_path) = setup_test_env();
    write_index(&tmp.path().join("email_index.json"));

    let (stdout, stderr, success) = run_mailrag(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("hash-test"), "{}", stdout);
    assert!(stdout.contains("Dimensions:   3"), "{}", stdout);
    assert!(stdout.contains("Chunks:       2"), "{}", stdout);
    assert!(stdout.contains("Source files: 2"), "{}", stdout);
}

#[test]
fn test_search_rejects_model_mismatch() {
    let (tmp, config_path) = setup_test_env();
    write_index(&tmp.path().join("email_index.json"));

    let (_stdout, stderr, success) = run_mailrag(&config_path, &["search", "deployment"]);
    assert!(!success);
    assert!(stderr.contains("hash-test"), "{}", stderr);
    assert!(stderr.contains("Rebuild"), "{}", stderr);
}

#[test]
fn test_corrupt_index_reported() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("email_index.json"), "{ not json").unwrap();

    let (_stdout, stderr, success) = run_mailrag(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("corrupt index"), "{}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _config_path) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(
        &bad,
        "[corpus]\ndir = \"emails\"\n\n[index]\npath = \"i.json\"\n\n[chunking]\nmax_words = 0\n",
    )
    .unwrap();

    let (_stdout, stderr, success) = run_mailrag(&bad, &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("max_words"), "{}", stderr);
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_stdout, stderr, success) = run_mailrag(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "{}", stderr);
}
