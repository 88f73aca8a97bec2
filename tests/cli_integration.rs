use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const BACKUP: &str = r#"[
  {
    "id": "3f2c9a10-0000-4000-8000-000000000001",
    "theme": "Rust for beginners",
    "markdown": "Module 1: Foundations\nLesson 1: Setting up the toolchain\n- Objective: install everything\n- Topics: rustup, cargo\nLesson 2: First program\nModule 2: Going further\nLesson 1: Shipping it\n",
    "cached_lessons": { "1": "<article><p>Install rustup first.</p></article>" }
  }
]"#;

fn courseforge(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("courseforge").unwrap();
    cmd.env("COURSEFORGE_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn restored_home() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    let backup = home.path().join("backup.json");
    std::fs::write(&backup, BACKUP).unwrap();
    courseforge(home.path())
        .arg("restore")
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 syllabi"));
    home
}

#[test]
fn test_list_on_empty_home() {
    let home = tempfile::tempdir().unwrap();
    courseforge(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No syllabi yet"));
}

#[test]
fn test_restore_then_list_and_show() {
    let home = restored_home();
    assert!(home.path().join("history.json").exists());

    courseforge(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rust for beginners"))
        .stdout(predicate::str::contains("2 mod, 3 lessons"));

    courseforge(home.path())
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Module 2: Going further"))
        .stdout(predicate::str::contains("Shipping it"))
        .stdout(predicate::str::contains("install everything"));
}

#[test]
fn test_outline_saves_markdown() {
    let home = restored_home();
    let out = tempfile::tempdir().unwrap();

    courseforge(home.path())
        .args(["outline", "3f2c", "--save", "-o"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Lesson 2: First program"));

    let saved = out.path().join("syllabus-rust-for-beginners.md");
    let text = std::fs::read_to_string(saved).unwrap();
    assert!(text.starts_with("Module 1: Foundations"));
}

#[test]
fn test_generated_content_does_not_survive_restart() {
    let home = restored_home();

    // Restored content lives for the process that restored it; a new process starts cold.
    courseforge(home.path())
        .args(["preview", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No generated content for lesson 1"));

    courseforge(home.path())
        .args(["forget", "1", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing cached"));
}

#[test]
fn test_backup_writes_dated_file() {
    let home = restored_home();
    let out = tempfile::tempdir().unwrap();

    courseforge(home.path())
        .arg("backup")
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("backup-courses-"));

    let files: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("backup-courses-") && files[0].ends_with(".json"));
}

#[test]
fn test_restore_rejects_malformed_backup() {
    let home = tempfile::tempdir().unwrap();
    let backup = home.path().join("bad.json");
    std::fs::write(&backup, r#"[{"id": "x", "theme": "No outline"}]"#).unwrap();

    courseforge(home.path())
        .arg("restore")
        .arg(&backup)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid backup file"));
    assert!(!home.path().join("history.json").exists());
}

#[test]
fn test_generation_without_api_key() {
    let home = tempfile::tempdir().unwrap();
    courseforge(home.path())
        .args(["new", "Rust"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_validation_happens_before_any_call() {
    let home = tempfile::tempdir().unwrap();
    courseforge(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .args(["diagram", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please describe the concept"));

    courseforge(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .args(["new", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter a course theme"));
}

#[test]
fn test_config_set_and_show() {
    let home = tempfile::tempdir().unwrap();

    courseforge(home.path())
        .args(["config", "author", "Ada Lovelace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("author set to Ada Lovelace"));

    courseforge(home.path())
        .args(["config", "author"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"));

    courseforge(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("text_model = gemini-2.5-flash"))
        .stdout(predicate::str::contains("enhance_failure = degrade"));
}

#[test]
fn test_unknown_syllabus_selector() {
    let home = restored_home();
    courseforge(home.path())
        .args(["show", "zzz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syllabus not found: zzz"));
}

#[test]
fn test_shell_session_keeps_generated_content() {
    let home = tempfile::tempdir().unwrap();
    let backup = home.path().join("backup.json");
    std::fs::write(&backup, BACKUP).unwrap();
    let out = tempfile::tempdir().unwrap();

    let script = format!(
        "restore \"{}\"\nshow 1\npreview 1 1\nbackup -o \"{}\"\nforget 1 1\nforget 1 1\npreview 1 1\nexit\n",
        backup.display(),
        out.path().display()
    );

    courseforge(home.path())
        .arg("shell")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 syllabi (1 cached lessons)"))
        .stdout(predicate::str::contains("✓"))
        .stdout(predicate::str::contains("Install rustup first."))
        .stdout(predicate::str::contains("Generated content removed"))
        .stdout(predicate::str::contains("Nothing cached"))
        .stderr(predicate::str::contains("No generated content for lesson 1"));

    let saved: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 1);
    let written = std::fs::read_to_string(&saved[0]).unwrap();
    assert!(written.contains("Install rustup first."));
}

#[test]
fn test_shell_keeps_going_after_bad_lines() {
    let home = restored_home();

    courseforge(home.path())
        .arg("shell")
        .write_stdin("bogus\nnew \"unterminated\nshell\nshow zzz\nlist\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rust for beginners"))
        .stderr(predicate::str::contains("unrecognized subcommand"))
        .stderr(predicate::str::contains("missing closing \""))
        .stderr(predicate::str::contains("Already in an interactive session"))
        .stderr(predicate::str::contains("Syllabus not found: zzz"));
}
