//! Integration tests for docbot
//!
//! These exercise the CLI end to end against a temporary project directory.
//! None of them reach the network.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a docbot Command with model credentials scrubbed
fn docbot(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("docbot");
    cmd.current_dir(dir.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("DOCBOT_MODEL")
        .env_remove("WHATSAPP_VERIFY_TOKEN")
        .env_remove("WHATSAPP_ACCESS_TOKEN")
        .env_remove("WHATSAPP_PHONE_NUMBER_ID")
        .env_remove("RUST_LOG");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write_history(dir: &TempDir, json: &str) {
    fs::create_dir_all(dir.path().join(".docbot")).unwrap();
    fs::write(dir.path().join(".docbot/history.json"), json).unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_docbot_help() {
        let dir = create_temp_project();
        docbot(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("ask"));
    }

    #[test]
    fn test_docbot_version() {
        let dir = create_temp_project();
        docbot(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_command_fails() {
        let dir = create_temp_project();
        docbot(&dir).arg("frobnicate").assert().failure();
    }

    #[test]
    fn test_missing_project_dir_fails() {
        let dir = create_temp_project();
        docbot(&dir)
            .args(["--project-dir", "does/not/exist", "history"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Conversation Commands
// =============================================================================

mod conversation {
    use super::*;

    #[test]
    fn test_history_creates_empty_record() {
        let dir = create_temp_project();

        docbot(&dir)
            .arg("history")
            .assert()
            .success()
            .stdout(predicate::str::contains("No conversation history."));

        let record = fs::read_to_string(dir.path().join(".docbot/history.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&record).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }

    #[test]
    fn test_history_prints_messages() {
        let dir = create_temp_project();
        write_history(
            &dir,
            r#"[{"role": "user", "content": "How much is design?"},
                {"role": "assistant", "content": "300 SAR"}]"#,
        );

        docbot(&dir)
            .arg("history")
            .assert()
            .success()
            .stdout(predicate::str::contains("[user] How much is design?"))
            .stdout(predicate::str::contains("[assistant] 300 SAR"));
    }

    #[test]
    fn test_malformed_history_fails() {
        let dir = create_temp_project();
        write_history(&dir, "[{\"role\": ");

        docbot(&dir).arg("history").assert().failure();
    }

    #[test]
    fn test_stats() {
        let dir = create_temp_project();
        write_history(
            &dir,
            r#"[{"role": "user", "content": "abcd"},
                {"role": "assistant", "content": "ab"}]"#,
        );

        docbot(&dir)
            .arg("stats")
            .assert()
            .success()
            .stdout(predicate::str::contains("Total messages:       2"))
            .stdout(predicate::str::contains("Avg user length:      4.0"));
    }

    #[test]
    fn test_clear() {
        let dir = create_temp_project();
        write_history(&dir, r#"[{"role": "user", "content": "hi"}]"#);
        fs::write(
            dir.path().join(".docbot/conversation_metadata.json"),
            r#"{"last_updated": "2026-01-01T00:00:00Z", "total_messages": 1,
                "config": {"max_history": 20, "important_messages": 6}}"#,
        )
        .unwrap();

        docbot(&dir)
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("history:  1 messages"))
            .stdout(predicate::str::contains("metadata: removed"));

        let record = fs::read_to_string(dir.path().join(".docbot/history.json")).unwrap();
        assert_eq!(record.trim(), "[]");
        assert!(!dir.path().join(".docbot/conversation_metadata.json").exists());
    }

    #[test]
    fn test_clear_recovers_corrupt_history() {
        let dir = create_temp_project();
        write_history(&dir, "{not json");

        docbot(&dir).arg("history").assert().failure();

        docbot(&dir)
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("history:  0 messages"));

        let record = fs::read_to_string(dir.path().join(".docbot/history.json")).unwrap();
        assert_eq!(record.trim(), "[]");

        docbot(&dir)
            .arg("history")
            .assert()
            .success()
            .stdout(predicate::str::contains("No conversation history."));
    }

    #[test]
    fn test_ask_without_api_key_fails() {
        let dir = create_temp_project();

        docbot(&dir)
            .args(["ask", "hello"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("OPENAI_API_KEY"));

        // The failed turn leaves the log untouched.
        let record = fs::read_to_string(dir.path().join(".docbot/history.json")).unwrap();
        assert_eq!(record.trim(), "[]");
    }

    #[test]
    fn test_ask_empty_question_fails() {
        let dir = create_temp_project();
        docbot(&dir)
            .args(["ask", "   "])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Question is empty"));
    }
}

// =============================================================================
// Service Catalog
// =============================================================================

mod services {
    use super::*;

    #[test]
    fn test_services_lists_catalog() {
        let dir = create_temp_project();
        fs::write(
            dir.path().join("service.json"),
            r#"[{"index": 1, "name": "Translation", "price": 150},
                {"index": 2, "name": "Design", "price": 300.5}]"#,
        )
        .unwrap();

        docbot(&dir)
            .arg("services")
            .assert()
            .success()
            .stdout(predicate::str::contains("1. Translation - 150 SAR"))
            .stdout(predicate::str::contains("2. Design - 300.5 SAR"));
    }

    #[test]
    fn test_services_without_catalog() {
        let dir = create_temp_project();
        docbot(&dir)
            .arg("services")
            .assert()
            .success()
            .stdout(predicate::str::contains("No services"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_init_creates_file() {
        let dir = create_temp_project();

        docbot(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created docbot.toml"));

        let content = fs::read_to_string(dir.path().join(".docbot/docbot.toml")).unwrap();
        assert!(content.contains("max_history = 20"));
        assert!(content.contains("[whatsapp]"));

        docbot(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_warns_about_missing_key() {
        let dir = create_temp_project();
        docbot(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("OPENAI_API_KEY is not set"));
    }

    #[test]
    fn test_config_validate_flags_bad_settings() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".docbot")).unwrap();
        fs::write(
            dir.path().join(".docbot/docbot.toml"),
            "[cache]\ncapacity = 10\nretain = 10\n",
        )
        .unwrap();

        docbot(&dir)
            .env("OPENAI_API_KEY", "sk-test")
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache.retain"));
    }

    #[test]
    fn test_config_show_uses_cli_model() {
        let dir = create_temp_project();
        docbot(&dir)
            .args(["--model", "gpt-4.1", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("model = \"gpt-4.1\""));
    }

    #[test]
    fn test_dotenv_supplies_api_key() {
        let dir = create_temp_project();
        fs::write(dir.path().join(".env"), "OPENAI_API_KEY=sk-from-dotenv\n").unwrap();

        docbot(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".docbot")).unwrap();
        fs::write(dir.path().join(".docbot/docbot.toml"), "[history\n").unwrap();

        docbot(&dir).arg("history").assert().failure();
    }
}
