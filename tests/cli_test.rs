//! CLI integration tests for the intake-schema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("intake-schema"));
    cmd.env_remove("INTAKE_SCHEMA_SPECS_ROOT");
    cmd
}

fn specs_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/intake")
}

fn latest_schema(relative: &str) -> PathBuf {
    specs_root().join("latest_used/docs/spec").join(relative)
}

// Helper to create a temp payload file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const SPAN: &str = r#"{
    "id": "0123456789abcdef",
    "transaction_id": "945254c567a5417e",
    "trace_id": "0123456789abcdef0123456789abcdef",
    "parent_id": "945254c567a5417e",
    "name": "SELECT FROM orders",
    "type": "db",
    "duration": 3.25
}"#;

mod validate_command {
    use super::*;

    #[test]
    fn validate_valid_payload() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "span.json", SPAN);

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn specs_root_from_environment() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "span.json", SPAN);

        cmd()
            .env("INTAKE_SCHEMA_SPECS_ROOT", specs_root())
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .assert()
            .success();
    }

    #[test]
    fn validate_missing_required_field() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(
            &dir,
            "span.json",
            r#"{"id":"0123456789abcdef","name":"x","type":"db","duration":1}"#,
        );

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed (latest/permissive)"))
            .stderr(predicate::str::contains(
                "Serialized data failed APM Server Intake API JSON schema validation.",
            ))
            .stderr(predicate::str::contains("trace_id"));
    }

    #[test]
    fn validate_unknown_field_fails_strict() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(
            &dir,
            "span.json",
            &SPAN.replace("\"type\": \"db\"", "\"type\": \"db\", \"sync\": true"),
        );

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("latest/strict"))
            .stderr(predicate::str::contains("sync"));
    }

    #[test]
    fn validate_single_variant() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(
            &dir,
            "span.json",
            &SPAN.replace("\"type\": \"db\"", "\"type\": \"db\", \"sync\": true"),
        );

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .args(["--variant", "latest"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .success();
    }

    #[test]
    fn validate_json_output_valid() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "span.json", SPAN);

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span", "--json"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""valid":true"#));
    }

    #[test]
    fn validate_json_output_invalid() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "tx.json", r#"{"id":"a","type":"request","duration":1}"#);

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "transaction", "--json"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""variant":"earliest/permissive""#))
            .stdout(predicate::str::contains("span_count"));
    }

    #[test]
    fn validate_json_output_file_error() {
        cmd()
            .args(["validate", "/nonexistent/payload.json", "--event", "span", "--json"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(3)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""error""#));
    }
}

mod intake_command {
    use super::*;

    #[test]
    fn raw_body_all_valid() {
        let dir = TempDir::new().unwrap();
        let span: serde_json::Value = serde_json::from_str(SPAN).unwrap();
        let body = format!(
            "{}\n{}\n",
            r#"{"metadata":{"service":{"name":"checkout","agent":{"name":"php","version":"1.0.0"}}}}"#,
            serde_json::json!({ "span": span })
        );
        let request = write_temp_file(&dir, "body.ndjson", &body);

        cmd()
            .args(["intake", request.to_str().unwrap(), "--raw"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid (2 events)"));
    }

    #[test]
    fn captured_request_with_invalid_event() {
        let dir = TempDir::new().unwrap();
        let captured = serde_json::json!({
            "headers": { "Content-Type": ["application/x-ndjson"] },
            "body": r#"{"metadata":{"service":{}}}"#,
            "timeReceivedAtServer": 1600000000000000.0
        });
        let request = write_temp_file(&dir, "request.json", &captured.to_string());

        cmd()
            .args(["intake", request.to_str().unwrap()])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("line 1 (Metadata)"));
    }

    #[test]
    fn unknown_event_type() {
        let dir = TempDir::new().unwrap();
        let request = write_temp_file(&dir, "body.ndjson", r#"{"error":{"id":"x"}}"#);

        cmd()
            .args(["intake", request.to_str().unwrap(), "--raw"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("unknown event type \"error\""));
    }

    #[test]
    fn malformed_captured_request() {
        let dir = TempDir::new().unwrap();
        let request = write_temp_file(&dir, "request.json", r#"{"payload": ""}"#);

        cmd()
            .args(["intake", request.to_str().unwrap()])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid intake request"));
    }
}

mod resolve_command {
    use super::*;

    #[test]
    fn resolve_flattens_all_of() {
        cmd()
            .arg("resolve")
            .arg(latest_schema("transactions/transaction.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""timestamp""#))
            .stdout(predicate::str::contains("allOf").not())
            .stdout(predicate::str::contains("$ref").not())
            .stdout(predicate::str::contains("additionalProperties").not());
    }

    #[test]
    fn resolve_strict() {
        cmd()
            .args(["resolve", "--strict"])
            .arg(latest_schema("metadata.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""additionalProperties":false"#));
    }

    #[test]
    fn resolve_with_pretty() {
        cmd()
            .args(["resolve", "--pretty"])
            .arg(latest_schema("spans/span.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains("\n  \"title\": \"Span\""));
    }

    #[test]
    fn resolve_with_output_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("resolved.json");

        cmd()
            .args(["resolve", "--strict"])
            .arg(latest_schema("transactions/transaction.json"))
            .arg("--output")
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let resolved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(resolved["additionalProperties"], false);
        assert_eq!(
            resolved["properties"]["span_count"]["additionalProperties"],
            false
        );
    }

    #[test]
    fn resolve_merge_conflict() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "base.json", r#"{"properties":{"id":{}}}"#);
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{"properties":{"id":{}},"allOf":[{"$ref":"base.json"}]}"#,
        );

        cmd()
            .args(["resolve", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("failed to merge allOf"));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn schema_file_not_found() {
        cmd()
            .args(["resolve", "/nonexistent/schema.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_json_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "bad.json", "{ not valid json }");

        cmd()
            .args(["resolve", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn circular_reference() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "a.json", r#"{"properties":{"b":{"$ref":"b.json"}}}"#);
        let schema = write_temp_file(&dir, "b.json", r#"{"properties":{"a":{"$ref":"a.json"}}}"#);

        cmd()
            .args(["resolve", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("circular reference"));
    }

    #[test]
    fn missing_specs_directory() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "span.json", SPAN);

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .arg("--specs-root")
            .arg(dir.path().join("no-specs"))
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Error: file not found"));
    }

    #[test]
    fn invalid_payload_json() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "span.json", "{\"id\":");

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--event", "span"])
            .arg("--specs-root")
            .arg(specs_root())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not valid JSON"));
    }
}

mod required_args {
    use super::*;

    #[test]
    fn missing_event_flag() {
        cmd()
            .args(["validate", "payload.json", "--specs-root", "specs"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--event"));
    }

    #[test]
    fn missing_specs_root() {
        cmd()
            .args(["validate", "payload.json", "--event", "span"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--specs-root"));
    }

    #[test]
    fn unknown_event_kind() {
        cmd()
            .args(["validate", "payload.json", "--event", "error", "--specs-root", "specs"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("intake API JSON Schemas"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("intake-schema"));
    }

    #[test]
    fn validate_help() {
        cmd()
            .args(["validate", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--variant"));
    }
}

mod logging {
    use super::*;

    #[test]
    fn debug_logs_go_to_stderr() {
        cmd()
            .args(["--log-level", "debug", "resolve", "--strict"])
            .arg(latest_schema("transactions/transaction.json"))
            .assert()
            .success()
            .stderr(predicate::str::contains("DEBUG"));
    }

    #[test]
    fn json_log_format() {
        cmd()
            .args(["--log-level", "debug", "--log-format", "json", "resolve"])
            .arg(latest_schema("transactions/transaction.json"))
            .assert()
            .success()
            .stderr(predicate::str::contains(r#""level":"DEBUG""#));
    }
}
