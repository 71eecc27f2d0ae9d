use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

const IN_NETWORK_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["version", "reporting_entity_name"],
  "properties": {
    "version": {"type": "string"},
    "reporting_entity_name": {"type": "string"},
    "in_network": {"type": "array"},
    "provider_references": {"type": "array"}
  }
}"#;

const PROVIDER_REFERENCE_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["version"],
  "properties": {
    "version": {"type": "string"},
    "provider_groups": {"type": "array"}
  }
}"#;

/// Snapshot directory with the two schemas under `v0.3` and `v1.0`.
fn schema_dir() -> TempDir {
    let dir = tempdir().unwrap();
    for tag in ["v0.3", "v1.0"] {
        for (name, body) in [
            ("in-network-rates", IN_NETWORK_SCHEMA),
            ("provider-reference", PROVIDER_REFERENCE_SCHEMA),
        ] {
            let schema_dir = dir.path().join(tag).join("schemas").join(name);
            fs::create_dir_all(&schema_dir).unwrap();
            fs::write(schema_dir.join(format!("{name}.json")), body).unwrap();
        }
    }
    dir
}

/// In-network file referencing one provider-reference file next to it.
fn write_rates(dir: &Path, extra: &str) -> PathBuf {
    let provider = dir.join("providers.json");
    fs::write(&provider, r#"{"version": "v1.0", "provider_groups": []}"#).unwrap();

    let rates = dir.join("rates.json");
    fs::write(
        &rates,
        format!(
            r#"{{
  "version": "v1.0",
  "reporting_entity_name": "Example Health",{extra}
  "in_network": [{{
    "negotiated_rates": [{{
      "negotiated_prices": [
        {{"negotiated_type": "negotiated"}},
        {{"negotiated_type": "negotiated"}},
        {{"negotiated_type": "fee schedule"}}
      ]
    }}]
  }}],
  "provider_references": [{{"location": "{}"}}]
}}"#,
            provider.display()
        ),
    )
    .unwrap();
    rates
}

fn mrfcheck(schemas: &TempDir, work: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mrfcheck").unwrap();
    cmd.current_dir(work.path())
        .env("NO_COLOR", "1")
        .env_remove("MRFCHECK_VALIDATOR")
        .arg("--schema-dir")
        .arg(schemas.path());
    cmd
}

#[test]
fn versions_lists_tags_oldest_first() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;

    mrfcheck(&schemas, &work)
        .arg("versions")
        .assert()
        .success()
        .stdout("v0.3\nv1.0\n");
    Ok(())
}

#[test]
fn validate_follows_references_and_writes_results() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;
    let rates = write_rates(work.path(), "");

    mrfcheck(&schemas, &work)
        .arg("validate")
        .arg(&rates)
        .assert()
        .success()
        .stdout(predicate::str::contains("All 2 file(s) passed"));

    let results = work.path().join("mrfcheck-results");
    let index = fs::read_to_string(results.join("index.txt"))?;
    let lines: Vec<_> = index.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("1\t\tin-network-rates\t\t"));
    assert!(lines[1].starts_with("2\t\tprovider-reference\t\t"));

    let counts: Value =
        serde_json::from_str(&fs::read_to_string(results.join("1-negotiatedType.json"))?)?;
    assert_eq!(counts["negotiated"], 2);
    assert_eq!(counts["fee schedule"], 1);
    assert!(results.join("2-errors.json").exists());
    Ok(())
}

#[test]
fn from_url_accepts_file_uris() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;
    let rates = write_rates(work.path(), "");
    let out = work.path().join("out");

    mrfcheck(&schemas, &work)
        .arg("from-url")
        .arg(format!("file://{}", rates.display()))
        .arg("--no-follow")
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(out.join("index.txt"))?.lines().count(), 1);
    Ok(())
}

#[test]
fn strict_mode_rejects_undeclared_properties() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;
    let rates = write_rates(work.path(), "\n  \"plan_nickname\": \"gold\",");

    mrfcheck(&schemas, &work)
        .args(["validate", "--no-follow"])
        .arg(&rates)
        .assert()
        .success();

    mrfcheck(&schemas, &work)
        .args(["validate", "--no-follow", "--strict"])
        .arg(&rates)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 of 1 file(s) failed"));
    Ok(())
}

#[test]
fn invalid_document_exits_with_failure() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;
    let rates = work.path().join("rates.json");
    fs::write(&rates, r#"{"version": "v1.0"}"#)?;

    mrfcheck(&schemas, &work)
        .arg("validate")
        .arg(&rates)
        .assert()
        .code(1);

    let index = fs::read_to_string(work.path().join("mrfcheck-results/index.txt"))?;
    assert!(index.contains("failed: document does not conform to the schema"));
    Ok(())
}

#[test]
fn unknown_version_aborts_with_available_tags() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;
    let rates = write_rates(work.path(), "");

    mrfcheck(&schemas, &work)
        .args(["validate", "--schema-version", "v9.9"])
        .arg(&rates)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown schema version 'v9.9'"))
        .stderr(predicate::str::contains("v0.3"));
    Ok(())
}

#[test]
fn undetectable_version_suggests_override() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;
    let rates = work.path().join("rates.json");
    fs::write(&rates, r#"{"reporting_entity_name": "Example Health"}"#)?;

    mrfcheck(&schemas, &work)
        .arg("validate")
        .arg(&rates)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--schema-version"));

    mrfcheck(&schemas, &work)
        .args(["validate", "--schema-version", "v0.3"])
        .arg(&rates)
        .assert()
        .code(1);
    Ok(())
}

#[test]
fn missing_data_file_aborts() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;

    mrfcheck(&schemas, &work)
        .args(["validate", "does-not-exist.json"])
        .assert()
        .code(2);
    assert!(!work.path().join("mrfcheck-results/index.txt").exists());
    Ok(())
}

#[test]
fn schema_dir_can_come_from_the_environment() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = schema_dir();
    let work = tempdir()?;

    Command::cargo_bin("mrfcheck")?
        .current_dir(work.path())
        .env("MRFCHECK_SCHEMA_DIR", schemas.path())
        .arg("versions")
        .assert()
        .success()
        .stdout(predicate::str::contains("v1.0"));
    Ok(())
}
