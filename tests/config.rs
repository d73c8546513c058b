use std::path::PathBuf;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use profile_dbs::config::{Config, ConfigLoader, ConfigOverrides};
use profile_dbs::domain::{Dataset, InteracdomeKind, MissingPolicy};
use profile_dbs::error::ProfileDbError;

#[test]
fn parse_config_file() {
    let config: Config = serde_json::from_str(
        r#"{
            "schema_version": 1,
            "kofam_data_dir": "/data/KEGG",
            "interacdome_kind": "confident",
            "num_threads": 8,
            "hmmsearch": "/opt/hmmer/bin/hmmsearch",
            "strict_definitions": true
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve_config(
        config,
        &ConfigOverrides::default(),
        &Utf8PathBuf::from("/home/user/.local/share/profile-dbs"),
    )
    .unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.num_threads, 8);
    assert_eq!(resolved.interacdome_kind, InteracdomeKind::Confident);
    assert_eq!(resolved.data_dir(Dataset::Kofam).path, "/data/KEGG");
    assert!(!resolved.data_dir(Dataset::Kofam).is_default);
    assert!(resolved.data_dir(Dataset::Interacdome).is_default);
    assert_eq!(
        resolved.hmmsearch,
        Some(PathBuf::from("/opt/hmmer/bin/hmmsearch"))
    );
    assert_eq!(resolved.hmmpress, None);
    assert_eq!(resolved.missing_definitions, MissingPolicy::Strict);
}

#[test]
fn command_line_overrides_file() {
    let config = Config {
        num_threads: Some(8),
        interacdome_data_dir: Some("/data/InteracDome".to_string()),
        ..Config::default()
    };
    let overrides = ConfigOverrides {
        num_threads: Some(2),
        interacdome_data_dir: Some("/scratch/InteracDome".to_string()),
        debug: true,
        ..ConfigOverrides::default()
    };
    let resolved =
        ConfigLoader::resolve_config(config, &overrides, &Utf8PathBuf::from("/data")).unwrap();
    assert_eq!(resolved.num_threads, 2);
    assert!(resolved.debug);
    assert_eq!(
        resolved.data_dir(Dataset::Interacdome).path,
        "/scratch/InteracDome"
    );
}

#[test]
fn unsupported_schema_is_rejected() {
    let config = Config {
        schema_version: Some(2),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config, &ConfigOverrides::default(), &Utf8PathBuf::from("/data")),
        Err(ProfileDbError::InvalidConfig(_))
    );
}

#[test]
fn unreadable_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert_matches!(
        ConfigLoader::resolve(missing.to_str(), &ConfigOverrides::default()),
        Err(ProfileDbError::ConfigRead(_))
    );

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(broken.to_str(), &ConfigOverrides::default()),
        Err(ProfileDbError::ConfigParse(_))
    );
}
