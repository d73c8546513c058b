use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, InteracdomeKind, MissingPolicy};
use crate::error::ProfileDbError;

pub const DEFAULT_CONFIG_FILE: &str = "profile-dbs.json";
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub interacdome_data_dir: Option<String>,
    #[serde(default)]
    pub kofam_data_dir: Option<String>,
    #[serde(default)]
    pub interacdome_kind: Option<InteracdomeKind>,
    #[serde(default)]
    pub num_threads: Option<usize>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    #[serde(default)]
    pub hmmsearch: Option<String>,
    #[serde(default)]
    pub hmmpress: Option<String>,
    /// Fail on hits whose accession has no definition instead of writing a
    /// placeholder.
    #[serde(default)]
    pub strict_definitions: Option<bool>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub interacdome_data_dir: Option<String>,
    pub kofam_data_dir: Option<String>,
    pub interacdome_kind: Option<InteracdomeKind>,
    pub num_threads: Option<usize>,
    pub debug: bool,
    pub strict_definitions: bool,
}

#[derive(Debug, Clone)]
pub struct DataDirSetting {
    pub path: Utf8PathBuf,
    pub is_default: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub interacdome_data_dir: DataDirSetting,
    pub kofam_data_dir: DataDirSetting,
    pub interacdome_kind: InteracdomeKind,
    pub num_threads: usize,
    pub debug: bool,
    pub download_timeout_secs: u64,
    pub hmmsearch: Option<PathBuf>,
    pub hmmpress: Option<PathBuf>,
    pub missing_definitions: MissingPolicy,
}

impl ResolvedConfig {
    pub fn data_dir(&self, dataset: Dataset) -> &DataDirSetting {
        match dataset {
            Dataset::Interacdome => &self.interacdome_data_dir,
            Dataset::Kofam => &self.kofam_data_dir,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file (explicit path, or `profile-dbs.json` in the
    /// working directory if present) and applies the overrides.
    pub fn resolve(
        path: Option<&str>,
        overrides: &ConfigOverrides,
    ) -> Result<ResolvedConfig, ProfileDbError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| ProfileDbError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| ProfileDbError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides, &default_data_root()?)
    }

    pub fn resolve_config(
        config: Config,
        overrides: &ConfigOverrides,
        data_root: &Utf8PathBuf,
    ) -> Result<ResolvedConfig, ProfileDbError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(ProfileDbError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let interacdome_data_dir = data_dir_setting(
            overrides
                .interacdome_data_dir
                .clone()
                .or(config.interacdome_data_dir),
            data_root.join("InteracDome"),
        );
        let kofam_data_dir = data_dir_setting(
            overrides.kofam_data_dir.clone().or(config.kofam_data_dir),
            data_root.join("KEGG"),
        );

        let num_threads = overrides.num_threads.or(config.num_threads).unwrap_or(1);
        if num_threads == 0 {
            return Err(ProfileDbError::InvalidConfig(
                "num_threads must be at least 1".to_string(),
            ));
        }

        let download_timeout_secs = config
            .download_timeout_secs
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        if download_timeout_secs == 0 {
            return Err(ProfileDbError::InvalidConfig(
                "download_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            interacdome_data_dir,
            kofam_data_dir,
            interacdome_kind: overrides
                .interacdome_kind
                .or(config.interacdome_kind)
                .unwrap_or_default(),
            num_threads,
            debug: overrides.debug || config.debug.unwrap_or(false),
            download_timeout_secs,
            hmmsearch: config.hmmsearch.map(PathBuf::from),
            hmmpress: config.hmmpress.map(PathBuf::from),
            missing_definitions: if overrides.strict_definitions
                || config.strict_definitions.unwrap_or(false)
            {
                MissingPolicy::Strict
            } else {
                MissingPolicy::Placeholder
            },
        })
    }
}

pub fn default_data_root() -> Result<Utf8PathBuf, ProfileDbError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().join("profile-dbs")).ok())
        .ok_or_else(|| ProfileDbError::Filesystem("unable to resolve data directory".to_string()))
}

fn data_dir_setting(explicit: Option<String>, default: Utf8PathBuf) -> DataDirSetting {
    match explicit {
        Some(path) => DataDirSetting {
            path: Utf8PathBuf::from(path),
            is_default: false,
        },
        None => DataDirSetting {
            path: default,
            is_default: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_apply_when_config_is_empty() {
        let root = Utf8PathBuf::from("/data/profile-dbs");
        let resolved =
            ConfigLoader::resolve_config(Config::default(), &ConfigOverrides::default(), &root)
                .unwrap();
        assert_eq!(resolved.num_threads, 1);
        assert!(!resolved.debug);
        assert!(resolved.kofam_data_dir.is_default);
        assert_eq!(resolved.kofam_data_dir.path, root.join("KEGG"));
        assert_eq!(resolved.interacdome_kind, InteracdomeKind::Representable);
        assert_eq!(resolved.missing_definitions, MissingPolicy::Placeholder);
    }

    #[test]
    fn zero_threads_rejected() {
        let config = Config {
            num_threads: Some(0),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(
            config,
            &ConfigOverrides::default(),
            &Utf8PathBuf::from("/tmp"),
        )
        .unwrap_err();
        assert_matches!(err, ProfileDbError::InvalidConfig(_));
    }
}
