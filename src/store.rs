use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::Dataset;
use crate::error::ProfileDbError;

pub const MANIFEST_FILE: &str = "setup.json";
pub const ORPHAN_DIR: &str = "orphan_data";
pub const PFAM_LIBRARY: &str = "Pfam-A.hmm";
pub const PFAM_CLANS: &str = "Pfam-A.clans.tsv";
pub const KOFAM_LIBRARY: &str = "Kofam.hmm";
pub const KO_LIST: &str = "ko_list";
pub const MODULE_HIERARCHY: &str = "ko00002.keg";
pub const MODULES_DIR: &str = "modules";
pub const PROFILES_DIR: &str = "profiles";

/// Extensions of the binary files `hmmpress` writes next to a library.
pub const INDEX_EXTENSIONS: [&str; 4] = ["h3f", "h3i", "h3m", "h3p"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataDirState {
    Absent,
    /// Marker files exist but setup never wrote its manifest.
    Partial,
    Complete,
}

/// On-disk layout of one prepared dataset.
#[derive(Debug, Clone)]
pub struct DataDirectory {
    dataset: Dataset,
    root: Utf8PathBuf,
}

impl DataDirectory {
    pub fn new(dataset: Dataset, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dataset,
            root: root.into(),
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub fn orphan_dir(&self) -> Utf8PathBuf {
        self.root.join(ORPHAN_DIR)
    }

    pub fn orphan_path(&self, name: &str) -> Utf8PathBuf {
        self.orphan_dir().join(name)
    }

    pub fn profiles_dir(&self) -> Utf8PathBuf {
        self.root.join(PROFILES_DIR)
    }

    pub fn modules_dir(&self) -> Utf8PathBuf {
        self.root.join(MODULES_DIR)
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// The combined profile library searched at annotation time.
    pub fn library_path(&self) -> Utf8PathBuf {
        match self.dataset {
            Dataset::Interacdome => self.root.join(PFAM_LIBRARY),
            Dataset::Kofam => self.root.join(KOFAM_LIBRARY),
        }
    }

    pub fn index_paths(&self) -> Vec<Utf8PathBuf> {
        let library = self.library_path();
        INDEX_EXTENSIONS
            .iter()
            .map(|ext| Utf8PathBuf::from(format!("{library}.{ext}")))
            .collect()
    }

    /// Files whose presence is taken to mean a previous setup ran here. This
    /// is a heuristic: it says nothing about whether that setup finished.
    pub fn markers(&self) -> Vec<Utf8PathBuf> {
        match self.dataset {
            Dataset::Interacdome => vec![
                self.root.join(PFAM_LIBRARY),
                self.root.join(format!("{PFAM_LIBRARY}.gz")),
            ],
            Dataset::Kofam => vec![
                self.root.join(KOFAM_LIBRARY),
                self.profiles_dir().join("K00001.hmm"),
            ],
        }
    }

    pub fn existing_marker(&self) -> Option<Utf8PathBuf> {
        self.markers()
            .into_iter()
            .find(|marker| marker.as_std_path().exists())
    }

    pub fn state(&self) -> DataDirState {
        if self.manifest_path().as_std_path().is_file() {
            DataDirState::Complete
        } else if self.existing_marker().is_some() {
            DataDirState::Partial
        } else {
            DataDirState::Absent
        }
    }

    pub fn write_manifest(&self, manifest: &SetupManifest) -> Result<(), ProfileDbError> {
        let path = self.manifest_path();
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(manifest)
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn read_manifest(&self) -> Result<Option<SetupManifest>, ProfileDbError> {
        let path = self.manifest_path();
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        let manifest = serde_json::from_str(&content).map_err(|err| ProfileDbError::Parse {
            path: path.into_std_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Some(manifest))
    }
}

/// Written last by a successful setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupManifest {
    pub dataset: Dataset,
    pub source_version: String,
    pub created_at: String,
    pub tool: String,
    pub counts: BTreeMap<String, usize>,
}

impl SetupManifest {
    pub fn new(dataset: Dataset, source_version: &str) -> Self {
        Self {
            dataset,
            source_version: source_version.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("profile-dbs {}", env!("CARGO_PKG_VERSION")),
            counts: BTreeMap::new(),
        }
    }

    pub fn with_count(mut self, key: &str, value: usize) -> Self {
        self.counts.insert(key.to_string(), value);
        self
    }
}
