//! Setup of the KOfam profile library and the KEGG module records.

use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;

use crate::app::RunContext;
use crate::domain::{Dataset, ModuleId};
use crate::download::{CertificatePolicy, Downloader};
use crate::error::ProfileDbError;
use crate::fs_util::{append_file, concatenate, fresh_directory, fs_error, gunzip, remove_path, untar_gz};
use crate::hmmer::{HmmerProgram, HmmerTools};
use crate::kofam::ko_list::{KoEntry, KoList};
use crate::kofam::modules::{ModuleCatalog, verify_module_record};
use crate::pipeline::{DatasetSetup, SetupOptions};
use crate::store::{DataDirectory, KO_LIST, MODULE_HIERARCHY, SetupManifest};

pub const PROFILES_ARCHIVE: &str = "profiles.tar.gz";
pub const NO_THRESHOLD_PROFILES: &str = "01_hmm_profiles_with_ko_fams_with_no_threshold.hmm";
pub const NO_DATA_PROFILES: &str = "02_hmm_profiles_with_ko_fams_with_no_data.hmm";
pub const ORPHAN_KO_LIST: &str = "01_ko_fams_with_no_threshold.txt";
pub const PRESS_LOG: &str = "00_hmmpress_log.txt";

#[derive(Debug, Clone)]
pub struct KofamUrls {
    pub profiles: String,
    pub ko_list: String,
    pub module_hierarchy: String,
    /// Module records are fetched from `<module_record_base>/<module id>`.
    pub module_record_base: String,
}

impl Default for KofamUrls {
    fn default() -> Self {
        Self {
            profiles: "https://www.genome.jp/ftp/db/kofam/profiles.tar.gz".to_string(),
            ko_list: "https://www.genome.jp/ftp/db/kofam/ko_list.gz".to_string(),
            module_hierarchy: "https://www.genome.jp/kegg-bin/download_htext?htext=ko00002.keg&format=htext&filedir=".to_string(),
            module_record_base: "https://rest.kegg.jp/get".to_string(),
        }
    }
}

impl KofamUrls {
    pub fn module_record(&self, id: &ModuleId) -> String {
        format!("{}/{id}", self.module_record_base.trim_end_matches('/'))
    }
}

pub struct KofamSetup<'a, D: Downloader, H: HmmerTools> {
    data_dir: DataDirectory,
    downloader: &'a D,
    hmmer: &'a H,
    urls: KofamUrls,
    ko_list: Option<KoList>,
    modules: usize,
    orphan_profiles: usize,
}

impl<'a, D: Downloader, H: HmmerTools> KofamSetup<'a, D, H> {
    pub fn new(data_dir: DataDirectory, downloader: &'a D, hmmer: &'a H) -> Self {
        Self::with_urls(data_dir, downloader, hmmer, KofamUrls::default())
    }

    pub fn with_urls(
        data_dir: DataDirectory,
        downloader: &'a D,
        hmmer: &'a H,
        urls: KofamUrls,
    ) -> Self {
        Self {
            data_dir,
            downloader,
            hmmer,
            urls,
            ko_list: None,
            modules: 0,
            orphan_profiles: 0,
        }
    }

    fn download(&self, url: &str, name: &str) -> Result<Utf8PathBuf, ProfileDbError> {
        let destination = self.data_dir.path(name);
        self.downloader
            .download(url, destination.as_std_path(), CertificatePolicy::Verify)?;
        Ok(destination)
    }

    fn profile_path(&self, entry: &KoEntry) -> PathBuf {
        self.data_dir
            .profiles_dir()
            .join(format!("{}.hmm", entry.ko))
            .into_std_path_buf()
    }

    fn ko_list(&mut self) -> Result<&KoList, ProfileDbError> {
        if self.ko_list.is_none() {
            let path = self.data_dir.path(KO_LIST);
            self.ko_list = Some(KoList::load(path.as_std_path())?);
        }
        self.ko_list
            .as_ref()
            .ok_or_else(|| ProfileDbError::Filesystem("ko_list is not loaded".to_string()))
    }

    /// Moves the profiles of `entries` that exist on disk into `target`.
    fn move_profiles<'e>(
        &self,
        entries: impl Iterator<Item = &'e KoEntry>,
        target: &Utf8PathBuf,
    ) -> Result<usize, ProfileDbError> {
        let mut moved = 0;
        for entry in entries {
            let profile = self.profile_path(entry);
            if !profile.is_file() {
                continue;
            }
            append_file(&profile, target.as_std_path())?;
            fs::remove_file(&profile).map_err(|err| fs_error(&profile, err))?;
            moved += 1;
        }
        Ok(moved)
    }
}

impl<D: Downloader, H: HmmerTools> DatasetSetup for KofamSetup<'_, D, H> {
    fn dataset(&self) -> Dataset {
        Dataset::Kofam
    }

    fn check_existing(
        &mut self,
        options: SetupOptions,
        ctx: &RunContext<'_>,
    ) -> Result<(), ProfileDbError> {
        self.hmmer.ensure_available(HmmerProgram::Hmmpress)?;
        if !options.reset && !ctx.debug() {
            if let Some(marker) = self.data_dir.existing_marker() {
                return Err(ProfileDbError::AlreadyExists {
                    dataset: Dataset::Kofam.to_string(),
                    path: marker.into_std_path_buf(),
                });
            }
        }
        fresh_directory(self.data_dir.root().as_std_path(), options.reset)
    }

    fn acquire(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError> {
        ctx.info("Downloading", &self.urls.profiles);
        self.download(&self.urls.profiles, PROFILES_ARCHIVE)?;
        ctx.info("Downloading", &self.urls.ko_list);
        self.download(&self.urls.ko_list, &format!("{KO_LIST}.gz"))?;
        ctx.info("Downloading", &self.urls.module_hierarchy);
        self.download(&self.urls.module_hierarchy, MODULE_HIERARCHY)?;
        Ok(())
    }

    fn normalize(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError> {
        let root = self.data_dir.root().as_std_path();
        untar_gz(&root.join(PROFILES_ARCHIVE), root)?;
        let profiles = self.data_dir.profiles_dir();
        if !profiles.as_std_path().is_dir() {
            return Err(ProfileDbError::Parse {
                path: root.join(PROFILES_ARCHIVE),
                message: "archive does not contain a profiles/ directory".to_string(),
            });
        }

        let ko_list_path = self.data_dir.path(KO_LIST);
        gunzip(
            self.data_dir.path(&format!("{KO_LIST}.gz")).as_std_path(),
            ko_list_path.as_std_path(),
        )?;
        let ko_list = KoList::load(ko_list_path.as_std_path())?;
        ctx.info("KO entries", ko_list.len());
        self.ko_list = Some(ko_list);

        let catalog = ModuleCatalog::load(self.data_dir.path(MODULE_HIERARCHY).as_std_path())?;
        ctx.info("Modules in hierarchy", catalog.len());
        let modules_dir = self.data_dir.modules_dir();
        fresh_directory(modules_dir.as_std_path(), true)?;
        for id in catalog.ids() {
            let record = modules_dir.join(id.as_str());
            self.downloader.download(
                &self.urls.module_record(id),
                record.as_std_path(),
                CertificatePolicy::Verify,
            )?;
            verify_module_record(record.as_std_path())?;
        }
        self.modules = catalog.len();
        tracing::debug!(modules = self.modules, "module records verified");
        Ok(())
    }

    fn filter(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError> {
        fresh_directory(self.data_dir.orphan_dir().as_std_path(), true)?;
        let no_threshold_target = self.data_dir.orphan_path(NO_THRESHOLD_PROFILES);
        let no_data_target = self.data_dir.orphan_path(NO_DATA_PROFILES);
        let orphan_list = self.data_dir.orphan_path(ORPHAN_KO_LIST);

        // Taken out of self for the duration so profile moves can borrow self.
        self.ko_list()?;
        let ko_list = self.ko_list.take().unwrap_or_default();

        let moved_no_threshold = self.move_profiles(ko_list.no_threshold(), &no_threshold_target)?;
        let moved_no_data = self.move_profiles(ko_list.no_data(), &no_data_target)?;
        let orphan_lines = ko_list.write_orphans(orphan_list.as_std_path())?;

        let missing = ko_list
            .usable()
            .find(|entry| !self.profile_path(entry).is_file())
            .map(|entry| entry.ko.to_string());
        self.ko_list = Some(ko_list);
        if let Some(ko) = missing {
            return Err(ProfileDbError::MissingProfile(ko));
        }

        self.orphan_profiles = moved_no_threshold + moved_no_data;
        ctx.info("Profiles without threshold moved to orphan data", moved_no_threshold);
        ctx.info("Profiles without any data moved to orphan data", moved_no_data);
        ctx.info("Orphan ko_list entries", orphan_lines);
        Ok(())
    }

    fn finalize(&mut self, ctx: &RunContext<'_>) -> Result<SetupManifest, ProfileDbError> {
        let profiles_dir = self.data_dir.profiles_dir();
        let ko_list = self.ko_list()?;
        let sources: Vec<PathBuf> = ko_list
            .usable()
            .map(|entry| {
                profiles_dir
                    .join(format!("{}.hmm", entry.ko))
                    .into_std_path_buf()
            })
            .collect();
        let usable = sources.len();
        let no_threshold = ko_list.no_threshold().count();
        let no_data = ko_list.no_data().count();

        let library = self.data_dir.library_path();
        concatenate(&sources, library.as_std_path())?;
        ctx.info("Profiles in combined library", usable);

        let log = self.data_dir.path(PRESS_LOG);
        self.hmmer
            .press(library.as_std_path(), log.as_std_path())?;

        if ctx.debug() {
            ctx.warning("debug mode: keeping the unpacked profiles and downloaded archives");
        } else {
            remove_path(self.data_dir.profiles_dir().as_std_path())?;
            remove_path(self.data_dir.path(PROFILES_ARCHIVE).as_std_path())?;
            remove_path(self.data_dir.path(&format!("{KO_LIST}.gz")).as_std_path())?;
        }

        Ok(SetupManifest::new(Dataset::Kofam, "KOfam (genome.jp) with KEGG modules")
            .with_count("usable_kos", usable)
            .with_count("no_threshold_kos", no_threshold)
            .with_count("no_data_kos", no_data)
            .with_count("orphan_profiles", self.orphan_profiles)
            .with_count("modules", self.modules))
    }
}
