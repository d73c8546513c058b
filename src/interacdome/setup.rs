//! Setup of the InteracDome tables and the Pfam subset they describe.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

use crate::app::RunContext;
use crate::domain::{Dataset, InteracdomeKind, PfamAccession};
use crate::download::{CertificatePolicy, Downloader};
use crate::error::ProfileDbError;
use crate::fs_util::{ensure_parent_writable, fresh_directory, fs_error, gunzip, remove_path};
use crate::hmm_profile::filter_library;
use crate::hmmer::{HmmerProgram, HmmerTools};
use crate::interacdome::table::{BindingFrequencyTable, filter_clans_file};
use crate::pipeline::{DatasetSetup, SetupOptions};
use crate::store::{DataDirectory, PFAM_CLANS, PFAM_LIBRARY, SetupManifest};

/// The binding frequencies were computed against this Pfam release.
pub const PFAM_VERSION: &str = "31.0";
pub const FAMILIES_WITHOUT_PROFILES: &str = "families_without_profiles.txt";
pub const PRESS_LOG: &str = "00_hmmpress_log.txt";

#[derive(Debug, Clone)]
pub struct InteracdomeUrls {
    pub representable: String,
    pub confident: String,
    pub pfam_library: String,
    pub pfam_clans: String,
}

impl Default for InteracdomeUrls {
    fn default() -> Self {
        let session = "https://interacdome.princeton.edu/session/344807c477180230032a2a3807ba47c3/download";
        let pfam = format!("https://ftp.ebi.ac.uk/pub/databases/Pfam/releases/Pfam{PFAM_VERSION}");
        Self {
            representable: format!("{session}/downloadBP?w="),
            confident: format!("{session}/downloadConfidentBP?w="),
            pfam_library: format!("{pfam}/{PFAM_LIBRARY}.gz"),
            pfam_clans: format!("{pfam}/{PFAM_CLANS}.gz"),
        }
    }
}

impl InteracdomeUrls {
    pub fn table(&self, kind: InteracdomeKind) -> &str {
        match kind {
            InteracdomeKind::Representable => &self.representable,
            InteracdomeKind::Confident => &self.confident,
        }
    }
}

pub struct InteracdomeSetup<'a, D: Downloader, H: HmmerTools> {
    data_dir: DataDirectory,
    is_default_dir: bool,
    downloader: &'a D,
    hmmer: &'a H,
    urls: InteracdomeUrls,
    families: BTreeSet<PfamAccession>,
    kept_profiles: usize,
    dropped_profiles: usize,
    families_without_profiles: usize,
    clan_rows: usize,
}

impl<'a, D: Downloader, H: HmmerTools> InteracdomeSetup<'a, D, H> {
    pub fn new(
        data_dir: DataDirectory,
        is_default_dir: bool,
        downloader: &'a D,
        hmmer: &'a H,
    ) -> Self {
        Self::with_urls(data_dir, is_default_dir, downloader, hmmer, InteracdomeUrls::default())
    }

    pub fn with_urls(
        data_dir: DataDirectory,
        is_default_dir: bool,
        downloader: &'a D,
        hmmer: &'a H,
        urls: InteracdomeUrls,
    ) -> Self {
        Self {
            data_dir,
            is_default_dir,
            downloader,
            hmmer,
            urls,
            families: BTreeSet::new(),
            kept_profiles: 0,
            dropped_profiles: 0,
            families_without_profiles: 0,
            clan_rows: 0,
        }
    }

    fn write_families_without_profiles(
        &self,
        families: &[&PfamAccession],
    ) -> Result<(), ProfileDbError> {
        let path = self.data_dir.orphan_path(FAMILIES_WITHOUT_PROFILES);
        let path = path.as_std_path();
        let mut writer = BufWriter::new(File::create(path).map_err(|err| fs_error(path, err))?);
        for family in families {
            writeln!(writer, "{family}").map_err(|err| fs_error(path, err))?;
        }
        writer.flush().map_err(|err| fs_error(path, err))
    }
}

impl<D: Downloader, H: HmmerTools> DatasetSetup for InteracdomeSetup<'_, D, H> {
    fn dataset(&self) -> Dataset {
        Dataset::Interacdome
    }

    fn check_existing(
        &mut self,
        options: SetupOptions,
        ctx: &RunContext<'_>,
    ) -> Result<(), ProfileDbError> {
        let root = self.data_dir.root().as_std_path();
        if options.reset && !self.is_default_dir {
            return Err(ProfileDbError::ResetRefused {
                dataset: Dataset::Interacdome.to_string(),
                path: root.to_path_buf(),
            });
        }
        self.hmmer.ensure_available(HmmerProgram::Hmmpress)?;
        ensure_parent_writable(root)?;
        ctx.info("Data directory", self.data_dir.root());
        ctx.info("Reset contents", options.reset);

        if !options.reset && !ctx.debug() {
            if let Some(marker) = self.data_dir.existing_marker() {
                return Err(ProfileDbError::AlreadyExists {
                    dataset: Dataset::Interacdome.to_string(),
                    path: marker.into_std_path_buf(),
                });
            }
        }
        fresh_directory(root, options.reset)
    }

    fn acquire(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError> {
        for kind in [InteracdomeKind::Representable, InteracdomeKind::Confident] {
            let url = self.urls.table(kind);
            ctx.info("Downloading", url);
            self.downloader.download(
                url,
                self.data_dir.path(kind.file_name()).as_std_path(),
                CertificatePolicy::AcceptInvalid,
            )?;
        }
        for (url, name) in [
            (&self.urls.pfam_library, format!("{PFAM_LIBRARY}.gz")),
            (&self.urls.pfam_clans, format!("{PFAM_CLANS}.gz")),
        ] {
            ctx.info("Downloading", url);
            self.downloader.download(
                url,
                self.data_dir.path(&name).as_std_path(),
                CertificatePolicy::Verify,
            )?;
        }
        Ok(())
    }

    fn normalize(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError> {
        for name in [PFAM_LIBRARY, PFAM_CLANS] {
            gunzip(
                self.data_dir.path(&format!("{name}.gz")).as_std_path(),
                self.data_dir.path(name).as_std_path(),
            )?;
        }

        // Both tables are parsed so a broken download fails here, but the
        // library is cut to the representable families.
        let confident = BindingFrequencyTable::load(
            self.data_dir
                .path(InteracdomeKind::Confident.file_name())
                .as_std_path(),
        )?;
        let representable = BindingFrequencyTable::load(
            self.data_dir
                .path(InteracdomeKind::Representable.file_name())
                .as_std_path(),
        )?;
        ctx.info("Representable families", representable.len());
        ctx.info("Confident families", confident.len());
        self.families = representable.families();
        Ok(())
    }

    fn filter(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError> {
        let library = self.data_dir.library_path();
        let filtered = self.data_dir.path(&format!("{PFAM_LIBRARY}.filtered"));

        let mut with_profile = BTreeSet::new();
        let summary = filter_library(library.as_std_path(), filtered.as_std_path(), |profile| {
            match profile.pfam_accession() {
                Some(accession) if self.families.contains(&accession) => {
                    with_profile.insert(accession);
                    true
                }
                _ => false,
            }
        })?;
        fs::rename(filtered.as_std_path(), library.as_std_path())
            .map_err(|err| fs_error(library.as_std_path(), err))?;
        self.kept_profiles = summary.kept;
        self.dropped_profiles = summary.dropped;

        fresh_directory(self.data_dir.orphan_dir().as_std_path(), true)?;
        let missing: Vec<&PfamAccession> = self.families.difference(&with_profile).collect();
        self.write_families_without_profiles(&missing)?;
        self.families_without_profiles = missing.len();

        self.clan_rows =
            filter_clans_file(self.data_dir.path(PFAM_CLANS).as_std_path(), &self.families)?;

        ctx.info("Pfam profiles kept", summary.kept);
        ctx.info("Pfam profiles dropped", summary.dropped);
        ctx.info("Families without a Pfam profile", self.families_without_profiles);
        Ok(())
    }

    fn finalize(&mut self, ctx: &RunContext<'_>) -> Result<SetupManifest, ProfileDbError> {
        let library = self.data_dir.library_path();
        let log = self.data_dir.path(PRESS_LOG);
        self.hmmer.press(library.as_std_path(), log.as_std_path())?;

        if ctx.debug() {
            ctx.warning("debug mode: keeping the downloaded Pfam archives");
        } else {
            for name in [PFAM_LIBRARY, PFAM_CLANS] {
                remove_path(self.data_dir.path(&format!("{name}.gz")).as_std_path())?;
            }
        }

        Ok(
            SetupManifest::new(Dataset::Interacdome, &format!("InteracDome with Pfam {PFAM_VERSION}"))
                .with_count("families", self.families.len())
                .with_count("profiles_kept", self.kept_profiles)
                .with_count("profiles_dropped", self.dropped_profiles)
                .with_count("families_without_profiles", self.families_without_profiles)
                .with_count("clan_rows", self.clan_rows),
        )
    }
}
