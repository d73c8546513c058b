#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use profile_dbs::app::{ProgressEvent, ProgressSink};
use profile_dbs::config::{Config, ConfigLoader, ConfigOverrides, ResolvedConfig};
use profile_dbs::domain::ModuleId;
use profile_dbs::download::{CertificatePolicy, Downloader};
use profile_dbs::error::ProfileDbError;
use profile_dbs::hmmer::{HmmerProgram, HmmerTools, SearchRequest};
use profile_dbs::interacdome::InteracdomeUrls;
use profile_dbs::kofam::KofamUrls;
use profile_dbs::store::INDEX_EXTENSIONS;

#[derive(Default)]
pub struct MockDownloader {
    files: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<(String, CertificatePolicy)>>,
}

impl MockDownloader {
    pub fn serve(&mut self, url: &str, body: Vec<u8>) {
        self.files.insert(url.to_string(), body);
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl Downloader for MockDownloader {
    fn download(
        &self,
        url: &str,
        destination: &Path,
        certificates: CertificatePolicy,
    ) -> Result<(), ProfileDbError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), certificates));
        let body = self.files.get(url).ok_or_else(|| ProfileDbError::DownloadStatus {
            url: url.to_string(),
            status: 404,
        })?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(destination, body).unwrap();
        Ok(())
    }
}

#[derive(Default)]
pub struct MockHmmer {
    pub unavailable: Option<HmmerProgram>,
    pub failing_search: bool,
    pub version: Option<String>,
    pub table: String,
    pub pressed: Mutex<Vec<PathBuf>>,
    pub searches: Mutex<Vec<Vec<String>>>,
}

impl MockHmmer {
    pub fn with_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }
}

impl HmmerTools for MockHmmer {
    fn ensure_available(&self, program: HmmerProgram) -> Result<(), ProfileDbError> {
        if self.unavailable == Some(program) {
            return Err(ProfileDbError::MissingTool(program.name().to_string()));
        }
        Ok(())
    }

    fn press(&self, library: &Path, log: &Path) -> Result<(), ProfileDbError> {
        self.ensure_available(HmmerProgram::Hmmpress)?;
        for ext in INDEX_EXTENSIONS {
            fs::write(format!("{}.{ext}", library.display()), b"index").unwrap();
        }
        fs::write(log, b"pressed\n").unwrap();
        self.pressed.lock().unwrap().push(library.to_path_buf());
        Ok(())
    }

    fn search(&self, request: &SearchRequest<'_>) -> Result<(), ProfileDbError> {
        self.ensure_available(HmmerProgram::Hmmsearch)?;
        assert!(request.sequences.is_file(), "sequences must be exported first");
        self.searches.lock().unwrap().push(request.args());
        if self.failing_search {
            fs::write(request.log, b"Error: failed to open sequence file\n").unwrap();
            return Err(ProfileDbError::SearchFailed {
                log: request.log.to_path_buf(),
            });
        }
        fs::write(request.table_output, &self.table).unwrap();
        fs::write(request.log, b"searched\n").unwrap();
        Ok(())
    }

    fn version(&self, program: HmmerProgram) -> Option<String> {
        if self.unavailable == Some(program) {
            return None;
        }
        self.version.clone()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

/// Config whose default data directories live under `root`.
pub fn config_under(root: &Path) -> ResolvedConfig {
    let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).unwrap();
    ConfigLoader::resolve_config(Config::default(), &ConfigOverrides::default(), &root).unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn tar_gz(entries: &[(&str, String)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn hmm(name: &str, accession: Option<&str>) -> String {
    let accession = accession
        .map(|acc| format!("ACC   {acc}\n"))
        .unwrap_or_default();
    format!("HMMER3/f [3.1b2 | February 2015]\nNAME  {name}\n{accession}LENG  4\n//\n")
}

pub const KO_LIST: &str = "knum\tthreshold\tscore_type\tprofile_type\tF-measure\tnseq\tnseq_used\talen\tmlen\teff_nseq\tre/pos\tdefinition
K00001\t100.0\tfull\tall\t0.9\t10\t10\t300\t300\t1.0\t0.5\talcohol dehydrogenase [EC:1.1.1.1]
K00002\t50.0\tdomain\tall\t0.9\t10\t10\t300\t300\t1.0\t0.5\talcohol dehydrogenase (NADP+) [EC:1.1.1.2]
K23749\t-\t-\t-\t-\t1\t1\t2266\t2266\t0.39\t0.592\tspectinabilin polyketide synthase system NorC [EC:2.3.1.290]
K14936\t-\t-\t-\t-\t-\t-\t-\t-\t-\t-\tsmall nucleolar RNA snR191
";

pub const MODULE_HIERARCHY: &str = "+D\tModule
#<h2><a href=\"/kegg/brite.html\"><img src=\"/Fig/bget/kegg3.gif\" align=\"middle\" border=0></a>&nbsp; KEGG Modules</h2>
!
A<b>Pathway module</b>
B
B  <b>Carbohydrate metabolism</b>
C    Central carbohydrate metabolism
D      M00001  Glycolysis (Embden-Meyerhof pathway), glucose => pyruvate [PATH:map00010 map01200]
D      M00002  Glycolysis, core module involving three-carbon compounds [PATH:map00010 map01200]
!
";

pub fn module_record(id: &str) -> Vec<u8> {
    format!("ENTRY       {id}            Pathway   Module\nNAME        something\n///\n").into_bytes()
}

/// Serves a consistent KOfam release from the default URLs.
pub fn kofam_downloader() -> MockDownloader {
    let urls = KofamUrls::default();
    let mut downloader = MockDownloader::default();
    downloader.serve(
        &urls.profiles,
        tar_gz(&[
            ("profiles/K00001.hmm", hmm("K00001", None)),
            ("profiles/K00002.hmm", hmm("K00002", None)),
            ("profiles/K23749.hmm", hmm("K23749", None)),
            ("profiles/K14936.hmm", hmm("K14936", None)),
        ]),
    );
    downloader.serve(&urls.ko_list, gzip(KO_LIST.as_bytes()));
    downloader.serve(&urls.module_hierarchy, MODULE_HIERARCHY.as_bytes().to_vec());
    for id in ["M00001", "M00002"] {
        let id: ModuleId = id.parse().unwrap();
        downloader.serve(&urls.module_record(&id), module_record(id.as_str()));
    }
    downloader
}

pub const REPRESENTABLE: &str = "# InteracDome representable domain-ligand interactions
pfam_id\tdomain_length\tligand_type\tnum_nonidentical_instances\tnum_structures\tbinding_frequencies
PF00005_ABC_tran\t4\tATP_\t12\t40\t0.0,0.5,1.0,0.25
PF00005_ABC_tran\t4\tMG_\t3\t8\t0.0,0.0,0.2,0.0
PF00069_Pkinase\t4\tADP_\t7\t20\t0.9,0.1,0.0,0.0
PF09999_Unknown\t2\tZN_\t2\t2\t0.5,0.5
";

pub const CONFIDENT: &str = "# InteracDome confident domain-ligand interactions
pfam_id\tdomain_length\tligand_type\tnum_nonidentical_instances\tnum_structures\tbinding_frequencies
PF00005_ABC_tran\t4\tATP_\t12\t40\t0.0,0.5,1.0,0.25
";

pub const CLANS: &str = "PF00001\tCL0192\tGPCR_A\t7tm_1\t7 transmembrane receptor (rhodopsin family)
PF00005\tCL0023\tP-loop_NTPase\tABC_tran\tABC transporter
PF00069\tCL0016\tPKinase\tPkinase\tProtein kinase domain
";

pub fn interacdome_downloader() -> MockDownloader {
    let urls = InteracdomeUrls::default();
    let mut downloader = MockDownloader::default();
    downloader.serve(&urls.representable, REPRESENTABLE.as_bytes().to_vec());
    downloader.serve(&urls.confident, CONFIDENT.as_bytes().to_vec());
    let library = [
        hmm("7tm_1", Some("PF00001.21")),
        hmm("ABC_tran", Some("PF00005.26")),
        hmm("Pkinase", Some("PF00069.24")),
    ]
    .concat();
    downloader.serve(&urls.pfam_library, gzip(library.as_bytes()));
    downloader.serve(&urls.pfam_clans, gzip(CLANS.as_bytes()));
    downloader
}

pub fn tblout_line(gene: i64, ko: &str, full_score: f64, domain_score: f64) -> String {
    format!(
        "{gene} - {ko} - 1e-30 {full_score} 0.1 2e-30 {domain_score} 0.1 1.0 1 0 0 1 1 1 1 -\n"
    )
}

pub fn domtblout_line(gene: i64, name: &str, accession: &str, hmm_span: (usize, usize)) -> String {
    format!(
        "{gene} - 310 {name} {accession} 4 2.1e-30 105.2 0.0 1 1 3.2e-33 4.1e-30 104.3 0.0 {} {} 31 163 30 164 0.96 -\n",
        hmm_span.0, hmm_span.1
    )
}
