mod common;

use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use profile_dbs::annotate::AnnotationOutcome;
use profile_dbs::app::{App, RunContext};
use profile_dbs::config::{Config, ConfigLoader, ConfigOverrides};
use profile_dbs::contigs::ContigsDatabase;
use profile_dbs::domain::{Dataset, InteracdomeKind};
use profile_dbs::download::CertificatePolicy;
use profile_dbs::error::ProfileDbError;
use profile_dbs::hmm_profile::profile_names;
use profile_dbs::interacdome::InteracdomeUrls;
use profile_dbs::interacdome::setup::FAMILIES_WITHOUT_PROFILES;
use profile_dbs::output::JsonOutput;
use profile_dbs::pipeline::SetupOptions;
use profile_dbs::store::{DataDirState, PFAM_CLANS};

use common::{MockDownloader, MockHmmer, config_under, domtblout_line, interacdome_downloader};

fn set_up(temp: &tempfile::TempDir) -> App<MockDownloader, MockHmmer> {
    let app = App::new(
        config_under(temp.path()),
        interacdome_downloader(),
        MockHmmer::default(),
    );
    app.setup(
        Dataset::Interacdome,
        SetupOptions::default(),
        &RunContext::new(&JsonOutput, false),
    )
    .unwrap();
    app
}

#[test]
fn setup_keeps_only_families_with_binding_data() {
    let temp = tempfile::tempdir().unwrap();
    let app = set_up(&temp);
    let data_dir = app.data_dir(Dataset::Interacdome);

    assert_eq!(
        profile_names(data_dir.library_path().as_std_path()).unwrap(),
        vec!["ABC_tran", "Pkinase"]
    );
    let orphans = fs::read_to_string(data_dir.orphan_path(FAMILIES_WITHOUT_PROFILES)).unwrap();
    assert_eq!(orphans, "PF09999\n");

    let clans = fs::read_to_string(data_dir.path(PFAM_CLANS)).unwrap();
    let accessions: Vec<&str> = clans
        .lines()
        .map(|line| line.split('\t').next().unwrap())
        .collect();
    assert_eq!(accessions, vec!["PF00005", "PF00069"]);

    assert!(!data_dir.path("Pfam-A.hmm.gz").as_std_path().exists());
    assert!(data_dir.path(InteracdomeKind::Confident.file_name()).as_std_path().is_file());
    assert_eq!(data_dir.state(), DataDirState::Complete);

    let manifest = data_dir.read_manifest().unwrap().unwrap();
    assert_eq!(manifest.counts["profiles_kept"], 2);
    assert_eq!(manifest.counts["profiles_dropped"], 1);
    assert_eq!(manifest.counts["families_without_profiles"], 1);
}

#[test]
fn tables_are_fetched_without_certificate_checks() {
    let temp = tempfile::tempdir().unwrap();
    let app = set_up(&temp);
    let urls = InteracdomeUrls::default();
    let requests = app.downloader().requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 4);
    for (url, policy) in requests {
        let expected = if url == urls.representable || url == urls.confident {
            CertificatePolicy::AcceptInvalid
        } else {
            CertificatePolicy::Verify
        };
        assert_eq!(policy, expected, "{url}");
    }
}

#[test]
fn reset_of_explicit_data_dir_is_refused() {
    let temp = tempfile::tempdir().unwrap();
    let explicit = temp.path().join("my-interacdome");
    let config = ConfigLoader::resolve_config(
        Config::default(),
        &ConfigOverrides {
            interacdome_data_dir: Some(explicit.display().to_string()),
            ..ConfigOverrides::default()
        },
        &Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
    )
    .unwrap();
    let app = App::new(config, interacdome_downloader(), MockHmmer::default());

    let err = app
        .setup(
            Dataset::Interacdome,
            SetupOptions { reset: true },
            &RunContext::new(&JsonOutput, false),
        )
        .unwrap_err();
    assert_matches!(err, ProfileDbError::ResetRefused { .. });
    assert!(app.downloader().requested_urls().is_empty());
}

#[test]
fn gz_marker_blocks_setup() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(
        config_under(temp.path()),
        interacdome_downloader(),
        MockHmmer::default(),
    );
    let data_dir = app.data_dir(Dataset::Interacdome);
    fs::create_dir_all(data_dir.root()).unwrap();
    fs::write(data_dir.path("Pfam-A.hmm.gz"), b"partial").unwrap();

    let err = app
        .setup(
            Dataset::Interacdome,
            SetupOptions::default(),
            &RunContext::new(&JsonOutput, false),
        )
        .unwrap_err();
    assert_matches!(err, ProfileDbError::AlreadyExists { path, .. } if path.ends_with("Pfam-A.hmm.gz"));
    assert_eq!(data_dir.state(), DataDirState::Partial);
}

#[test]
fn debug_skips_the_existence_check() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(
        config_under(temp.path()),
        interacdome_downloader(),
        MockHmmer::default(),
    );
    let data_dir = app.data_dir(Dataset::Interacdome);
    fs::create_dir_all(data_dir.root()).unwrap();
    fs::write(data_dir.path("Pfam-A.hmm.gz"), b"partial").unwrap();

    app.setup(
        Dataset::Interacdome,
        SetupOptions::default(),
        &RunContext::new(&JsonOutput, true),
    )
    .unwrap();
    // Debug keeps the downloaded archives.
    assert!(data_dir.path("Pfam-A.hmm.gz").as_std_path().is_file());
}

#[test]
fn annotation_writes_functions_and_binding_summaries() {
    let temp = tempfile::tempdir().unwrap();
    set_up(&temp);
    let table = [
        "# hmmsearch domtblout\n".to_string(),
        domtblout_line(0, "ABC_tran", "PF00005.26", (2, 4)),
        domtblout_line(0, "ABC_tran", "PF00005.26", (1, 2)),
        domtblout_line(1, "7tm_1", "PF00001.21", (1, 4)),
    ]
    .concat();
    let app = App::new(
        config_under(temp.path()),
        MockDownloader::default(),
        MockHmmer::with_table(&table),
    );
    let db_path = temp.path().join("CONTIGS.db");
    let mut db = ContigsDatabase::create(&db_path).unwrap();
    db.add_gene_sequence(0, "MKVLAAGIVGL").unwrap();
    db.add_gene_sequence(1, "MSTNPKPQRK").unwrap();
    drop(db);

    let report = app
        .annotate(Dataset::Interacdome, &db_path, &RunContext::new(&JsonOutput, false))
        .unwrap();
    assert_eq!(
        report.outcome,
        AnnotationOutcome::Annotated {
            hits: 3,
            rows: 1,
            genes: 1
        }
    );

    let searches = app.hmmer().searches.lock().unwrap().clone();
    assert!(searches[0].contains(&"--cut_ga".to_string()));
    assert!(searches[0].contains(&"--domtblout".to_string()));

    let db = ContigsDatabase::open(&db_path).unwrap();
    let rows = db.gene_functions("InteracDome").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].accession, "PF00005");
    assert_eq!(rows[0].function, "ABC transporter");

    let summaries = db.binding_summaries().unwrap();
    // Two domains times two ligands.
    assert_eq!(summaries.len(), 4);
    let atp: Vec<_> = summaries
        .iter()
        .filter(|summary| summary.ligand == "ATP_")
        .collect();
    assert_eq!(atp.len(), 2);
    assert!(atp.iter().any(|summary| summary.hmm_start == 2 && summary.max_frequency == 1.0));
    assert!(atp.iter().all(|summary| summary.gene_start == 31 && summary.gene_stop == 163));
}

#[test]
fn zero_hits_register_source_and_keep_old_rows() {
    let temp = tempfile::tempdir().unwrap();
    set_up(&temp);
    let db_path = temp.path().join("CONTIGS.db");
    let mut db = ContigsDatabase::create(&db_path).unwrap();
    db.add_gene_sequence(0, "MKVLAAGIVGL").unwrap();
    drop(db);

    let with_hits = App::new(
        config_under(temp.path()),
        MockDownloader::default(),
        MockHmmer::with_table(&domtblout_line(0, "ABC_tran", "PF00005.26", (1, 4))),
    );
    with_hits
        .annotate(Dataset::Interacdome, &db_path, &RunContext::new(&JsonOutput, false))
        .unwrap();

    let no_hits = App::new(
        config_under(temp.path()),
        MockDownloader::default(),
        MockHmmer::with_table("#\n"),
    );
    let report = no_hits
        .annotate(Dataset::Interacdome, &db_path, &RunContext::new(&JsonOutput, false))
        .unwrap();
    assert_eq!(report.outcome, AnnotationOutcome::NoHits);

    let db = ContigsDatabase::open(&db_path).unwrap();
    assert_eq!(db.gene_functions("InteracDome").unwrap().len(), 1);
    assert_eq!(db.function_sources().unwrap(), vec!["InteracDome"]);
}

#[test]
fn non_contigs_database_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let app = set_up(&temp);
    let path = temp.path().join("profile.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE self (key TEXT, value TEXT); INSERT INTO self VALUES ('db_type', 'profile');")
        .unwrap();

    let err = app
        .annotate(Dataset::Interacdome, &path, &RunContext::new(&JsonOutput, false))
        .unwrap_err();
    assert_matches!(err, ProfileDbError::NotContigsDatabase(_));
}

#[test]
fn hits_without_binding_data_keep_earlier_rows() {
    let temp = tempfile::tempdir().unwrap();
    set_up(&temp);
    let db_path = temp.path().join("CONTIGS.db");
    let mut db = ContigsDatabase::create(&db_path).unwrap();
    db.add_gene_sequence(0, "MKVLAAGIVGL").unwrap();
    drop(db);

    App::new(
        config_under(temp.path()),
        MockDownloader::default(),
        MockHmmer::with_table(&domtblout_line(0, "ABC_tran", "PF00005.26", (1, 4))),
    )
    .annotate(Dataset::Interacdome, &db_path, &RunContext::new(&JsonOutput, false))
    .unwrap();

    let rerun = App::new(
        config_under(temp.path()),
        MockDownloader::default(),
        MockHmmer::with_table(&domtblout_line(0, "7tm_1", "PF00001.21", (1, 4))),
    );
    let report = rerun
        .annotate(Dataset::Interacdome, &db_path, &RunContext::new(&JsonOutput, false))
        .unwrap();
    assert_eq!(report.outcome, AnnotationOutcome::NoHits);

    let db = ContigsDatabase::open(&db_path).unwrap();
    let rows = db.gene_functions("InteracDome").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].accession, "PF00005");
    assert_eq!(db.binding_summaries().unwrap().len(), 2);
}

#[test]
fn empty_contigs_database_skips_the_search() {
    let temp = tempfile::tempdir().unwrap();
    set_up(&temp);
    let db_path = temp.path().join("CONTIGS.db");
    ContigsDatabase::create(&db_path).unwrap();

    let app = App::new(
        config_under(temp.path()),
        MockDownloader::default(),
        MockHmmer::with_table(&domtblout_line(0, "ABC_tran", "PF00005.26", (1, 4))),
    );
    let report = app
        .annotate(Dataset::Interacdome, &db_path, &RunContext::new(&JsonOutput, false))
        .unwrap();
    assert_eq!(report.outcome, AnnotationOutcome::NoHits);
    assert!(app.hmmer().searches.lock().unwrap().is_empty());
}
