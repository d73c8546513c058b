//! Annotation of contigs database genes with the InteracDome Pfam subset.

use std::collections::BTreeMap;

use crate::annotate::{AnnotationOutcome, AnnotationReport, SearchSession, check_preconditions};
use crate::app::RunContext;
use crate::contigs::{BindingSummary, FunctionRow, FunctionStore};
use crate::domain::{Dataset, InteracdomeKind, MissingPolicy, PfamAccession};
use crate::error::ProfileDbError;
use crate::hits::AnnotationHit;
use crate::hmmer::{HmmerTools, NoiseCutoff, TableFormat};
use crate::interacdome::table::{BindingFrequencyTable, ClanCatalog, summarize_span};
use crate::store::{DataDirectory, PFAM_CLANS};

/// A domain hit to a family with binding data.
#[derive(Debug, Clone)]
pub struct FamilyHit {
    pub family: PfamAccession,
    pub hit: AnnotationHit,
}

pub fn hits_with_binding_data(
    hits: Vec<AnnotationHit>,
    table: &BindingFrequencyTable,
) -> Vec<FamilyHit> {
    hits.into_iter()
        .filter_map(|hit| {
            let family: PfamAccession = hit.profile_accession.as_deref()?.parse().ok()?;
            table.contains(&family).then_some(FamilyHit { family, hit })
        })
        .collect()
}

/// One row per gene and family, carrying the best independent e-value
/// among its domains.
pub fn function_rows(
    hits: &[FamilyHit],
    clans: &ClanCatalog,
    missing: MissingPolicy,
) -> Result<Vec<FunctionRow>, ProfileDbError> {
    let mut best: BTreeMap<(i64, &PfamAccession), f64> = BTreeMap::new();
    for FamilyHit { family, hit } in hits {
        best.entry((hit.gene_callers_id, family))
            .and_modify(|e_value| *e_value = e_value.min(hit.domain_e_value))
            .or_insert(hit.domain_e_value);
    }

    best.into_iter()
        .map(|((gene_callers_id, family), e_value)| {
            Ok(FunctionRow {
                gene_callers_id,
                source: Dataset::Interacdome.source_name().to_string(),
                accession: family.to_string(),
                function: clans.definition(family, missing)?,
                e_value,
            })
        })
        .collect()
}

pub fn binding_summaries(hits: &[FamilyHit], table: &BindingFrequencyTable) -> Vec<BindingSummary> {
    let mut summaries = Vec::new();
    for FamilyHit { family, hit } in hits {
        let (Some(span), Some(ligands)) = (hit.span, table.ligands(family)) else {
            continue;
        };
        for (ligand, frequencies) in ligands {
            let Some((max_frequency, mean_frequency)) =
                summarize_span(frequencies, span.hmm_start, span.hmm_stop)
            else {
                continue;
            };
            summaries.push(BindingSummary {
                gene_callers_id: hit.gene_callers_id,
                pfam_id: family.to_string(),
                ligand: ligand.clone(),
                hmm_start: span.hmm_start,
                hmm_stop: span.hmm_stop,
                gene_start: span.gene_start,
                gene_stop: span.gene_stop,
                max_frequency,
                mean_frequency,
            });
        }
    }
    summaries
}

pub fn annotate<S, H>(
    data_dir: &DataDirectory,
    kind: InteracdomeKind,
    store: &mut S,
    hmmer: &H,
    num_threads: usize,
    missing: MissingPolicy,
    ctx: &RunContext<'_>,
) -> Result<AnnotationReport, ProfileDbError>
where
    S: FunctionStore + ?Sized,
    H: HmmerTools,
{
    check_preconditions(data_dir, hmmer)?;
    let table = BindingFrequencyTable::load(data_dir.path(kind.file_name()).as_std_path())?;
    let clans = ClanCatalog::load(data_dir.path(PFAM_CLANS).as_std_path())?;
    ctx.info("Binding frequency table", format!("{kind} ({} families)", table.len()));
    let source = Dataset::Interacdome.source_name();

    let mut session = SearchSession::prepare(store, ctx)?;
    if session.num_sequences == 0 {
        return session.no_hits(store, source, "the contigs database has no gene sequences", ctx);
    }
    let hits = session.search(
        hmmer,
        data_dir,
        TableFormat::PerDomain,
        NoiseCutoff::Gathering,
        num_threads,
        ctx,
    )?;
    let sequences = session.num_sequences;

    if hits.is_empty() {
        return session.no_hits(store, source, "the search returned no hits", ctx);
    }

    let raw_hits = hits.len();
    let hits = hits_with_binding_data(hits, &table);
    ctx.info("Domain hits", raw_hits);
    ctx.info("Domain hits to families with binding data", hits.len());

    let rows = function_rows(&hits, &clans, missing)?;
    if rows.is_empty() {
        return session.no_hits(store, source, "no hit is to a family with binding data", ctx);
    }
    let summaries = binding_summaries(&hits, &table);
    store.add_gene_functions(source, &rows)?;
    store.add_binding_summaries(&summaries)?;
    ctx.info("Binding summaries", summaries.len());

    let mut genes: Vec<i64> = rows.iter().map(|row| row.gene_callers_id).collect();
    genes.dedup();

    Ok(AnnotationReport {
        source: source.to_string(),
        sequences,
        outcome: AnnotationOutcome::Annotated {
            hits: raw_hits,
            rows: rows.len(),
            genes: genes.len(),
        },
        retained_temp_dir: session.finish(ctx),
    })
}
