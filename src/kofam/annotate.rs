//! Annotation of contigs database genes with KOfam profiles.

use crate::annotate::{AnnotationOutcome, AnnotationReport, SearchSession, check_preconditions};
use crate::app::RunContext;
use crate::contigs::{FunctionRow, FunctionStore};
use crate::domain::{Dataset, MissingPolicy};
use crate::error::ProfileDbError;
use crate::hits::AnnotationHit;
use crate::hmmer::{HmmerTools, NoiseCutoff, TableFormat};
use crate::kofam::ko_list::KoList;
use crate::store::{DataDirectory, KO_LIST};

/// Keeps the hits that reach their KO's bit score threshold. Hits to KOs
/// without a usable `ko_list` entry have nothing to be checked against and
/// pass through; their definitions are settled by the `MissingPolicy`.
pub fn threshold_hits(hits: Vec<AnnotationHit>, ko_list: &KoList) -> Vec<AnnotationHit> {
    hits.into_iter()
        .filter(|hit| match ko_list.get(&hit.profile_name) {
            Some(entry) => entry.passes(hit.bit_score, hit.domain_bit_score),
            None => {
                tracing::debug!(profile = %hit.profile_name, "hit to a KO without threshold kept");
                true
            }
        })
        .collect()
}

pub fn function_rows(
    hits: &[AnnotationHit],
    ko_list: &KoList,
    missing: MissingPolicy,
) -> Result<Vec<FunctionRow>, ProfileDbError> {
    hits.iter()
        .map(|hit| {
            Ok(FunctionRow {
                gene_callers_id: hit.gene_callers_id,
                source: Dataset::Kofam.source_name().to_string(),
                accession: hit.profile_name.clone(),
                function: ko_list.definition(&hit.profile_name, missing)?,
                e_value: hit.e_value,
            })
        })
        .collect()
}

pub fn annotate<S, H>(
    data_dir: &DataDirectory,
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
    let ko_list = KoList::load(data_dir.path(KO_LIST).as_std_path())?;
    let source = Dataset::Kofam.source_name();

    let mut session = SearchSession::prepare(store, ctx)?;
    if session.num_sequences == 0 {
        return session.no_hits(store, source, "the contigs database has no gene sequences", ctx);
    }
    let hits = session.search(
        hmmer,
        data_dir,
        TableFormat::PerSequence,
        NoiseCutoff::None,
        num_threads,
        ctx,
    )?;
    let sequences = session.num_sequences;

    if hits.is_empty() {
        return session.no_hits(store, source, "the search returned no hits", ctx);
    }

    let raw_hits = hits.len();
    let hits = threshold_hits(hits, &ko_list);
    ctx.info("Hits above KO thresholds", format!("{} of {raw_hits}", hits.len()));

    let rows = function_rows(&hits, &ko_list, missing)?;
    if rows.is_empty() {
        return session.no_hits(store, source, "no hit reached its KO threshold", ctx);
    }
    store.add_gene_functions(source, &rows)?;

    let mut genes: Vec<i64> = rows.iter().map(|row| row.gene_callers_id).collect();
    genes.sort_unstable();
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
