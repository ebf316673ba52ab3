//! Weighted least-squares offset fit
//!
//! Each populated pair `(a, b)` with `a < b` gives one equation
//! `offset(a) - offset(b) = average(a, b)`, weighted by √count. The anchor is
//! pinned to zero and dropped from the unknowns.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{ClockOffset, FileNumber, WeaverError};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::estimator::PairTable;

const SINGULAR_EPS: f64 = 1e-12;

/// Offsets (without manual tweaks) for `reachable`, which must contain the
/// anchor and form one connected component of the pair graph.
pub(crate) fn fit(
    anchor: FileNumber,
    reachable: &BTreeSet<FileNumber>,
    table: &PairTable,
) -> Result<BTreeMap<FileNumber, ClockOffset>, WeaverError> {
    let unknowns: Vec<FileNumber> = reachable.iter().copied().filter(|f| *f != anchor).collect();
    let column = |file: FileNumber| unknowns.iter().position(|u| *u == file);

    let mut offsets = BTreeMap::from([(anchor, ClockOffset::ZERO)]);
    if unknowns.is_empty() {
        return Ok(offsets);
    }

    let equations: Vec<_> = table
        .iter()
        .filter(|((a, b), _)| a < b && reachable.contains(a) && reachable.contains(b))
        .filter_map(|((a, b), stats)| Some((a, b, stats.average()?, stats.sample_count)))
        .collect();

    let mut matrix = DMatrix::<f64>::zeros(equations.len(), unknowns.len());
    let mut rhs = DVector::<f64>::zeros(equations.len());
    for (row, (a, b, average, count)) in equations.iter().enumerate() {
        let weight = (*count as f64).sqrt();
        if let Some(col) = column(*a) {
            matrix[(row, col)] = weight;
        }
        if let Some(col) = column(*b) {
            matrix[(row, col)] = -weight;
        }
        rhs[row] = weight * average;
    }

    let solution = matrix
        .svd(true, true)
        .solve(&rhs, SINGULAR_EPS)
        .map_err(|e| WeaverError::Other(format!("least-squares offset fit failed: {e}")))?;

    for (col, file) in unknowns.iter().enumerate() {
        offsets.insert(*file, ClockOffset::from_secs_f64(solution[col]));
    }
    debug!(equations = equations.len(), unknowns = unknowns.len(), "least-squares fit solved");
    Ok(offsets)
}
