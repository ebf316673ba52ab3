//! Aligner - time origin selection and offset propagation
//!
//! The anchor is the one file whose history reaches back at least as far as
//! every partner it shares tags with. Offsets then flow outward from it along
//! the pair graph, first path wins.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use contracts::{
    AlignmentConfig, ClockOffset, FileNumber, OffsetStrategy, TraversalOrder, WeaverError,
};
use tracing::{debug, info, instrument, warn};

use crate::estimator::PairTable;
use crate::least_squares;

/// A file to align and its manual correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignTarget {
    pub file: FileNumber,
    pub tweak: ClockOffset,
}

impl AlignTarget {
    pub fn new(file: FileNumber, tweak: ClockOffset) -> Self {
        Self { file, tweak }
    }
}

/// Result of one alignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetAssignment {
    pub anchor: FileNumber,
    pub offsets: BTreeMap<FileNumber, ClockOffset>,
    /// Neighbour each single-path offset was derived from
    pub derived_from: BTreeMap<FileNumber, FileNumber>,
    /// Files with no chain of shared tags back to the anchor
    pub unreachable: Vec<FileNumber>,
}

impl OffsetAssignment {
    pub fn offset(&self, file: FileNumber) -> Option<ClockOffset> {
        self.offsets.get(&file).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.unreachable.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aligner {
    traversal: TraversalOrder,
    strategy: OffsetStrategy,
}

impl Aligner {
    pub fn new(traversal: TraversalOrder, strategy: OffsetStrategy) -> Self {
        Self {
            traversal,
            strategy,
        }
    }

    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self::new(config.traversal, config.strategy)
    }

    /// The unique file never out-stretched by a partner.
    ///
    /// # Errors
    /// - `AlignmentAmbiguity` unless exactly one file qualifies
    pub fn select_anchor(
        files: &[FileNumber],
        table: &PairTable,
    ) -> Result<FileNumber, WeaverError> {
        let candidates: Vec<FileNumber> = files
            .iter()
            .copied()
            .filter(|file| {
                table
                    .pairs_from(*file)
                    .all(|(_, stats)| stats.b_stretches_back_farther == 0)
            })
            .collect();

        match candidates.as_slice() {
            [anchor] => Ok(*anchor),
            _ => {
                warn!(?candidates, "no unique time origin");
                Err(WeaverError::AlignmentAmbiguity { candidates })
            }
        }
    }

    /// Choose the anchor and derive every reachable file's offset
    #[instrument(
        name = "aligner_align",
        skip_all,
        fields(files = targets.len(), traversal = ?self.traversal, strategy = ?self.strategy)
    )]
    pub fn align(
        &self,
        targets: &[AlignTarget],
        table: &PairTable,
    ) -> Result<OffsetAssignment, WeaverError> {
        let mut targets = targets.to_vec();
        targets.sort_by_key(|t| t.file);
        targets.dedup_by_key(|t| t.file);
        let files: Vec<FileNumber> = targets.iter().map(|t| t.file).collect();

        let anchor = Self::select_anchor(&files, table)?;
        info!(%anchor, "time origin selected");

        let mut assignment = OffsetAssignment {
            anchor,
            offsets: BTreeMap::from([(anchor, ClockOffset::ZERO)]),
            derived_from: BTreeMap::new(),
            unreachable: Vec::new(),
        };

        match self.strategy {
            OffsetStrategy::SinglePath => match self.traversal {
                TraversalOrder::DepthFirst => depth_first(&targets, table, &mut assignment),
                TraversalOrder::BreadthFirst => breadth_first(&targets, table, &mut assignment),
            },
            OffsetStrategy::LeastSquares => {
                fit_least_squares(&targets, table, &mut assignment)?
            }
        }

        assignment.unreachable = files
            .iter()
            .copied()
            .filter(|f| !assignment.offsets.contains_key(f))
            .collect();
        for file in &assignment.unreachable {
            warn!(%file, %anchor, "no sync evidence path to the time origin");
        }

        for (file, offset) in &assignment.offsets {
            debug!(%file, %offset, via = ?assignment.derived_from.get(file), "offset derived");
        }
        Ok(assignment)
    }
}

/// `Y = X + average(Y, X) + tweak(Y)`; `None` if Y is already offset or
/// shares no samples with X
fn derive(
    x: FileNumber,
    y: &AlignTarget,
    table: &PairTable,
    assignment: &OffsetAssignment,
) -> Option<ClockOffset> {
    if assignment.offsets.contains_key(&y.file) {
        return None;
    }
    let base = assignment.offset(x)?;
    let average = table.get(y.file, x)?.average_offset()?;
    Some(base + average + y.tweak)
}

/// Continue from each newly offset file before returning to its siblings.
///
/// The stack holds `(file, next candidate index)` so a file resumes its scan
/// where it left off once the branch below it is exhausted.
fn depth_first(targets: &[AlignTarget], table: &PairTable, assignment: &mut OffsetAssignment) {
    let mut stack = vec![(assignment.anchor, 0usize)];

    while let Some(&(x, cursor)) = stack.last() {
        let next = targets[cursor.min(targets.len())..]
            .iter()
            .enumerate()
            .find_map(|(i, y)| derive(x, y, table, assignment).map(|offset| (cursor + i, offset)));

        match next {
            Some((index, offset)) => {
                if let Some(top) = stack.last_mut() {
                    top.1 = index + 1;
                }
                let y = targets[index].file;
                assignment.offsets.insert(y, offset);
                assignment.derived_from.insert(y, x);
                stack.push((y, 0));
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Offset every neighbour of a file before moving outward
fn breadth_first(targets: &[AlignTarget], table: &PairTable, assignment: &mut OffsetAssignment) {
    let mut queue = VecDeque::from([assignment.anchor]);

    while let Some(x) = queue.pop_front() {
        for y in targets {
            if let Some(offset) = derive(x, y, table, assignment) {
                assignment.offsets.insert(y.file, offset);
                assignment.derived_from.insert(y.file, x);
                queue.push_back(y.file);
            }
        }
    }
}

fn fit_least_squares(
    targets: &[AlignTarget],
    table: &PairTable,
    assignment: &mut OffsetAssignment,
) -> Result<(), WeaverError> {
    let known: BTreeSet<FileNumber> = targets.iter().map(|t| t.file).collect();

    let mut reachable = BTreeSet::from([assignment.anchor]);
    let mut queue = VecDeque::from([assignment.anchor]);
    while let Some(x) = queue.pop_front() {
        for (y, _) in table.pairs_from(x) {
            if known.contains(&y) && reachable.insert(y) {
                queue.push_back(y);
            }
        }
    }

    let fitted = least_squares::fit(assignment.anchor, &reachable, table)?;
    for target in targets {
        if target.file == assignment.anchor {
            continue;
        }
        if let Some(offset) = fitted.get(&target.file) {
            assignment.offsets.insert(target.file, *offset + target.tweak);
        }
    }
    Ok(())
}
