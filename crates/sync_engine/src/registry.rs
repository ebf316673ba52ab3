//! Sync tag registry
//!
//! Remembers every tagged record seen during the evidence pass, keyed by the
//! tag's magnitude. Originator and receiver share a key; the sign only tells
//! which side emitted the tag.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{ClockOffset, FileNumber, UniqueTime};
use ingestion::SyncObservation;

/// One use of a tag in one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOccurrence {
    pub file: FileNumber,
    /// The file's first-record timestamp
    pub file_first: UniqueTime,
    /// Local timestamp of the tagged record
    pub timestamp: UniqueTime,
    pub position: u64,
    pub originator: bool,
}

impl TagOccurrence {
    /// How far the file's history reaches back before this occurrence
    pub fn stretch_back(&self) -> ClockOffset {
        self.timestamp.offset_from(&self.file_first)
    }

    /// Provenance sign of the raw tag: `+` originator, `-` echoer
    pub fn sign(&self) -> char {
        if self.originator {
            '+'
        } else {
            '-'
        }
    }
}

impl From<&SyncObservation> for TagOccurrence {
    fn from(observation: &SyncObservation) -> Self {
        Self {
            file: observation.file,
            file_first: observation.file_first,
            timestamp: observation.timestamp,
            position: observation.position,
            originator: observation.tag.is_originator(),
        }
    }
}

/// How a tag was used across the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Seen in a single file only, contributes nothing
    Unmatched,
    /// Exactly one occurrence in each of two files
    Clean,
    /// More than two files, or repeated within a file
    Alias,
}

impl TagClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagClass::Unmatched => "unmatched",
            TagClass::Clean => "clean",
            TagClass::Alias => "alias",
        }
    }
}

/// One row of the tag usage report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUsage {
    pub tag: u32,
    pub files: Vec<FileNumber>,
    /// Every use of the tag, in observation order
    pub occurrences: Vec<TagOccurrence>,
    pub class: TagClass,
}

/// Tag -> every occurrence, in observation order
#[derive(Debug, Clone, Default)]
pub struct SyncTagRegistry {
    usage: BTreeMap<u32, Vec<TagOccurrence>>,
}

impl SyncTagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an occurrence; returns the earlier occurrences of the same tag
    /// in other files, which are the ones it must be paired with.
    pub fn register(&mut self, tag: u32, occurrence: TagOccurrence) -> Vec<TagOccurrence> {
        let entries = self.usage.entry(tag).or_default();
        let earlier = entries
            .iter()
            .filter(|e| e.file != occurrence.file)
            .copied()
            .collect();
        entries.push(occurrence);
        earlier
    }

    pub fn occurrences(&self, tag: u32) -> &[TagOccurrence] {
        self.usage.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All tags in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[TagOccurrence])> + '_ {
        self.usage.iter().map(|(tag, occ)| (*tag, occ.as_slice()))
    }

    pub fn tag_count(&self) -> usize {
        self.usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usage.is_empty()
    }

    /// Distinct files that used `tag`, ascending
    pub fn files_using(&self, tag: u32) -> Vec<FileNumber> {
        self.occurrences(tag)
            .iter()
            .map(|o| o.file)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Per-tag usage rows, ascending by tag
    pub fn usage_report(&self) -> Vec<TagUsage> {
        self.usage
            .iter()
            .map(|(tag, occurrences)| {
                let files = self.files_using(*tag);
                let class = match files.len() {
                    0 | 1 => TagClass::Unmatched,
                    2 if occurrences.len() == 2 => TagClass::Clean,
                    _ => TagClass::Alias,
                };
                TagUsage {
                    tag: *tag,
                    files,
                    occurrences: occurrences.clone(),
                    class,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(file: u16, seconds: i64) -> TagOccurrence {
        TagOccurrence {
            file: FileNumber::new(file),
            file_first: UniqueTime::new(0, 0, 0),
            timestamp: UniqueTime::new(seconds, 0, 0),
            position: seconds as u64,
            originator: file == 0,
        }
    }

    #[test]
    fn test_register_returns_other_files_only() {
        let mut registry = SyncTagRegistry::new();
        assert!(registry.register(5, occ(0, 1)).is_empty());
        assert!(registry.register(5, occ(0, 2)).is_empty());

        let earlier = registry.register(5, occ(1, 3));
        assert_eq!(earlier.len(), 2);
        assert!(earlier.iter().all(|o| o.file == FileNumber::new(0)));
        assert_eq!(registry.occurrences(5).len(), 3);
        assert!(registry.occurrences(6).is_empty());
    }

    #[test]
    fn test_usage_report_classes() {
        let mut registry = SyncTagRegistry::new();
        registry.register(1, occ(0, 1));
        registry.register(2, occ(0, 1));
        registry.register(2, occ(1, 1));
        registry.register(3, occ(0, 1));
        registry.register(3, occ(1, 1));
        registry.register(3, occ(2, 1));
        registry.register(4, occ(0, 1));
        registry.register(4, occ(0, 2));
        registry.register(4, occ(1, 1));

        let classes: Vec<_> = registry
            .usage_report()
            .iter()
            .map(|u| (u.tag, u.class))
            .collect();
        assert_eq!(
            classes,
            vec![
                (1, TagClass::Unmatched),
                (2, TagClass::Clean),
                (3, TagClass::Alias),
                (4, TagClass::Alias),
            ]
        );
        assert_eq!(registry.files_using(3).len(), 3);
        assert_eq!(registry.tag_count(), 4);

        let repeated = &registry.usage_report()[3];
        assert_eq!(repeated.occurrences.len(), 3);
        assert_eq!(repeated.occurrences[1].timestamp, UniqueTime::new(2, 0, 0));
        assert_eq!(repeated.occurrences[1].sign(), '+');
        assert_eq!(repeated.occurrences[2].sign(), '-');
    }
}
