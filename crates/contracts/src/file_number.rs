//! FileNumber - stable identity of one input trace log
//!
//! Assigned by input order when the logs are opened and never reused within a
//! run. Cheap to copy, usable as a map key, and parsed from the `N` of
//! command-line tweaks such as `N/250`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Index of an input log in command-line order.
///
/// # Examples
/// ```
/// use contracts::FileNumber;
///
/// let file: FileNumber = "2".parse().unwrap();
/// assert_eq!(file.index(), 2);
/// assert_eq!(file.to_string(), "file#2");
/// ```
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FileNumber(u16);

impl FileNumber {
    #[inline]
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// Position in the input list
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<usize> for FileNumber {
    type Error = std::num::TryFromIntError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        u16::try_from(index).map(Self)
    }
}

impl FromStr for FileNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u16>().map(Self)
    }
}

impl fmt::Display for FileNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

impl fmt::Debug for FileNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileNumber({})", self.0)
    }
}
