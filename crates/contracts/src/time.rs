//! UniqueTime - collision-free trace timestamps
//!
//! Every trace record carries a `UniqueTime`. Two records stamped in the same
//! nanosecond are told apart by the `uniquer`, so the derived ordering is a
//! strict total order over everything one process emits.
//!
//! Offsets between clocks are signed and live in [`ClockOffset`].

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::WeaverError;

/// Nanoseconds per second
pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Ordered, collision-broken point in time.
///
/// Field order matters: the derived `Ord` compares seconds, then nanos, then
/// uniquer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "RawUniqueTime")]
pub struct UniqueTime {
    /// Whole seconds
    pub seconds: i64,
    /// Sub-second part, always below one billion
    pub nanos: u32,
    /// Tie breaker for equal (seconds, nanos)
    #[serde(default)]
    pub uniquer: u8,
}

/// Wire shape of [`UniqueTime`]; decoded nanos may exceed one second
#[derive(Deserialize)]
struct RawUniqueTime {
    seconds: i64,
    nanos: u32,
    #[serde(default)]
    uniquer: u8,
}

impl From<RawUniqueTime> for UniqueTime {
    fn from(raw: RawUniqueTime) -> Self {
        UniqueTime::new(raw.seconds, raw.nanos, raw.uniquer)
    }
}

impl UniqueTime {
    /// Build a timestamp, carrying excess nanoseconds into seconds
    pub fn new(seconds: i64, nanos: u32, uniquer: u8) -> Self {
        Self {
            seconds: seconds.saturating_add(i64::from(nanos / NANOS_PER_SECOND)),
            nanos: nanos % NANOS_PER_SECOND,
            uniquer,
        }
    }

    /// The real-time part, without the uniquer
    #[inline]
    pub fn instant(&self) -> (i64, u32) {
        (self.seconds, self.nanos)
    }

    /// `self - rhs`, requiring `self >= rhs`.
    ///
    /// The uniquer of the result is the saturated difference of the operands'
    /// uniquers; it only keeps results orderable.
    pub fn checked_sub(&self, rhs: &UniqueTime) -> Result<UniqueTime, WeaverError> {
        if self < rhs {
            return Err(WeaverError::OrderingViolation {
                minuend: *self,
                subtrahend: *rhs,
            });
        }

        let (seconds, nanos) = if self.nanos >= rhs.nanos {
            (self.seconds - rhs.seconds, self.nanos - rhs.nanos)
        } else {
            (
                self.seconds - rhs.seconds - 1,
                self.nanos + NANOS_PER_SECOND - rhs.nanos,
            )
        };
        let uniquer = (i16::from(self.uniquer) - i16::from(rhs.uniquer)).clamp(0, 255) as u8;

        Ok(UniqueTime {
            seconds,
            nanos,
            uniquer,
        })
    }

    /// Signed real-time distance `self - other`, uniquers ignored
    pub fn offset_from(&self, other: &UniqueTime) -> ClockOffset {
        let seconds = i128::from(self.seconds) - i128::from(other.seconds);
        let nanos = i128::from(self.nanos) - i128::from(other.nanos);
        let total = seconds * i128::from(NANOS_PER_SECOND) + nanos;
        ClockOffset::from_nanos(total.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Translate by `-offset`, keeping the uniquer
    pub fn shift_back(&self, offset: ClockOffset) -> UniqueTime {
        self.shift_nanos(-i128::from(offset.as_nanos()))
    }

    /// Translate by `+offset`, keeping the uniquer
    pub fn shift_forward(&self, offset: ClockOffset) -> UniqueTime {
        self.shift_nanos(i128::from(offset.as_nanos()))
    }

    fn shift_nanos(&self, delta: i128) -> UniqueTime {
        let base = i128::from(NANOS_PER_SECOND);
        let total = i128::from(self.seconds) * base + i128::from(self.nanos) + delta;
        UniqueTime {
            seconds: total.div_euclid(base) as i64,
            nanos: total.rem_euclid(base) as u32,
            uniquer: self.uniquer,
        }
    }

    /// Lossy conversion for display and statistics
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + f64::from(self.nanos) / f64::from(NANOS_PER_SECOND)
    }

    /// Lossy conversion for display and statistics
    pub fn from_secs_f64(value: f64) -> UniqueTime {
        let seconds = value.floor();
        let nanos = ((value - seconds) * f64::from(NANOS_PER_SECOND)).round() as u32;
        UniqueTime::new(seconds as i64, nanos, 0)
    }
}

impl Add for UniqueTime {
    type Output = UniqueTime;

    fn add(self, rhs: UniqueTime) -> UniqueTime {
        let nanos = self.nanos + rhs.nanos;
        UniqueTime {
            seconds: self.seconds + rhs.seconds + i64::from(nanos / NANOS_PER_SECOND),
            nanos: nanos % NANOS_PER_SECOND,
            uniquer: self.uniquer.saturating_add(rhs.uniquer),
        }
    }
}

impl fmt::Display for UniqueTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}#{}", self.seconds, self.nanos, self.uniquer)
    }
}

/// Issues `UniqueTime`s, breaking ties against the last issued instant.
///
/// Replaces a process-wide latch: callers own the source, so tests decide
/// exactly which stamps collide.
#[derive(Debug, Default)]
pub struct UniquerSource {
    last: Option<UniqueTime>,
}

impl UniquerSource {
    /// Create a source with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a given instant.
    ///
    /// Uniquer is one more than the last issued one when the instant repeats,
    /// otherwise zero. It saturates at 255.
    pub fn stamp(&mut self, seconds: i64, nanos: u32) -> UniqueTime {
        let base = UniqueTime::new(seconds, nanos, 0);
        let uniquer = match self.last {
            Some(last) if last.instant() == base.instant() => {
                if last.uniquer == u8::MAX {
                    tracing::warn!(instant = %base, "uniquer exhausted for repeated instant");
                }
                last.uniquer.saturating_add(1)
            }
            _ => 0,
        };

        let stamped = UniqueTime { uniquer, ..base };
        self.last = Some(stamped);
        stamped
    }

    /// Stamp the current wall-clock time
    pub fn now(&mut self) -> UniqueTime {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => self.stamp(since.as_secs() as i64, since.subsec_nanos()),
            Err(before) => {
                let before = before.duration();
                let shifted = UniqueTime::default().shift_back(ClockOffset::from_nanos(
                    before.as_nanos().min(i64::MAX as u128) as i64,
                ));
                self.stamp(shifted.seconds, shifted.nanos)
            }
        }
    }

    /// Last issued timestamp
    pub fn last(&self) -> Option<UniqueTime> {
        self.last
    }
}

/// Signed clock correction in nanoseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClockOffset(i64);

impl ClockOffset {
    /// No correction
    pub const ZERO: ClockOffset = ClockOffset(0);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    /// Rounded to the nearest nanosecond
    pub fn from_secs_f64(seconds: f64) -> Self {
        Self((seconds * f64::from(NANOS_PER_SECOND)).round() as i64)
    }

    #[inline]
    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / f64::from(NANOS_PER_SECOND)
    }

    #[inline]
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

impl Add for ClockOffset {
    type Output = ClockOffset;

    fn add(self, rhs: ClockOffset) -> ClockOffset {
        ClockOffset(self.0.saturating_add(rhs.0))
    }
}

impl Sub for ClockOffset {
    type Output = ClockOffset;

    fn sub(self, rhs: ClockOffset) -> ClockOffset {
        ClockOffset(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for ClockOffset {
    type Output = ClockOffset;

    fn neg(self) -> ClockOffset {
        ClockOffset(self.0.saturating_neg())
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "+" };
        let magnitude = self.0.unsigned_abs();
        let base = u64::from(NANOS_PER_SECOND);
        write!(f, "{sign}{}.{:09}s", magnitude / base, magnitude % base)
    }
}
