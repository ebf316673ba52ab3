//! TraceRecord - decoded tile trace entry
//!
//! One record per traced event. The engine only looks at `timestamp` and
//! `sync_tag`; everything else is carried through to the merged output.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::UniqueTime;

/// Correlation token shared by two tiles during a handshake.
///
/// Positive values come from the originator, negative ones from the echoer.
/// Matching only uses the absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncTag(i32);

impl SyncTag {
    /// `None` for the reserved "no tag" value
    #[inline]
    pub fn new(raw: i32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    #[inline]
    pub fn raw(&self) -> i32 {
        self.0
    }

    /// Matching key shared by originator and echoer
    #[inline]
    pub fn key(&self) -> u32 {
        self.0.unsigned_abs()
    }

    #[inline]
    pub fn is_originator(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

/// Inter-tile direction on the hexagonal tile grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Et,
    Se,
    Sw,
    Wt,
    Nw,
    Ne,
}

impl Direction {
    /// All six directions, clockwise from east
    pub const ALL: [Direction; 6] = [
        Direction::Et,
        Direction::Se,
        Direction::Sw,
        Direction::Wt,
        Direction::Nw,
        Direction::Ne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Et => "ET",
            Direction::Se => "SE",
            Direction::Sw => "SW",
            Direction::Wt => "WT",
            Direction::Nw => "NW",
            Direction::Ne => "NE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the tile within an event window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EwRole {
    /// The tile running the event
    Active,
    /// Neighbour lending its sites, seen from `Direction`
    Passive(Direction),
}

/// Maximum concurrent event-window slots per tile
pub const MAX_EW_SLOTS: u8 = 32;

/// Subject of a trace record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    /// The whole tile
    Tile,
    /// Inter-tile connection
    Itc(Direction),
    /// Event-window slot
    EventWindow { slot: u8, role: EwRole },
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tile => f.write_str("tile"),
            Address::Itc(dir) => write!(f, "itc/{dir}"),
            Address::EventWindow {
                slot,
                role: EwRole::Active,
            } => write!(f, "ew{slot}/active"),
            Address::EventWindow {
                slot,
                role: EwRole::Passive(dir),
            } => write!(f, "ew{slot}/passive-{dir}"),
        }
    }
}

/// Kind of traced event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCode {
    /// Tile start / stop
    TileLifecycle,
    /// Per-direction ITC state change
    ItcState,
    /// Event-window state change
    EwState,
    /// Event-window slot assignment
    EwAssign,
    /// Event-window circuit state change
    EwCircuit,
    /// Free-form text line
    LogLine,
}

impl TypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCode::TileLifecycle => "tile",
            TypeCode::ItcState => "itc",
            TypeCode::EwState => "ew-state",
            TypeCode::EwAssign => "ew-assign",
            TypeCode::EwCircuit => "ew-circuit",
            TypeCode::LogLine => "log",
        }
    }
}

/// Decoded trace record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Local-clock time, or aligned time once an offset was applied
    pub timestamp: UniqueTime,

    pub type_code: TypeCode,

    pub address: Address,

    /// Raw tag; 0 means none
    #[serde(default)]
    pub sync_tag: i32,

    /// Producer-owned bytes
    #[serde(default)]
    pub payload: Bytes,
}

impl TraceRecord {
    /// Record without tag or payload
    pub fn new(timestamp: UniqueTime, type_code: TypeCode, address: Address) -> Self {
        Self {
            timestamp,
            type_code,
            address,
            sync_tag: 0,
            payload: Bytes::new(),
        }
    }

    pub fn with_sync_tag(mut self, raw: i32) -> Self {
        self.sync_tag = raw;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// The tag, if the record carries one
    #[inline]
    pub fn sync_tag(&self) -> Option<SyncTag> {
        SyncTag::new(self.sync_tag)
    }

    /// Printable payload: text for log lines, hex bytes otherwise
    pub fn payload_pretty(&self) -> String {
        if self.payload.is_empty() {
            return "-".to_string();
        }
        match self.type_code {
            TypeCode::LogLine => {
                format!("{:?}", String::from_utf8_lossy(&self.payload).trim_end())
            }
            _ => self
                .payload
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tag_is_absent() {
        let record = TraceRecord::new(UniqueTime::default(), TypeCode::ItcState, Address::Tile);
        assert!(record.sync_tag().is_none());
        assert_eq!(record.with_sync_tag(-17).sync_tag().map(|t| t.key()), Some(17));
    }

    #[test]
    fn test_tag_provenance() {
        let origin = SyncTag::new(42).unwrap();
        let echo = SyncTag::new(-42).unwrap();
        assert!(origin.is_originator());
        assert!(!echo.is_originator());
        assert_eq!(origin.key(), echo.key());
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address::Tile.to_string(), "tile");
        assert_eq!(Address::Itc(Direction::Nw).to_string(), "itc/NW");
        assert_eq!(
            Address::EventWindow {
                slot: 3,
                role: EwRole::Passive(Direction::Se)
            }
            .to_string(),
            "ew3/passive-SE"
        );
    }

    #[test]
    fn test_payload_pretty() {
        let base = TraceRecord::new(UniqueTime::default(), TypeCode::LogLine, Address::Tile);
        assert_eq!(base.payload_pretty(), "-");
        assert_eq!(
            base.clone().with_payload(&b"booted\n"[..]).payload_pretty(),
            "\"booted\""
        );

        let mut itc = base.with_payload(vec![0x0a, 0xff]);
        itc.type_code = TypeCode::ItcState;
        assert_eq!(itc.payload_pretty(), "0a ff");
    }

    #[test]
    fn test_record_json_shape() {
        let record = TraceRecord::new(
            UniqueTime::new(5, 1, 0),
            TypeCode::EwAssign,
            Address::EventWindow {
                slot: 1,
                role: EwRole::Active,
            },
        )
        .with_sync_tag(9);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: TraceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);

        // Missing tag and payload default to absent
        let sparse: TraceRecord = serde_json::from_str(
            r#"{"timestamp":{"seconds":1,"nanos":2},"type_code":"log_line","address":"tile"}"#,
        )
        .unwrap();
        assert_eq!(sparse.sync_tag(), None);
        assert_eq!(sparse.timestamp.uniquer, 0);
    }
}
