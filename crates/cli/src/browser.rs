//! Line-oriented browser over an indexed merged timeline.
//!
//! Commands read one per line: `<n>` jumps to merged record n, `n` shows the
//! next record, `p` the previous one, `q` quits.

use std::io::{BufRead, Write};

use ingestion::WeaverLogFile;
use timeline::{format_entry, IndexedTimeline, TimestampStyle};
use tracing::debug;

use crate::error::Result;

const HELP: &str = "commands: <n> jump to record n, n next, p previous, q quit";

/// Outcome of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

pub struct Browser<'a> {
    index: &'a IndexedTimeline,
    style: TimestampStyle,
    cursor: Option<usize>,
    shown: u64,
}

impl<'a> Browser<'a> {
    pub fn new(index: &'a IndexedTimeline, style: TimestampStyle) -> Self {
        Self {
            index,
            style,
            cursor: None,
            shown: 0,
        }
    }

    /// Index of the record shown last
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Serve commands from `input` until `q` or end of input.
    ///
    /// Returns the number of records shown.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        files: &mut [WeaverLogFile],
        input: R,
        out: &mut W,
    ) -> Result<u64> {
        writeln!(out, "{} merged records; {HELP}", self.index.len())?;
        out.flush()?;

        for line in input.lines() {
            let line = line?;
            let step = self.step(files, line.trim(), out)?;
            out.flush()?;
            if step == Step::Quit {
                break;
            }
        }

        debug!(shown = self.shown, "browser closed");
        Ok(self.shown)
    }

    /// Execute one command
    pub fn step<W: Write>(
        &mut self,
        files: &mut [WeaverLogFile],
        command: &str,
        out: &mut W,
    ) -> Result<Step> {
        let target = match command {
            "" => return Ok(Step::Continue),
            "q" => return Ok(Step::Quit),
            "n" => self.cursor.map_or(0, |c| c + 1),
            "p" => match self.cursor {
                Some(c) if c > 0 => c - 1,
                _ => {
                    writeln!(out, "at start of timeline")?;
                    return Ok(Step::Continue);
                }
            },
            other => match other.parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    writeln!(out, "unknown command '{other}'; {HELP}")?;
                    return Ok(Step::Continue);
                }
            },
        };

        if target >= self.index.len() {
            writeln!(
                out,
                "no record {target}: timeline has {} records",
                self.index.len()
            )?;
            return Ok(Step::Continue);
        }

        let entry = self.index.get(files, target)?;
        writeln!(out, "{}", format_entry(&entry, self.style))?;
        self.cursor = Some(target);
        self.shown += 1;
        Ok(Step::Continue)
    }
}
