//! Trace text format shared by the generators and the replay engine.
//!
//! A trace file is a header block followed by an ordered event body. Header
//! lines are either `#` comments (statistics, ignored on replay) or
//! `%key: value` configuration lines; a line of dashes terminates the
//! header. Every body line has the form `s <from> <to> <size>`.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::{Error, Result};

/// Line separating the header block from the event body.
pub const TERMINATOR: &str = "-------------------------";

/// One recorded point-to-point transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    pub from: usize,
    pub to: usize,
    pub size: u64,
}

/// Replay-relevant header fields plus informational comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceHeader {
    /// Number of ranks the trace addresses.
    pub procs_num: usize,
    /// Largest single transfer; sizes the reusable replay buffer.
    pub transfer_buf: u64,
    /// Post-operation delay in milliseconds.
    pub sleep: u64,
    /// Sleep dispersion, only written by the degree-constrained generator.
    pub sleep_disp: Option<u64>,
    /// `#` statistics lines, stored without the prefix.
    pub comments: Vec<String>,
}

/// An ordered communication recording. Event order is semantically
/// meaningful: every replaying rank walks the sequence front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub header: TraceHeader,
    pub events: Vec<TraceEvent>,
}

impl Trace {
    /// Write the textual representation of the trace.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for comment in &self.header.comments {
            writeln!(w, "#{}", comment)?;
        }
        writeln!(w, "%procs_num: {}", self.header.procs_num)?;
        writeln!(w, "%transfer_buf: {}", self.header.transfer_buf)?;
        writeln!(w, "%sleep: {}", self.header.sleep)?;
        if let Some(disp) = self.header.sleep_disp {
            writeln!(w, "%sleep_disp: {}", disp)?;
        }
        writeln!(w, "{}", TERMINATOR)?;
        for event in &self.events {
            writeln!(w, "s {} {} {}", event.from, event.to, event.size)?;
        }
        Ok(())
    }

    /// Parse a trace from a reader.
    ///
    /// Unknown `%` keys are accepted and ignored; `#` lines are kept as
    /// comments. Fails if the terminator is missing, a configuration line
    /// is not `key: integer`, or an `s` body line is short a field.
    pub fn read_from<R: BufRead>(r: R) -> Result<Trace> {
        let mut header = TraceHeader::default();
        let mut events = Vec::new();
        let mut saw_terminator = false;

        let mut lines = r.lines();
        for line in &mut lines {
            let line = line?;
            let line = line.trim();
            if line.starts_with('-') {
                saw_terminator = true;
                break;
            }
            if let Some(rest) = line.strip_prefix('#') {
                header.comments.push(rest.trim().to_string());
                continue;
            }
            if let Some(rest) = line.strip_prefix('%') {
                let (key, value) = rest.split_once(':').ok_or_else(|| {
                    Error::Format(format!("configuration line without value: {:?}", line))
                })?;
                let parsed: u64 = value.trim().parse().map_err(|_| {
                    Error::Format(format!("non-integer configuration value: {:?}", line))
                })?;
                // Exact key match: a `sleep_disp` line must not be taken
                // for `sleep`.
                match key.trim() {
                    "procs_num" => header.procs_num = parsed as usize,
                    "transfer_buf" => header.transfer_buf = parsed,
                    "sleep" => header.sleep = parsed,
                    "sleep_disp" => header.sleep_disp = Some(parsed),
                    _ => {}
                }
            }
        }
        if !saw_terminator {
            return Err(Error::Format("trace has no terminator line".to_string()));
        }

        for line in lines {
            let line = line?;
            let mut fields = line.split_whitespace();
            // Anything that is not an `s` record is a stray comment.
            if fields.next() != Some("s") {
                continue;
            }
            let mut numeric = |name: &str| -> Result<u64> {
                fields
                    .next()
                    .ok_or_else(|| {
                        Error::Format(format!("event line missing field {:?}: {:?}", name, line))
                    })?
                    .parse()
                    .map_err(|_| {
                        Error::Format(format!("malformed event field {:?}: {:?}", name, line))
                    })
            };
            let from = numeric("from")? as usize;
            let to = numeric("to")? as usize;
            let size = numeric("size")?;
            events.push(TraceEvent { from, to, size });
        }

        Ok(Trace { header, events })
    }

    /// Write the trace to a file, creating or truncating it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Read and parse a trace file.
    pub fn load(path: &Path) -> Result<Trace> {
        let file = File::open(path)?;
        Trace::read_from(BufReader::new(file))
    }
}
