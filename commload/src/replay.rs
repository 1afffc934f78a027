//! Replay engine: executes a recorded trace over a [`Transport`].
//!
//! Every rank walks the identical event sequence with its own cursor.
//! For each event the source rank performs a blocking send, the
//! destination rank a blocking receive, and everyone else advances
//! immediately. Rank 0 times its own walk; no barrier delays the timer
//! for other ranks, so the reported duration is rank 0's local
//! completion.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::trace::Trace;
use crate::transport::{Tag, Transport};
use crate::{Error, Result};

/// Observable lifecycle of one replaying rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    HeaderParsed,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Rank 0 logs the event index every this many body lines.
    pub progress_interval: usize,

    /// Shared failure flag checked before every blocking call. Unset by
    /// default: a rank that dies mid-trace then leaves its peer blocked
    /// on the unmatched operation.
    pub abort_flag: Option<Arc<AtomicBool>>,
}

impl Default for ReplayOptions {
    fn default() -> ReplayOptions {
        ReplayOptions {
            progress_interval: 500,
            abort_flag: None,
        }
    }
}

/// Outcome of one rank's replay.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub state: ReplayState,
    /// Wall time of the local walk; `Some` only on rank 0.
    pub elapsed: Option<Duration>,
    pub events_processed: usize,
}

pub struct ReplayEngine<T: Transport> {
    transport: T,
    opts: ReplayOptions,
    state: ReplayState,
}

impl<T: Transport> ReplayEngine<T> {
    pub fn new(transport: T, opts: ReplayOptions) -> ReplayEngine<T> {
        ReplayEngine {
            transport,
            opts,
            state: ReplayState::Idle,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    fn abort(&mut self, err: Error) -> Error {
        self.state = ReplayState::Aborted;
        error!("replay aborted: {}", err);
        err
    }

    /// Walk the trace to completion.
    ///
    /// Fails with `Topology` when fewer ranks were launched than the
    /// header declares. A rank outside `[0, procs_num)` does no work and
    /// completes idle.
    pub fn run(&mut self, trace: &Trace) -> Result<ReplayReport> {
        let header = &trace.header;
        self.state = ReplayState::HeaderParsed;

        if self.transport.size() < header.procs_num {
            return Err(self.abort(Error::Topology(format!(
                "trace addresses {} ranks but only {} are launched",
                header.procs_num,
                self.transport.size()
            ))));
        }
        let rank = self.transport.rank();
        if rank >= header.procs_num {
            self.state = ReplayState::Completed;
            return Ok(ReplayReport {
                state: self.state,
                elapsed: None,
                events_processed: 0,
            });
        }
        if let Some(oversized) = trace.events.iter().find(|e| e.size > header.transfer_buf) {
            return Err(self.abort(Error::Format(format!(
                "event size {} exceeds declared transfer buffer {}",
                oversized.size, header.transfer_buf
            ))));
        }
        if let Some(stray) = trace
            .events
            .iter()
            .find(|e| e.from >= header.procs_num || e.to >= header.procs_num)
        {
            return Err(self.abort(Error::Format(format!(
                "event {} -> {} addresses a rank outside the trace's {} ranks",
                stray.from, stray.to, header.procs_num
            ))));
        }

        // One reusable buffer serves every send and receive on this rank.
        let mut buf = vec![0u8; header.transfer_buf as usize];
        let sleep = Duration::from_millis(header.sleep);

        self.state = ReplayState::Running;
        let start = (rank == 0).then(Instant::now);

        for (index, event) in trace.events.iter().enumerate() {
            if rank == 0 && self.opts.progress_interval > 0 && index % self.opts.progress_interval == 0
            {
                info!("{}", index);
            }
            if rank != event.from && rank != event.to {
                continue;
            }

            if let Some(flag) = &self.opts.abort_flag {
                if flag.load(Ordering::SeqCst) {
                    self.state = ReplayState::Aborted;
                    error!("replay stopped by abort signal before event {}", index);
                    return Ok(ReplayReport {
                        state: self.state,
                        elapsed: None,
                        events_processed: index,
                    });
                }
            }

            let size = event.size as usize;
            let outcome = if rank == event.from {
                self.transport.send(&buf[..size], event.to, event.from as Tag)
            } else {
                self.transport
                    .recv(&mut buf[..size], event.from, event.from as Tag)
                    .map(|_| ())
            };
            if let Err(err) = outcome {
                return Err(self.abort(err));
            }
            if header.sleep > 0 {
                thread::sleep(sleep);
            }
        }

        let elapsed = start.map(|started| started.elapsed());
        self.state = ReplayState::Completed;
        if let Some(elapsed) = elapsed {
            info!(
                "replayed {} events in {:.6} s",
                trace.events.len(),
                elapsed.as_secs_f64()
            );
        }
        Ok(ReplayReport {
            state: self.state,
            elapsed,
            events_processed: trace.events.len(),
        })
    }
}
