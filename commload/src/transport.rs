//! Minimal point-to-point messaging seam for the replay engine.
//!
//! The replay engine only needs blocking tagged send/receive between
//! ranks, so that is all the trait exposes. `commload-mpi` provides the
//! multi-process implementation; [`channel_group`] provides an
//! in-process one over threads for tests.
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::{Error, Result};

/// Message tag; the replay engine tags every transfer with the sender's
/// rank.
pub type Tag = i32;

/// Blocking point-to-point transport between a fixed set of ranks.
pub trait Transport {
    /// Rank of the calling process.
    fn rank(&self) -> usize;

    /// Number of launched ranks.
    fn size(&self) -> usize;

    /// Blocking send of `buf` to `dest`.
    fn send(&mut self, buf: &[u8], dest: usize, tag: Tag) -> Result<()>;

    /// Blocking receive from `source` with a matching tag, filling up to
    /// `buf.len()` bytes. Returns the number of bytes received.
    fn recv(&mut self, buf: &mut [u8], source: usize, tag: Tag) -> Result<usize>;
}

struct Packet {
    source: usize,
    tag: Tag,
    data: Vec<u8>,
}

/// In-process transport connecting the ranks of one [`channel_group`].
///
/// Receives match on `(source, tag)`; arrivals from other peers are
/// stashed in order so nothing is dropped while one pair is ahead of
/// another.
pub struct ChannelTransport {
    rank: usize,
    peers: Vec<Sender<Packet>>,
    inbox: Receiver<Packet>,
    stash: VecDeque<Packet>,
}

/// Build `n` connected transports, one per rank, each movable to its own
/// thread.
pub fn channel_group(n: usize) -> Vec<ChannelTransport> {
    let (senders, inboxes): (Vec<_>, Vec<_>) = (0..n).map(|_| channel()).unzip();
    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| ChannelTransport {
            rank,
            peers: senders.clone(),
            inbox,
            stash: VecDeque::new(),
        })
        .collect()
}

fn broken_pipe() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "peer rank disconnected",
    ))
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&mut self, buf: &[u8], dest: usize, tag: Tag) -> Result<()> {
        let packet = Packet {
            source: self.rank,
            tag,
            data: buf.to_vec(),
        };
        self.peers[dest].send(packet).map_err(|_| broken_pipe())
    }

    fn recv(&mut self, buf: &mut [u8], source: usize, tag: Tag) -> Result<usize> {
        if let Some(pos) = self
            .stash
            .iter()
            .position(|p| p.source == source && p.tag == tag)
        {
            let packet = self.stash.remove(pos).unwrap();
            let len = packet.data.len().min(buf.len());
            buf[..len].copy_from_slice(&packet.data[..len]);
            return Ok(len);
        }
        loop {
            let packet = self.inbox.recv().map_err(|_| broken_pipe())?;
            if packet.source == source && packet.tag == tag {
                let len = packet.data.len().min(buf.len());
                buf[..len].copy_from_slice(&packet.data[..len]);
                return Ok(len);
            }
            self.stash.push_back(packet);
        }
    }
}
