//! MPI-backed transport for the replay engine.
//!
//! Wraps any rsmpi communicator (normally the world communicator) behind
//! the core `Transport` trait, using blocking tagged point-to-point
//! operations. Kept separate from the core crate so tests and tools
//! without an MPI installation never link against it.
use mpi::traits::*;

use commload::transport::{Tag, Transport};
use commload::Result;

/// Blocking point-to-point transport over an MPI communicator.
///
/// The caller must hold the `mpi::initialize` universe alive for the
/// whole replay.
pub struct WorldTransport<C: Communicator> {
    comm: C,
}

impl<C: Communicator> WorldTransport<C> {
    pub fn new(comm: C) -> WorldTransport<C> {
        WorldTransport { comm }
    }
}

impl<C: Communicator> Transport for WorldTransport<C> {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn send(&mut self, buf: &[u8], dest: usize, tag: Tag) -> Result<()> {
        self.comm.process_at_rank(dest as i32).send_with_tag(buf, tag);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], source: usize, tag: Tag) -> Result<usize> {
        let status = self
            .comm
            .process_at_rank(source as i32)
            .receive_into_with_tag(buf, tag);
        let count = status.count(u8::equivalent_datatype());
        Ok(count as usize)
    }
}
