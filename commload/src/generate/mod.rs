//! Traffic generators producing a trace plus its accumulated comm matrix.
//!
//! Two mutually exclusive models: a degree-constrained random graph
//! ([`degree`]) and a partition-probability affinity model ([`partition`]).
//! Both are driven by an explicit seed so a run can be reproduced exactly.
use log::info;

pub mod degree;
pub mod partition;

pub use degree::DegreeParams;
pub use partition::PartitionParams;

/// Progress reporting shared by both generators: one line every time the
/// cumulative kilobyte count crosses a new integer boundary.
struct KbProgress {
    target_kb: u64,
    last_kb: u64,
}

impl KbProgress {
    fn new(target_kb: u64) -> KbProgress {
        KbProgress { target_kb, last_kb: 0 }
    }

    fn update(&mut self, transferred: u64) {
        let kb = transferred / 1024;
        if kb > self.last_kb {
            info!("{}/{}", kb, self.target_kb);
            self.last_kb = kb;
        }
    }
}
