//! Partition-probability affinity traffic generator.
//!
//! Nodes are grouped into equal contiguous partitions, one per probability
//! entry. Each iteration samples a source and a destination partition from
//! the probability masses, then a uniform node inside each. Transfers have
//! a fixed size and are recorded symmetrically in the matrix.
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::KbProgress;
use crate::matrix::CommMatrix;
use crate::trace::{Trace, TraceEvent, TraceHeader};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct PartitionParams {
    /// Number of nodes traffic is generated for.
    pub procs: usize,
    /// One traffic-affinity mass per partition, each in `[0, 1]`.
    pub probabilities: Vec<f64>,
    /// Fixed single-transfer size in bytes.
    pub avg_send_size: u64,
    /// Post-operation sleep in milliseconds, recorded in the header.
    pub avg_sleep: u64,
    /// Target total volume in kilobytes.
    pub target_kb: u64,
}

impl PartitionParams {
    /// Probability entries with out-of-range values dropped (with a
    /// warning, not an error).
    pub fn kept_probabilities(&self) -> Vec<f64> {
        self.probabilities
            .iter()
            .copied()
            .filter(|&p| {
                let ok = (0.0..=1.0).contains(&p);
                if !ok {
                    warn!("dropping out-of-range partition probability {}", p);
                }
                ok
            })
            .collect()
    }

    /// Validate the bundle and return the kept probability masses.
    ///
    /// The sum check is an exact floating-point comparison: masses that
    /// only sum to 1.0 approximately are rejected.
    pub fn validate(&self) -> Result<Vec<f64>> {
        if self.procs < 2 {
            return Err(Error::Config(format!(
                "need at least 2 processes to form a transfer pair, got {}",
                self.procs
            )));
        }
        if self.avg_send_size == 0 {
            return Err(Error::Config("average send size must be positive".to_string()));
        }
        let kept = self.kept_probabilities();
        if kept.is_empty() {
            return Err(Error::Config("no usable partition probabilities".to_string()));
        }
        if kept.iter().sum::<f64>() != 1.0 {
            return Err(Error::Config(format!(
                "partition probabilities must sum to exactly 1.0, got {}",
                kept.iter().sum::<f64>()
            )));
        }
        if self.procs / kept.len() == 0 {
            return Err(Error::Config(format!(
                "{} processes cannot populate {} partitions",
                self.procs,
                kept.len()
            )));
        }
        Ok(kept)
    }
}

/// First partition whose cumulative mass reaches `r`; ties go to the
/// first qualifying partition. Falls back to the last partition when
/// rounding keeps the cumulative sum short of `r`.
fn pick_partition(r: f64, masses: &[f64]) -> usize {
    let mut cumulative = 0.0;
    for (i, &mass) in masses.iter().enumerate() {
        cumulative += mass;
        if cumulative >= r {
            return i;
        }
    }
    masses.len() - 1
}

/// Generate a trace until the accumulated volume reaches the target.
///
/// Node global index is `partition * partitionSize + localIndex`; with a
/// remainder after the integer division, the tail nodes are never
/// addressed.
pub fn generate(params: &PartitionParams, seed: u64) -> Result<(Trace, CommMatrix)> {
    let masses = params.validate()?;

    let partition_size = params.procs / masses.len();
    let size = params.avg_send_size;
    let target = params.target_kb * 1024;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut matrix = CommMatrix::new(params.procs);
    let mut events = Vec::new();
    let mut transferred: u64 = 0;
    let mut progress = KbProgress::new(params.target_kb);

    while transferred < target {
        let from_part = pick_partition(rng.gen(), &masses);
        let to_part = pick_partition(rng.gen(), &masses);
        let from = from_part * partition_size + rng.gen_range(0..partition_size);
        let to = to_part * partition_size + rng.gen_range(0..partition_size);
        if from == to {
            continue;
        }

        // Symmetric in the matrix, forward direction only in the trace.
        matrix.add(from, to, size);
        matrix.add(to, from, size);
        events.push(TraceEvent { from, to, size });
        transferred += size;
        progress.update(transferred);
    }

    let header = TraceHeader {
        procs_num: params.procs,
        transfer_buf: size,
        sleep: params.avg_sleep,
        sleep_disp: None,
        comments: vec![format!("transfered: {}", transferred)],
    };
    Ok((Trace { header, events }, matrix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(procs: usize, probabilities: Vec<f64>) -> PartitionParams {
        PartitionParams {
            procs,
            probabilities,
            avg_send_size: 256,
            avg_sleep: 0,
            target_kb: 2,
        }
    }

    #[test]
    fn cumulative_rule_takes_first_qualifying_partition() {
        let masses = [0.25, 0.25, 0.5];
        assert_eq!(pick_partition(0.0, &masses), 0);
        assert_eq!(pick_partition(0.25, &masses), 0);
        assert_eq!(pick_partition(0.26, &masses), 1);
        assert_eq!(pick_partition(0.5, &masses), 1);
        assert_eq!(pick_partition(0.99, &masses), 2);
        // Rounding slack lands on the last partition.
        assert_eq!(pick_partition(1.5, &masses), 2);
    }

    #[test]
    fn out_of_range_probabilities_are_dropped() {
        let p = params(10, vec![0.5, 1.5, 0.5, -0.25]);
        assert_eq!(p.kept_probabilities(), vec![0.5, 0.5]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn sum_check_is_exact() {
        let p = params(10, vec![0.5, 0.49]);
        assert!(matches!(p.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn more_partitions_than_processes_is_rejected() {
        let p = params(2, vec![0.25; 4]);
        assert!(matches!(p.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn generated_indices_stay_inside_partition_span() {
        // Two partitions of five nodes each: every index in [0, 9].
        let p = params(10, vec![0.5, 0.5]);
        let (trace, _) = generate(&p, 9).unwrap();
        assert!(!trace.events.is_empty());
        for ev in &trace.events {
            assert!(ev.from < 10);
            assert!(ev.to < 10);
            assert_ne!(ev.from, ev.to);
            assert_eq!(ev.size, 256);
        }
    }

    #[test]
    fn remainder_nodes_receive_no_traffic() {
        // 11 / 2 partitions leaves node 10 unaddressed.
        let p = params(11, vec![0.5, 0.5]);
        let (trace, matrix) = generate(&p, 5).unwrap();
        for ev in &trace.events {
            assert!(ev.from < 10);
            assert!(ev.to < 10);
        }
        for q in 0..matrix.size() {
            assert_eq!(matrix.get(10, q), 0);
            assert_eq!(matrix.get(q, 10), 0);
        }
    }

    #[test]
    fn matrix_is_symmetric() {
        let p = params(8, vec![0.25, 0.75]);
        let (_, matrix) = generate(&p, 21).unwrap();
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn header_carries_fixed_transfer_size_and_no_dispersion() {
        let mut p = params(6, vec![1.0]);
        p.avg_sleep = 3;
        let (trace, _) = generate(&p, 13).unwrap();
        assert_eq!(trace.header.procs_num, 6);
        assert_eq!(trace.header.transfer_buf, 256);
        assert_eq!(trace.header.sleep, 3);
        assert_eq!(trace.header.sleep_disp, None);
    }

    #[test]
    fn same_seed_reproduces_the_trace() {
        let p = params(12, vec![0.25, 0.25, 0.5]);
        let (a, ma) = generate(&p, 77).unwrap();
        let (b, mb) = generate(&p, 77).unwrap();
        assert_eq!(a, b);
        assert_eq!(ma, mb);
    }
}
