//! Workload harness: YAML workload descriptions and CLI argument types
//! for the `generate` and `replay` binaries.
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use commload::generate::{DegreeParams, PartitionParams};
use commload::{Error, Result};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct GenerateArgs {
    /// Path to the YAML workload description
    pub config: PathBuf,
    /// Overrides the seed from the workload description
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct ReplayArgs {
    /// Path to the trace file to replay
    pub trace: PathBuf,
    /// Rank 0 logs a progress line every this many trace events
    #[arg(long, default_value_t = 500)]
    pub progress_interval: usize,
}

/// Which traffic model a workload description selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Degree,
    Partition,
}

/// Deserialized workload description. Field names follow the option
/// names the tool has always used.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    pub model: Model,
    #[serde(rename = "processors-number")]
    pub processors_number: usize,
    #[serde(rename = "avrg-send-size")]
    pub avrg_send_size: u64,
    #[serde(rename = "avrg-send-size-dispersion", default)]
    pub avrg_send_size_dispersion: u64,
    #[serde(rename = "avrg-sleep-time", default)]
    pub avrg_sleep_time: u64,
    #[serde(rename = "avrg-sleep-time-dispersion", default)]
    pub avrg_sleep_time_dispersion: u64,
    #[serde(rename = "total-transfered-data-kb", default)]
    pub total_transfered_data_kb: u64,
    #[serde(rename = "neighbors-number", default)]
    pub neighbors_number: usize,
    #[serde(default)]
    pub probabilities: Option<Vec<f64>>,
    #[serde(rename = "out-file")]
    pub out_file: PathBuf,
    #[serde(rename = "comm-mtx-file", default)]
    pub comm_mtx_file: Option<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WorkloadConfig {
    /// Cross-field checks the parameter bundles cannot do themselves.
    pub fn validate(&self) -> Result<()> {
        if self.out_file.as_os_str().is_empty() {
            return Err(Error::Config("output trace path is empty".to_string()));
        }
        if self.model == Model::Partition && self.probabilities.is_none() {
            return Err(Error::Config(
                "partition model requires a probabilities list".to_string(),
            ));
        }
        if self.model == Model::Degree && self.probabilities.is_some() {
            return Err(Error::Config(
                "degree model takes no probabilities list; did you mean model: partition?"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn degree_params(&self) -> DegreeParams {
        DegreeParams {
            procs: self.processors_number,
            avg_send_size: self.avrg_send_size,
            send_size_disp: self.avrg_send_size_dispersion,
            avg_sleep: self.avrg_sleep_time,
            sleep_disp: self.avrg_sleep_time_dispersion,
            target_kb: self.total_transfered_data_kb,
            max_neighbors: self.neighbors_number,
        }
    }

    pub fn partition_params(&self) -> Result<PartitionParams> {
        let probabilities = self
            .probabilities
            .clone()
            .ok_or_else(|| Error::Config("partition model requires a probabilities list".to_string()))?;
        Ok(PartitionParams {
            procs: self.processors_number,
            probabilities,
            avg_send_size: self.avrg_send_size,
            avg_sleep: self.avrg_sleep_time,
            target_kb: self.total_transfered_data_kb,
        })
    }
}

/// Load a YAML description from a file.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_yaml::from_reader(file)
        .map_err(|err| Error::Config(format!("cannot parse workload description: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEGREE_YAML: &str = "\
model: degree
processors-number: 16
avrg-send-size: 1024
avrg-send-size-dispersion: 256
avrg-sleep-time: 10
avrg-sleep-time-dispersion: 2
total-transfered-data-kb: 64
neighbors-number: 4
out-file: trace.txt
comm-mtx-file: mtx.txt
seed: 7
";

    const PARTITION_YAML: &str = "\
model: partition
processors-number: 10
avrg-send-size: 512
avrg-sleep-time: 0
total-transfered-data-kb: 16
probabilities: [0.5, 0.5]
out-file: trace.txt
";

    #[test]
    fn degree_description_parses_and_maps() {
        let config: WorkloadConfig = serde_yaml::from_str(DEGREE_YAML).unwrap();
        config.validate().unwrap();
        assert_eq!(config.model, Model::Degree);
        assert_eq!(config.seed, Some(7));
        let params = config.degree_params();
        assert_eq!(params.procs, 16);
        assert_eq!(params.avg_send_size, 1024);
        assert_eq!(params.send_size_disp, 256);
        assert_eq!(params.sleep_disp, 2);
        assert_eq!(params.target_kb, 64);
        assert_eq!(params.max_neighbors, 4);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn partition_description_parses_and_maps() {
        let config: WorkloadConfig = serde_yaml::from_str(PARTITION_YAML).unwrap();
        config.validate().unwrap();
        let params = config.partition_params().unwrap();
        assert_eq!(params.procs, 10);
        assert_eq!(params.probabilities, vec![0.5, 0.5]);
        assert!(params.validate().is_ok());
        assert!(config.comm_mtx_file.is_none());
    }

    #[test]
    fn partition_model_without_probabilities_is_rejected() {
        let yaml = PARTITION_YAML.replace("probabilities: [0.5, 0.5]\n", "");
        let config: WorkloadConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn degree_model_with_probabilities_is_rejected() {
        let yaml = format!("{}probabilities: [0.5, 0.5]\n", DEGREE_YAML);
        let config: WorkloadConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_out_file_is_rejected() {
        let yaml = DEGREE_YAML.replace("out-file: trace.txt", "out-file: \"\"");
        let config: WorkloadConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.yaml");
        std::fs::write(&path, DEGREE_YAML).unwrap();
        let config: WorkloadConfig = load_config(&path).unwrap();
        assert_eq!(config.processors_number, 16);
    }
}
