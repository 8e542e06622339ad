//! Replay: serialize/deserialize tracking runs for offline analysis.

use csrt_core::{BoundingBox, FrameOutput, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded tracking run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequenceLog {
    pub scene_name: String,
    pub seed: u64,
    pub config: TrackerConfig,
    /// Box the tracker was initialised with
    pub initial_bbox: BoundingBox,
    /// Per-frame results, in order, starting with the first update
    pub frames: Vec<FrameRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: u64,
    pub truth: BoundingBox,
    pub output: FrameOutput,
}

/// Save a sequence log to a JSON file.
pub fn save_log(log: &SequenceLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a sequence log from a JSON file.
pub fn load_log(path: &Path) -> anyhow::Result<SequenceLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: SequenceLog = serde_json::from_reader(reader)?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use csrt_core::TrackState;

    #[test]
    fn log_survives_a_file_round_trip() {
        let output = FrameOutput {
            bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            state: TrackState::DriftSuspected,
            statistic: 12.5,
            baseline: 30.0,
            ratio: 0.4,
            detector_engaged: true,
            detector_override: false,
            detector_statistic: Some(41.0),
            mask_fallback: false,
            elapsed_us: 950,
        };
        let log = SequenceLog {
            scene_name: "linear".into(),
            seed: 3,
            config: TrackerConfig::default(),
            initial_bbox: BoundingBox::new(0.0, 0.0, 3.0, 4.0),
            frames: vec![FrameRecord {
                index: 1,
                truth: BoundingBox::new(1.5, 2.0, 3.0, 4.0),
                output,
            }],
        };
        let path = std::env::temp_dir().join(format!("csrt_sequence_log_{}.json", std::process::id()));
        save_log(&log, &path).unwrap();
        let back = load_log(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.scene_name, "linear");
        assert_eq!(back.config, log.config);
        assert_eq!(back.frames.len(), 1);
        assert_eq!(back.frames[0].output.state, TrackState::DriftSuspected);
        assert!(back.frames[0].output.detector_engaged);
        assert_eq!(back.frames[0].output.detector_statistic, Some(41.0));
    }
}
