//! Channel and event configuration for an aux rig.
//!
//! Settings are plain serde structures, normally read from a JSON file next to
//! the recordings. Every empirical constant used by the processing stages
//! lives in [`Calibration`] so it can be tuned per rig.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use crate::signal::cleaner::LevelMap;
use crate::signal::edges::Direction;
use crate::signal::error::{AuxError, Result};
/// Event name that drives the imaging frame clock.
pub const FRAME_EVENT: &str = "frame";
/// Event names used by the derived signals.
pub const DARKFRAME_EVENT: &str = "darkframe";
pub const SHUTTER_EVENT: &str = "shutter";
pub const POSITION_CHANNEL: &str = "position";
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// column in the sample matrix
    pub index: usize,
    pub range: (f64, f64),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recode: Option<Vec<u32>>,
}
impl ChannelSpec {
    pub fn new(index: usize, range: (f64, f64)) -> Self {
        Self {
            index,
            range,
            levels: None,
            recode: None,
        }
    }
    pub fn with_levels(mut self, levels: u32) -> Self {
        self.levels = Some(levels);
        self
    }
    pub fn with_recode(mut self, recode: Vec<u32>) -> Self {
        self.recode = Some(recode);
        self
    }
    /// The ordinal transform for this channel, if it is quantized.
    pub fn level_map(&self, name: &str) -> Result<Option<LevelMap>> {
        match self.levels {
            Some(levels) => LevelMap::new(name, self.range, levels, self.recode.clone()).map(Some),
            None => Ok(None),
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CleanSpec {
    pub resolution: f64,
    /// level marking the event in the cleaned channel; without it the
    /// cleaned channel is thresholded like the raw one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}
/// How a semantic event is extracted from its source channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub channel: String,
    pub threshold: f64,
    #[serde(default)]
    pub edge: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanSpec>,
}
impl EventSpec {
    pub fn rising(channel: &str, threshold: f64) -> Self {
        Self {
            channel: channel.to_string(),
            threshold,
            edge: Direction::Rising,
            clean: None,
        }
    }
    pub fn falling(channel: &str, threshold: f64) -> Self {
        Self {
            edge: Direction::Falling,
            ..Self::rising(channel, threshold)
        }
    }
    pub fn cleaned(mut self, resolution: f64, target: Option<f64>) -> Self {
        self.clean = Some(CleanSpec { resolution, target });
        self
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    TwoPhoton,
    /// functional ultrasound: toggling frame trigger
    Fusi,
    /// no imaging; events are reported as elapsed time
    BehaviorOnly,
}
impl Default for Acquisition {
    fn default() -> Self {
        Acquisition::TwoPhoton
    }
}
/// Empirical device constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// fUSI: a startup gap shorter than this fraction of the mean gap is spurious
    pub spurious_gap_fraction: f64,
    /// fUSI: number of leading gaps inspected for spurious triggers
    pub spurious_scan_intervals: usize,
    /// fUSI: gaps excluded at each end when computing the reference mean
    pub trim_intervals: usize,
    /// frames shaved off each side of the darkframe window
    pub frame_margin: usize,
    /// frames added after the one-second buffer that follows the darkframes
    pub data_onset_pad_frames: usize,
    /// ball position jumps larger than this are sensor wraps
    pub wrap_threshold: f64,
    /// running speed box filter width, seconds
    pub smoothing_window_s: f64,
    /// running speed bin width without imaging, seconds
    pub speed_bin_s: f64,
    /// behavior-only timestamps are `timestamp_scale * sample / sf`
    pub timestamp_scale: f64,
}
impl Default for Calibration {
    fn default() -> Self {
        Self {
            spurious_gap_fraction: 0.7,
            spurious_scan_intervals: 100,
            trim_intervals: 20,
            frame_margin: 1,
            data_onset_pad_frames: 1,
            wrap_threshold: 2.0,
            smoothing_window_s: 0.1,
            speed_bin_s: 0.1,
            timestamp_scale: 100.0,
        }
    }
}
pub type ChannelMap = BTreeMap<String, ChannelSpec>;
pub type EventMap = BTreeMap<String, EventSpec>;
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuxSettings {
    pub channels: ChannelMap,
    #[serde(default)]
    pub events: EventMap,
    #[serde(default)]
    pub acquisition: Acquisition,
    #[serde(default = "one")]
    pub plane_count: usize,
    #[serde(default)]
    pub calibration: Calibration,
}
fn one() -> usize {
    1
}
impl Default for AuxSettings {
    fn default() -> Self {
        Self {
            channels: ChannelMap::new(),
            events: EventMap::new(),
            acquisition: Acquisition::default(),
            plane_count: one(),
            calibration: Calibration::default(),
        }
    }
}
impl AuxSettings {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening aux settings {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing aux settings {}", path.display()))
    }
    pub fn channel(&self, name: &str) -> Result<&ChannelSpec> {
        self.channels
            .get(name)
            .ok_or_else(|| AuxError::UnknownChannel(name.to_string()))
    }
    pub fn event(&self, name: &str) -> Result<&EventSpec> {
        self.events
            .get(name)
            .ok_or_else(|| AuxError::UnknownEvent(name.to_string()))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    const RIG: &str = r#"{
        "channels": {
            "shutter":   {"index": 0,  "range": [0, 5], "levels": 2},
            "frame":     {"index": 3,  "range": [0, 5]},
            "task":      {"index": 7,  "range": [0, 5], "levels": 10},
            "stimulus":  {"index": 8,  "range": [0, 5]},
            "leftlick":  {"index": 11, "range": [0, 5], "levels": 2, "recode": [1, 0]},
            "position":  {"index": 14, "range": [0, 5]}
        },
        "events": {
            "frame":           {"channel": "frame", "threshold": 2.5},
            "shutter":         {"channel": "shutter", "threshold": 2.5},
            "stimulus_onsets": {"channel": "stimulus", "threshold": 2.5},
            "darkframe":       {"channel": "task", "threshold": 0.4,
                                "clean": {"resolution": 0.5, "target": 1.0}},
            "lick_offsets":    {"channel": "leftlick", "threshold": 2.5, "edge": "falling"}
        },
        "plane_count": 2,
        "calibration": {"wrap_threshold": 2.5}
    }"#;
    #[test]
    fn parses_rig_settings() {
        let settings = AuxSettings::from_json_str(RIG).unwrap();
        assert_eq!(settings.channel("frame").unwrap().index, 3);
        assert_eq!(settings.channel("leftlick").unwrap().recode, Some(vec![1, 0]));
        assert_eq!(settings.event("lick_offsets").unwrap().edge, Direction::Falling);
        assert_eq!(settings.event("frame").unwrap().edge, Direction::Rising);
        assert_eq!(
            settings.event("darkframe").unwrap().clean,
            Some(CleanSpec {
                resolution: 0.5,
                target: Some(1.0)
            })
        );
        assert_eq!(settings.acquisition, Acquisition::TwoPhoton);
        assert_eq!(settings.plane_count, 2);
        assert_eq!(settings.calibration.wrap_threshold, 2.5);
        assert_eq!(settings.calibration.spurious_gap_fraction, 0.7);
    }
    #[test]
    fn missing_names_are_errors() {
        let settings = AuxSettings::from_json_str(RIG).unwrap();
        assert!(matches!(settings.channel("eye"), Err(AuxError::UnknownChannel(_))));
        assert!(matches!(settings.event("reward"), Err(AuxError::UnknownEvent(_))));
    }
    #[test]
    fn level_map_follows_channel_spec() {
        let settings = AuxSettings::from_json_str(RIG).unwrap();
        let lick = settings.channel("leftlick").unwrap().level_map("leftlick").unwrap();
        assert_eq!(lick.unwrap().apply(5.0), 0.0);
        assert!(settings.channel("frame").unwrap().level_map("frame").unwrap().is_none());
    }
    #[test]
    fn load_reports_the_path() {
        let err = AuxSettings::load("/nonexistent/rig.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/rig.json"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.json");
        std::fs::write(&path, RIG).unwrap();
        assert_eq!(AuxSettings::load(&path).unwrap().plane_count, 2);
    }
}
