use crate::settings::Calibration;
use crate::signal::edges::{detect_edges, Direction, EdgeSet};
use crate::signal::error::{AuxError, Result};
/// How the imaging system drives the frame trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerKind {
    /// one pulse per frame
    Pulsed,
    /// level toggles once per frame (fUSI)
    Toggling,
}
/// Selects one piezo level of a fast z-stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneSelection {
    index: usize,
    count: usize,
}
impl PlaneSelection {
    pub fn single() -> Self {
        Self { index: 0, count: 1 }
    }
    pub fn new(index: usize, count: usize) -> Result<Self> {
        if count == 0 || index >= count {
            return Err(AuxError::InvalidPlane { index, count });
        }
        Ok(Self { index, count })
    }
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn count(&self) -> usize {
        self.count
    }
}
impl Default for PlaneSelection {
    fn default() -> Self {
        Self::single()
    }
}
/// Imaging frame onsets (sample indices) and the dominant inter-frame interval.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameClockResult {
    pub frame_onsets: Vec<usize>,
    /// seconds; zero when fewer than two onsets were found
    pub inter_frame_interval: f64,
}
impl FrameClockResult {
    pub fn is_degenerate(&self) -> bool {
        self.frame_onsets.len() < 2 || self.inter_frame_interval <= 0.0
    }
    pub fn imaging_sampling_frequency(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            1.0 / self.inter_frame_interval
        }
    }
    /// floor of the mean onset-to-onset spacing, in samples
    pub fn mean_gap_samples(&self) -> usize {
        mean_gap(&self.frame_onsets).map_or(0, |g| g.floor() as usize)
    }
}
pub struct FrameClock<'c> {
    pub threshold: f64,
    pub trigger: TriggerKind,
    pub plane: PlaneSelection,
    pub sampling_frequency: f64,
    pub calibration: &'c Calibration,
}
impl FrameClock<'_> {
    pub fn compute<'a, I>(&self, channel: I) -> FrameClockResult
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let edges = match self.trigger {
            TriggerKind::Pulsed => detect_edges(channel, self.threshold, Direction::Rising),
            TriggerKind::Toggling => {
                let edges = detect_edges(channel, self.threshold, Direction::Either);
                trim_boundary_edges(drop_spurious_edges(edges, self.calibration))
            }
        };
        let frame_onsets: Vec<usize> = edges
            .into_vec()
            .into_iter()
            .skip(self.plane.index())
            .step_by(self.plane.count())
            .collect();
        let inter_frame_interval = match mean_gap(&frame_onsets) {
            Some(gap) => gap.round() / self.sampling_frequency,
            None => {
                log::warn!(
                    "only {} imaging frame onsets found, frame clock is degenerate",
                    frame_onsets.len()
                );
                0.0
            }
        };
        log::debug!(
            "frame clock: {} onsets (plane {}/{}), ifi={:.5}s",
            frame_onsets.len(),
            self.plane.index(),
            self.plane.count(),
            inter_frame_interval
        );
        FrameClockResult {
            frame_onsets,
            inter_frame_interval,
        }
    }
}
fn mean_gap(onsets: &[usize]) -> Option<f64> {
    if onsets.len() < 2 {
        return None;
    }
    Some((onsets[onsets.len() - 1] - onsets[0]) as f64 / (onsets.len() - 1) as f64)
}
/// Drops startup triggers of a toggling clock: within the first
/// `spurious_scan_intervals` gaps, every edge whose gap to its successor is
/// below `spurious_gap_fraction` of the trimmed mean gap is removed.
pub fn drop_spurious_edges(edges: EdgeSet, calibration: &Calibration) -> EdgeSet {
    let edges = edges.into_vec();
    if edges.len() < 2 {
        return EdgeSet::from_sorted(edges);
    }
    let gaps: Vec<f64> = edges.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let trim = calibration.trim_intervals;
    let reference = if gaps.len() > 2 * trim {
        &gaps[trim..gaps.len() - trim]
    } else {
        &gaps[..]
    };
    let mean = reference.iter().sum::<f64>() / reference.len() as f64;
    let limit = calibration.spurious_gap_fraction * mean;
    let scan = calibration.spurious_scan_intervals.min(gaps.len());
    let kept: Vec<usize> = edges
        .iter()
        .enumerate()
        .filter(|&(i, _)| i >= scan || gaps[i] >= limit)
        .map(|(_, &edge)| edge)
        .collect();
    let dropped = edges.len() - kept.len();
    if dropped > 0 {
        log::debug!("dropped {dropped} spurious startup triggers (gap < {limit:.1} samples)");
    }
    EdgeSet::from_sorted(kept)
}
/// The first and last toggles of a fUSI acquisition are not frames.
pub fn trim_boundary_edges(edges: EdgeSet) -> EdgeSet {
    let mut edges = edges.into_vec();
    if edges.len() < 2 {
        return EdgeSet::default();
    }
    edges.pop();
    edges.remove(0);
    EdgeSet::from_sorted(edges)
}
