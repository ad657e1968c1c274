use crate::signal::error::Result;
/// Something that can report one timestamp (milliseconds) per recorded
/// video or eye-camera frame.
pub trait FrameTimestamps {
    fn timestamps_ms(&self) -> Result<Vec<f64>>;
}
/// In-memory timestamps, useful for tests and for stores decoded elsewhere.
pub struct ManualTimestamps {
    timestamps_ms: Vec<f64>,
}
impl ManualTimestamps {
    pub fn new(timestamps_ms: impl IntoIterator<Item = f64>) -> Self {
        Self {
            timestamps_ms: timestamps_ms.into_iter().collect(),
        }
    }
}
impl FrameTimestamps for ManualTimestamps {
    fn timestamps_ms(&self) -> Result<Vec<f64>> {
        Ok(self.timestamps_ms.clone())
    }
}
/// For every imaging frame onset (seconds), the video frame closest in time.
///
/// Video timestamps are rebased to their first frame and shifted by
/// `start_offset_s`, the time at which video acquisition started relative to
/// the aux recording.
pub fn video_frame_index(
    imaging_onsets_s: &[f64],
    video_timestamps_ms: &[f64],
    start_offset_s: f64,
) -> Vec<usize> {
    let Some(&first) = video_timestamps_ms.first() else {
        return Vec::new();
    };
    let video_s: Vec<f64> = video_timestamps_ms
        .iter()
        .map(|&t| (t - first) / 1000.0 + start_offset_s)
        .collect();
    imaging_onsets_s
        .iter()
        .map(|&onset| {
            let mut best = 0;
            for (i, &t) in video_s.iter().enumerate() {
                if (t - onset).abs() < (video_s[best] - onset).abs() {
                    best = i;
                }
            }
            best
        })
        .collect()
}
