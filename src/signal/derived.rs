use crate::settings::Calibration;
use crate::signal::edges::{detect_by, detect_edges, Direction};
use crate::signal::events::nearest_frame;
use crate::signal::filter::{bin_average, window_average, BoxFilter};
use crate::signal::frames::FrameClockResult;
/// Imaging frames recorded with the shutter closed, plus the first frame
/// considered real data. Both bounds are `None` when the session has no
/// darkframes, in which case `data_onset_frame` is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DarkframeWindow {
    pub onset_frame: Option<usize>,
    pub offset_frame: Option<usize>,
    pub data_onset_frame: usize,
}
/// Shutter open and close times in seconds since the start of the recording.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShutterWindow {
    pub open_s: Option<f64>,
    pub close_s: Option<f64>,
}
/// Locates the dark period in an already cleaned channel: the span where the
/// cleaned value sits at `dark_level` (within half a quantization step).
pub fn darkframe_window(
    cleaned: &[f64],
    dark_level: f64,
    resolution: f64,
    clock: &FrameClockResult,
    calibration: &Calibration,
) -> DarkframeWindow {
    let tolerance = resolution.abs() / 2.0;
    let onset = detect_by(at_level(cleaned, dark_level, tolerance), Direction::Rising)
        .single("darkframe onset");
    let offset = detect_by(at_level(cleaned, dark_level, tolerance), Direction::Falling)
        .single("darkframe offset");
    let (Some(onset), Some(offset)) = (onset, offset) else {
        log::debug!("no darkframe period found");
        return DarkframeWindow::default();
    };
    let frames = &clock.frame_onsets;
    let (Some(onset_frame), Some(offset_frame)) =
        (nearest_frame(onset, frames), nearest_frame(offset, frames))
    else {
        log::warn!("darkframes found but the recording has no frame clock");
        return DarkframeWindow::default();
    };
    let imaging_sf = clock.imaging_sampling_frequency();
    let data_onset_frame =
        (offset_frame as f64 + imaging_sf).ceil() as usize + calibration.data_onset_pad_frames;
    DarkframeWindow {
        onset_frame: Some(onset_frame + calibration.frame_margin),
        offset_frame: Some(offset_frame.saturating_sub(calibration.frame_margin)),
        data_onset_frame,
    }
}
fn at_level(channel: &[f64], level: f64, tolerance: f64) -> impl Iterator<Item = bool> + '_ {
    channel.iter().map(move |&v| (v - level).abs() < tolerance)
}
pub fn shutter_window<'a, I>(channel: I, threshold: f64, sampling_frequency: f64) -> ShutterWindow
where
    I: IntoIterator<Item = &'a f64> + Clone,
{
    let open = detect_edges(channel.clone(), threshold, Direction::Rising).single("shutter open");
    let close = detect_edges(channel, threshold, Direction::Falling).single("shutter close");
    ShutterWindow {
        open_s: open.map(|s| s as f64 / sampling_frequency),
        close_s: close.map(|s| s as f64 / sampling_frequency),
    }
}
/// Undoes the wraparound of a bounded position sensor: every jump larger than
/// `wrap_threshold` is cancelled by an offset carried into all later samples.
pub fn unwrap_position<'a, I>(raw: I, wrap_threshold: f64) -> Vec<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut raw = raw.into_iter().copied();
    let Some(first) = raw.next() else {
        return Vec::new();
    };
    let mut unwrapped = vec![first];
    let mut previous = first;
    let mut offset = 0.0;
    for value in raw {
        if (value - previous).abs() > wrap_threshold {
            offset += previous - value;
        }
        unwrapped.push(value + offset);
        previous = value;
    }
    unwrapped
}
/// Per-sample velocity: first difference (zero at sample 0), box-smoothed
/// over `smoothing_window_s`, scaled to units per second.
pub fn smoothed_velocity(
    position: &[f64],
    sampling_frequency: f64,
    calibration: &Calibration,
) -> Vec<f64> {
    let mut diff = Vec::with_capacity(position.len());
    if !position.is_empty() {
        diff.push(0.0);
    }
    diff.extend(position.windows(2).map(|w| w[1] - w[0]));
    BoxFilter::from_duration(calibration.smoothing_window_s, sampling_frequency)
        .apply(&diff)
        .into_iter()
        .map(|v| v * sampling_frequency)
        .collect()
}
/// Running speed in fixed time bins, for recordings without imaging.
pub fn speed_per_bin(
    velocity: &[f64],
    sampling_frequency: f64,
    calibration: &Calibration,
) -> Vec<f64> {
    let bin = (calibration.speed_bin_s * sampling_frequency).round() as usize;
    bin_average(velocity, bin)
}
/// Running speed averaged over the gap that follows each frame onset.
pub fn speed_per_frame(velocity: &[f64], clock: &FrameClockResult) -> Vec<f64> {
    window_average(velocity, &clock.frame_onsets, clock.mean_gap_samples())
}
