use std::fmt;
use std::path::{Path, PathBuf};
use ndarray::ArrayView1;
use once_cell::unsync::OnceCell;
use crate::settings::{
    Acquisition, AuxSettings, EventSpec, DARKFRAME_EVENT, FRAME_EVENT, POSITION_CHANNEL,
    SHUTTER_EVENT,
};
use crate::signal::cleaner::clean_with_recovery;
use crate::signal::derived::{self, DarkframeWindow, ShutterWindow};
use crate::signal::edges::{detect_by, detect_edges, EdgeSet};
use crate::signal::error::{AuxError, Result};
use crate::signal::events::{composite_offsets, map_events, EventTimes, MapMode};
use crate::signal::frames::{FrameClock, FrameClockResult, PlaneSelection, TriggerKind};
use crate::signal::store::{find_recording, ChannelStore};
use crate::signal::sync::{video_frame_index, FrameTimestamps};
const DEFAULT_PATTERN: &str = "*.lvd";
/// One loaded aux recording and everything derived from it.
///
/// Quantities that depend on the active imaging plane (frame clock, events,
/// darkframes, per-frame speed) are recomputed on every call; the rest is
/// computed once and cached.
pub struct AuxRecording {
    path: PathBuf,
    store: ChannelStore,
    settings: AuxSettings,
    plane: PlaneSelection,
    shutter: OnceCell<ShutterWindow>,
    position: OnceCell<Vec<f64>>,
    velocity: OnceCell<Vec<f64>>,
}
impl AuxRecording {
    /// Loads the recording in `dir` matching `filename` (shell-style `*`, `?`
    /// and `[...]`, default `*.lvd`).
    pub fn open(
        dir: impl AsRef<Path>,
        filename: Option<&str>,
        settings: AuxSettings,
    ) -> Result<Self> {
        let path = find_recording(dir, filename.unwrap_or(DEFAULT_PATTERN))?;
        let store = ChannelStore::open(&path)?;
        Self::from_store(path, store, settings)
    }
    pub fn from_store(path: PathBuf, store: ChannelStore, settings: AuxSettings) -> Result<Self> {
        let plane = PlaneSelection::new(0, settings.plane_count)?;
        let channel_count = store.header().channel_count;
        for spec in settings.channels.values() {
            if spec.index >= channel_count {
                return Err(AuxError::ChannelOutOfRange {
                    index: spec.index,
                    channel_count,
                });
            }
        }
        let recording = Self {
            path,
            store,
            settings,
            plane,
            shutter: OnceCell::new(),
            position: OnceCell::new(),
            velocity: OnceCell::new(),
        };
        let clock = recording.frame_clock()?;
        log::info!("{recording}");
        if recording.settings.acquisition != Acquisition::BehaviorOnly && clock.is_degenerate() {
            log::warn!("{}: imaging frame clock is degenerate", recording.file_name());
        }
        Ok(recording)
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
    pub fn store(&self) -> &ChannelStore {
        &self.store
    }
    pub fn settings(&self) -> &AuxSettings {
        &self.settings
    }
    pub fn sampling_frequency(&self) -> f64 {
        self.store.sampling_frequency()
    }
    pub fn raw_channel(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        self.store.channel(index)
    }
    /// Column of a configured channel; there is no positional fallback.
    pub fn channel(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let spec = self.settings.channel(name)?;
        self.store.channel(spec.index)
    }
    pub fn clean_channel(&self, name: &str, threshold: f64, resolution: f64) -> Result<Vec<f64>> {
        let raw = self.channel(name)?.to_vec();
        clean_with_recovery(&raw, threshold, resolution)
    }
    /// Channel recoded to ordinal levels; unquantized channels pass through.
    pub fn ordinal_channel(&self, name: &str) -> Result<Vec<f64>> {
        let raw = self.channel(name)?.to_vec();
        self.quantize(name, raw)
    }
    /// The event's source channel after its configured cleaning and the
    /// channel's ordinal recoding.
    pub fn processed_channel(&self, event: &str) -> Result<Vec<f64>> {
        let spec = self.settings.event(event)?;
        let values = self.event_source(spec)?;
        self.quantize(&spec.channel, values)
    }
    fn quantize(&self, name: &str, values: Vec<f64>) -> Result<Vec<f64>> {
        match self.settings.channel(name)?.level_map(name)? {
            Some(levels) => Ok(levels.apply_all(&values)),
            None => Ok(values),
        }
    }
    fn event_source(&self, spec: &EventSpec) -> Result<Vec<f64>> {
        let raw = self.channel(&spec.channel)?.to_vec();
        match spec.clean {
            Some(clean) => clean_with_recovery(&raw, spec.threshold, clean.resolution),
            None => Ok(raw),
        }
    }
    pub fn active_plane(&self) -> usize {
        self.plane.index()
    }
    pub fn plane_count(&self) -> usize {
        self.plane.count()
    }
    /// Switches the imaging plane that plane-dependent queries refer to.
    pub fn set_active_plane(&mut self, index: usize) -> Result<()> {
        self.plane = PlaneSelection::new(index, self.plane.count())?;
        Ok(())
    }
    /// Frame onsets of the active plane. Behavior-only sessions get an empty,
    /// degenerate clock.
    pub fn frame_clock(&self) -> Result<FrameClockResult> {
        let trigger = match self.settings.acquisition {
            Acquisition::BehaviorOnly => return Ok(FrameClockResult::default()),
            Acquisition::TwoPhoton => TriggerKind::Pulsed,
            Acquisition::Fusi => TriggerKind::Toggling,
        };
        let spec = self.settings.event(FRAME_EVENT)?;
        let channel = self.channel(&spec.channel)?;
        let clock = FrameClock {
            threshold: spec.threshold,
            trigger,
            plane: self.plane,
            sampling_frequency: self.sampling_frequency(),
            calibration: &self.settings.calibration,
        };
        Ok(clock.compute(channel))
    }
    pub fn imaging_frames(&self) -> Result<Vec<usize>> {
        Ok(self.frame_clock()?.frame_onsets)
    }
    /// Inter-frame interval in seconds (zero without imaging).
    pub fn imaging_ifi(&self) -> Result<f64> {
        Ok(self.frame_clock()?.inter_frame_interval)
    }
    pub fn imaging_sf(&self) -> Result<f64> {
        Ok(self.frame_clock()?.imaging_sampling_frequency())
    }
    /// Sample indices of a configured event.
    pub fn event_edges(&self, name: &str) -> Result<EdgeSet> {
        let spec = self.settings.event(name)?;
        let values = self.event_source(spec)?;
        let edges = match spec.clean.and_then(|c| c.target.map(|t| (t, c.resolution))) {
            Some((target, resolution)) => {
                let tolerance = resolution.abs() / 2.0;
                detect_by(values.iter().map(|&v| (v - target).abs() < tolerance), spec.edge)
            }
            None => detect_edges(&values, spec.threshold, spec.edge),
        };
        log::debug!("event `{name}`: {} edges", edges.len());
        Ok(edges)
    }
    /// A configured event as frame indices, or as scaled timestamps when the
    /// session has no imaging.
    pub fn event(&self, name: &str) -> Result<EventTimes> {
        let edges = self.event_edges(name)?;
        self.map_samples(edges.as_slice())
    }
    /// Window offsets closed early by a timeout, mapped like [`Self::event`].
    pub fn composite_event(&self, onset: &str, offset: &str, timeout: &str) -> Result<EventTimes> {
        let closed = composite_offsets(
            &self.event_edges(onset)?,
            &self.event_edges(offset)?,
            &self.event_edges(timeout)?,
            self.store.sample_count(),
        );
        self.map_samples(&closed)
    }
    fn map_samples(&self, samples: &[usize]) -> Result<EventTimes> {
        if self.settings.acquisition == Acquisition::BehaviorOnly {
            let mode = MapMode::Timestamp {
                sampling_frequency: self.sampling_frequency(),
                scale: self.settings.calibration.timestamp_scale,
            };
            return Ok(map_events(samples, &[], mode));
        }
        let clock = self.frame_clock()?;
        if clock.frame_onsets.is_empty() {
            return Err(AuxError::NoImagingClock);
        }
        Ok(map_events(samples, &clock.frame_onsets, MapMode::FrameIndex))
    }
    pub fn darkframes(&self) -> Result<DarkframeWindow> {
        if self.settings.acquisition == Acquisition::BehaviorOnly {
            return Ok(DarkframeWindow::default());
        }
        let spec = self.settings.event(DARKFRAME_EVENT)?;
        let values = self.event_source(spec)?;
        let (cleaned, level, resolution) =
            match spec.clean.and_then(|c| c.target.map(|t| (t, c.resolution))) {
                Some((target, resolution)) => (values, target, resolution),
                None => {
                    let mut binary: Vec<f64> = values
                        .iter()
                        .map(|&v| if v > spec.threshold { 1.0 } else { 0.0 })
                        .collect();
                    // dark from the first sample: force it low so the onset is detectable
                    if let Some(first) = binary.first_mut().filter(|v| **v > 0.0) {
                        log::warn!("darkframe channel starts dark, forcing the first sample low");
                        *first = 0.0;
                    }
                    (binary, 1.0, 1.0)
                }
            };
        let clock = self.frame_clock()?;
        Ok(derived::darkframe_window(
            &cleaned,
            level,
            resolution,
            &clock,
            &self.settings.calibration,
        ))
    }
    pub fn data_onset_frame(&self) -> Result<usize> {
        Ok(self.darkframes()?.data_onset_frame)
    }
    pub fn shutter(&self) -> Result<ShutterWindow> {
        self.shutter
            .get_or_try_init(|| -> Result<ShutterWindow> {
                let spec = self.settings.event(SHUTTER_EVENT)?;
                let channel = self.channel(&spec.channel)?;
                Ok(derived::shutter_window(
                    channel,
                    spec.threshold,
                    self.sampling_frequency(),
                ))
            })
            .copied()
    }
    /// Unwrapped ball position, one value per sample.
    pub fn position(&self) -> Result<&[f64]> {
        self.position
            .get_or_try_init(|| -> Result<Vec<f64>> {
                let raw = self.channel(POSITION_CHANNEL)?;
                Ok(derived::unwrap_position(
                    raw,
                    self.settings.calibration.wrap_threshold,
                ))
            })
            .map(Vec::as_slice)
    }
    fn velocity(&self) -> Result<&[f64]> {
        let position = self.position()?;
        let velocity = self.velocity.get_or_init(|| {
            derived::smoothed_velocity(
                position,
                self.sampling_frequency(),
                &self.settings.calibration,
            )
        });
        Ok(velocity)
    }
    /// Running speed per imaging frame, or per fixed time bin without imaging.
    pub fn running_speed(&self) -> Result<Vec<f64>> {
        let velocity = self.velocity()?;
        if self.settings.acquisition == Acquisition::BehaviorOnly {
            return Ok(derived::speed_per_bin(
                velocity,
                self.sampling_frequency(),
                &self.settings.calibration,
            ));
        }
        Ok(derived::speed_per_frame(velocity, &self.frame_clock()?))
    }
    /// Nearest video frame for every imaging frame of the active plane.
    pub fn video_frame_index(&self, video: &impl FrameTimestamps) -> Result<Vec<usize>> {
        let clock = self.frame_clock()?;
        if clock.frame_onsets.is_empty() {
            return Err(AuxError::NoImagingClock);
        }
        let sf = self.sampling_frequency();
        let onsets_s: Vec<f64> = clock.frame_onsets.iter().map(|&s| s as f64 / sf).collect();
        let start_offset_s = match self.shutter()?.open_s {
            Some(open) => open,
            None => {
                log::warn!("no shutter opening found, aligning video to the recording start");
                0.0
            }
        };
        Ok(video_frame_index(
            &onsets_s,
            &video.timestamps_ms()?,
            start_offset_s,
        ))
    }
}
impl fmt::Display for AuxRecording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.store.header();
        writeln!(f, "AuxData file {} from {}", self.file_name(), header.start_datetime)?;
        write!(
            f,
            "* {} channels, {} datapoints, samplingfreq={}, max input = {} V",
            header.channel_count,
            self.store.sample_count(),
            header.sampling_frequency,
            header.max_voltage
        )?;
        if let Ok(clock) = self.frame_clock() {
            if !clock.is_degenerate() {
                write!(
                    f,
                    "\n* imaging: {} frames, ifi={:.5} s ({:.3} Hz), plane {}/{}",
                    clock.frame_onsets.len(),
                    clock.inter_frame_interval,
                    clock.imaging_sampling_frequency(),
                    self.plane.index() + 1,
                    self.plane.count()
                )?;
            }
        }
        Ok(())
    }
}
