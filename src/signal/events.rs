use crate::signal::edges::EdgeSet;
/// How event samples are reported.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MapMode {
    /// index of the nearest imaging frame onset
    FrameIndex,
    /// `scale * sample / sampling_frequency`
    Timestamp { sampling_frequency: f64, scale: f64 },
}
#[derive(Clone, Debug, PartialEq)]
pub enum EventTimes {
    Frames(Vec<usize>),
    Timestamps(Vec<f64>),
}
impl EventTimes {
    pub fn len(&self) -> usize {
        match self {
            EventTimes::Frames(v) => v.len(),
            EventTimes::Timestamps(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn frames(&self) -> Option<&[usize]> {
        match self {
            EventTimes::Frames(v) => Some(v),
            EventTimes::Timestamps(_) => None,
        }
    }
    pub fn timestamps(&self) -> Option<&[f64]> {
        match self {
            EventTimes::Timestamps(v) => Some(v),
            EventTimes::Frames(_) => None,
        }
    }
}
/// Index of the onset closest to `sample`; on a tie the earlier onset wins.
/// `onsets` must be strictly increasing.
pub fn nearest_frame(sample: usize, onsets: &[usize]) -> Option<usize> {
    if onsets.is_empty() {
        return None;
    }
    let after = onsets.partition_point(|&onset| onset < sample);
    if after == 0 {
        return Some(0);
    }
    if after == onsets.len() {
        return Some(onsets.len() - 1);
    }
    let before = after - 1;
    if sample - onsets[before] <= onsets[after] - sample {
        Some(before)
    } else {
        Some(after)
    }
}
/// Maps event samples to frame indices or timestamps. In frame mode an
/// empty onset list yields no events.
pub fn map_events(events: &[usize], onsets: &[usize], mode: MapMode) -> EventTimes {
    match mode {
        MapMode::FrameIndex => EventTimes::Frames(
            events
                .iter()
                .filter_map(|&sample| nearest_frame(sample, onsets))
                .collect(),
        ),
        MapMode::Timestamp {
            sampling_frequency,
            scale,
        } => EventTimes::Timestamps(
            events
                .iter()
                .map(|&sample| scale * sample as f64 / sampling_frequency)
                .collect(),
        ),
    }
}
/// Window offsets that may be cut short by a timeout.
///
/// Each onset is closed by the first offset at or after it (or the end of the
/// recording when none follows). If a timeout edge falls inside
/// `[onset, offset]`, the earliest such timeout replaces the offset.
pub fn composite_offsets(
    onsets: &EdgeSet,
    offsets: &EdgeSet,
    timeouts: &EdgeSet,
    sample_count: usize,
) -> Vec<usize> {
    let offsets = offsets.as_slice();
    let timeouts = timeouts.as_slice();
    onsets
        .as_slice()
        .iter()
        .map(|&onset| {
            let natural = offsets
                .get(offsets.partition_point(|&off| off < onset))
                .copied()
                .unwrap_or(sample_count);
            match timeouts.get(timeouts.partition_point(|&t| t < onset)) {
                Some(&timeout) if timeout <= natural => timeout,
                _ => natural,
            }
        })
        .collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn midway_ties_go_to_the_earlier_frame() {
        let onsets = [100, 200, 300];
        assert_eq!(nearest_frame(150, &onsets), Some(0));
        assert_eq!(nearest_frame(151, &onsets), Some(1));
        assert_eq!(nearest_frame(250, &onsets), Some(1));
    }
    #[test]
    fn events_outside_the_clock_clamp_to_the_ends() {
        let onsets = [100, 200, 300];
        assert_eq!(nearest_frame(0, &onsets), Some(0));
        assert_eq!(nearest_frame(200, &onsets), Some(1));
        assert_eq!(nearest_frame(10_000, &onsets), Some(2));
        assert_eq!(nearest_frame(5, &[]), None);
    }
    #[test]
    fn several_events_can_share_a_frame() {
        let mapped = map_events(&[98, 101, 104, 260], &[100, 200, 300], MapMode::FrameIndex);
        assert_eq!(mapped, EventTimes::Frames(vec![0, 0, 0, 2]));
    }
    #[test]
    fn timestamp_mode_uses_the_scaled_convention() {
        let mode = MapMode::Timestamp {
            sampling_frequency: 5000.0,
            scale: 100.0,
        };
        let mapped = map_events(&[0, 2500, 5000], &[], mode);
        assert_eq!(mapped.timestamps(), Some(&[0.0, 50.0, 100.0][..]));
        assert!(mapped.frames().is_none());
    }
    #[test]
    fn timeouts_cut_windows_short() {
        let onsets = EdgeSet::from_sorted(vec![100, 500, 900]);
        let offsets = EdgeSet::from_sorted(vec![300, 700, 1100]);
        let timeouts = EdgeSet::from_sorted(vec![450, 650]);
        let closed = composite_offsets(&onsets, &offsets, &timeouts, 2000);
        assert_eq!(closed, vec![300, 650, 1100]);
    }
    #[test]
    fn unclosed_window_runs_to_the_end() {
        let onsets = EdgeSet::from_sorted(vec![100]);
        let closed = composite_offsets(&onsets, &EdgeSet::default(), &EdgeSet::default(), 2000);
        assert_eq!(closed, vec![2000]);
    }
}
