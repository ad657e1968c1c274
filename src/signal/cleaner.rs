use std::collections::BTreeMap;
use crate::signal::edges::{detect_edges, Direction};
use crate::signal::error::{AuxError, Result};
/// Majority-vote cleaning of a digitally encoded channel.
///
/// Every on-interval (first sample above `threshold` up to the first sample
/// back at or below it) is overwritten with the quantized level that occurs
/// most often inside it. Samples outside any on-interval become zero. An
/// interval that is still open at the end of the recording runs to the last
/// sample.
pub fn clean<'a, I>(
    channel: I,
    threshold: f64,
    resolution: f64,
    force_first_sample_zero: bool,
) -> Result<Vec<f64>>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut data: Vec<f64> = channel.into_iter().copied().collect();
    if force_first_sample_zero {
        if let Some(first) = data.first_mut() {
            *first = 0.0;
        }
    }
    let onsets = detect_edges(&data, threshold, Direction::Rising);
    let offsets = detect_edges(&data, threshold, Direction::Falling);
    if let Some(first_offset) = offsets.first() {
        let first_onset = onsets.first().unwrap_or(data.len());
        if first_offset < first_onset {
            return Err(AuxError::UnbracketedInterval {
                first_offset,
                first_onset,
            });
        }
    } else if onsets.is_empty() && data.iter().any(|&v| v > threshold) {
        // high for the whole recording
        return Err(AuxError::UnbracketedInterval {
            first_offset: data.len(),
            first_onset: data.len(),
        });
    }
    let mut cleaned = vec![0.0; data.len()];
    let mut offset_iter = offsets.as_slice().iter().copied().peekable();
    for onset in onsets.as_slice().iter().copied() {
        while offset_iter.next_if(|&off| off <= onset).is_some() {}
        let end = offset_iter.peek().copied().unwrap_or(data.len());
        let level = majority_level(&data[onset..end], resolution);
        cleaned[onset..end].fill(level);
    }
    Ok(cleaned)
}
/// Runs [`clean`] and, if the first interval cannot be bracketed, retries once
/// with the first sample forced to zero.
pub fn clean_with_recovery(channel: &[f64], threshold: f64, resolution: f64) -> Result<Vec<f64>> {
    match clean(channel, threshold, resolution, false) {
        Err(AuxError::UnbracketedInterval {
            first_offset,
            first_onset,
        }) => {
            log::warn!(
                "channel starts mid-interval (offset {first_offset} before onset {first_onset}), \
                 retrying with the first sample forced low"
            );
            clean(channel, threshold, resolution, true)
        }
        other => other,
    }
}
/// Round to the nearest multiple of `resolution`.
pub fn quantize(value: f64, resolution: f64) -> f64 {
    (value / resolution).round() * resolution
}
fn majority_level(interval: &[f64], resolution: f64) -> f64 {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &v in interval {
        *counts.entry((v / resolution).round() as i64).or_insert(0) += 1;
    }
    let mut best: Option<(i64, usize)> = None;
    for (&step, &count) in &counts {
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((step, count));
        }
    }
    best.map(|(step, _)| step as f64 * resolution).unwrap_or(0.0)
}
/// Ordinal recoding of a channel: normalize by the voltage range, round to
/// one of `levels` steps, then optionally remap each step.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelMap {
    min: f64,
    max: f64,
    levels: u32,
    recode: Option<Vec<u32>>,
}
impl LevelMap {
    pub fn new(
        channel: &str,
        range: (f64, f64),
        levels: u32,
        recode: Option<Vec<u32>>,
    ) -> Result<Self> {
        let (min, max) = range;
        if !(max - min).is_normal() || levels == 0 {
            return Err(AuxError::InvalidRange {
                channel: channel.to_string(),
            });
        }
        if let Some(map) = &recode {
            if map.len() != levels as usize {
                return Err(AuxError::InvalidRecode {
                    channel: channel.to_string(),
                    levels,
                    recode_len: map.len(),
                });
            }
        }
        Ok(Self {
            min,
            max,
            levels,
            recode,
        })
    }
    pub fn levels(&self) -> u32 {
        self.levels
    }
    pub fn apply(&self, value: f64) -> f64 {
        let top = (self.levels - 1) as f64;
        let normalized = (value - self.min) / (self.max - self.min);
        let step = (normalized * top).round().clamp(0.0, top) as usize;
        match &self.recode {
            Some(map) => map[step] as f64,
            None => step as f64,
        }
    }
    pub fn apply_all<'a, I>(&self, channel: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        channel.into_iter().map(|&v| self.apply(v)).collect()
    }
}
