//! Threshold crossing detection on continuous channels.
//!
//! A channel is binarized as `sample > threshold`; an edge is reported at the
//! first sample of the new state, i.e. one past the position of the non-zero
//! first difference.
use serde::{Deserialize, Serialize};
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// low to high
    Rising,
    /// high to low
    Falling,
    /// any transition; used for toggling triggers
    Either,
}
impl Default for Direction {
    fn default() -> Self {
        Direction::Rising
    }
}
/// Strictly increasing sample indices of detected transitions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeSet {
    indices: Vec<usize>,
}
impl EdgeSet {
    pub fn from_sorted(indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }
    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }
    /// Returns the first edge where exactly one is expected, warning when
    /// the channel produced more than one.
    pub fn single(&self, what: &str) -> Option<usize> {
        if self.indices.len() > 1 {
            log::warn!(
                "found {} {what} edges where one was expected, using the first at sample {}",
                self.indices.len(),
                self.indices[0]
            );
        }
        self.first()
    }
}
pub fn detect_edges<'a, I>(channel: I, threshold: f64, direction: Direction) -> EdgeSet
where
    I: IntoIterator<Item = &'a f64>,
{
    detect_by(channel.into_iter().map(|&v| v > threshold), direction)
}
/// Edges of an arbitrary per-sample state predicate.
pub fn detect_by<I>(states: I, direction: Direction) -> EdgeSet
where
    I: IntoIterator<Item = bool>,
{
    let mut indices = Vec::new();
    let mut states = states.into_iter();
    let Some(mut previous) = states.next() else {
        return EdgeSet::default();
    };
    for (offset, current) in states.enumerate() {
        let hit = match direction {
            Direction::Rising => !previous && current,
            Direction::Falling => previous && !current,
            Direction::Either => previous != current,
        };
        if hit {
            indices.push(offset + 1);
        }
        previous = current;
    }
    EdgeSet { indices }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn reports_first_sample_of_new_state() {
        let channel = [0.0, 0.0, 5.0, 5.0, 0.0, 5.0];
        let rising = detect_edges(&channel, 2.5, Direction::Rising);
        let falling = detect_edges(&channel, 2.5, Direction::Falling);
        let either = detect_edges(&channel, 2.5, Direction::Either);
        assert_eq!(rising.as_slice(), &[2, 5]);
        assert_eq!(falling.as_slice(), &[4]);
        assert_eq!(either.as_slice(), &[2, 4, 5]);
    }
    #[test]
    fn threshold_is_strict() {
        let channel = [0.0, 2.5, 2.5000001];
        assert_eq!(detect_edges(&channel, 2.5, Direction::Rising).as_slice(), &[2]);
    }
    #[test]
    fn starting_high_has_no_rising_edge_at_zero() {
        let channel = [5.0, 5.0, 0.0];
        assert!(detect_edges(&channel, 1.0, Direction::Rising).is_empty());
        assert_eq!(detect_edges(&channel, 1.0, Direction::Falling).as_slice(), &[2]);
    }
    #[test]
    fn rerun_is_identical_and_strictly_increasing() {
        let channel: Vec<f64> = (0..500).map(|i| ((i as f64) * 0.37).sin() * 3.0).collect();
        let a = detect_edges(&channel, 0.5, Direction::Either);
        let b = detect_edges(&channel, 0.5, Direction::Either);
        assert_eq!(a, b);
        assert!(a.as_slice().windows(2).all(|w| w[0] < w[1]));
    }
    #[test]
    fn single_keeps_the_first() {
        let edges = EdgeSet::from_sorted(vec![10, 20]);
        assert_eq!(edges.single("shutter open"), Some(10));
        assert_eq!(EdgeSet::default().single("shutter open"), None);
    }
    #[test]
    fn empty_channel_has_no_edges() {
        let channel: [f64; 0] = [];
        assert!(detect_edges(&channel, 0.0, Direction::Either).is_empty());
    }
}
