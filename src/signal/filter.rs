/// Centered moving average with zero padding; output has the input length.
#[derive(Clone, Copy, Debug)]
pub struct BoxFilter {
    width: usize,
}
impl BoxFilter {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }
    /// Window covering `seconds` at `sample_rate_hz`, at least one sample.
    pub fn from_duration(seconds: f64, sample_rate_hz: f64) -> Self {
        Self::new((seconds * sample_rate_hz).round() as usize)
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        // prefix[i] = sum of input[..i]
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        for &v in input {
            prefix.push(prefix[prefix.len() - 1] + v);
        }
        let lead = (self.width - 1) / 2;
        let w = self.width as f64;
        (0..n)
            .map(|i| {
                let lo = i.saturating_sub(lead);
                let hi = (i + self.width - lead).min(n);
                (prefix[hi] - prefix[lo]) / w
            })
            .collect()
    }
}
/// Averages consecutive blocks of `bin` samples; a short final block is
/// averaged over its own length.
pub fn bin_average(input: &[f64], bin: usize) -> Vec<f64> {
    input
        .chunks(bin.max(1))
        .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
        .collect()
}
/// Mean of `input[start..start + len]` for every start, clipped to the input.
pub fn window_average(input: &[f64], starts: &[usize], len: usize) -> Vec<f64> {
    starts
        .iter()
        .map(|&start| {
            let lo = start.min(input.len());
            let hi = start.saturating_add(len.max(1)).min(input.len());
            if hi > lo {
                input[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
            } else {
                0.0
            }
        })
        .collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn box_filter_is_centered_and_zero_padded() {
        let out = BoxFilter::new(3).apply(&[0.0, 3.0, 0.0, 0.0, 6.0]);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 2.0, 2.0]);
    }
    #[test]
    fn even_width_leans_forward() {
        let out = BoxFilter::new(2).apply(&[2.0, 4.0, 6.0]);
        assert_eq!(out, vec![3.0, 5.0, 3.0]);
    }
    #[test]
    fn width_from_duration() {
        assert_eq!(BoxFilter::from_duration(0.1, 5000.0).width(), 500);
        assert_eq!(BoxFilter::from_duration(0.1, 4.0).width(), 1);
    }
    #[test]
    fn binning_keeps_partial_tail() {
        assert_eq!(bin_average(&[1.0, 3.0, 5.0, 7.0, 9.0], 2), vec![2.0, 6.0, 9.0]);
    }
    #[test]
    fn windows_clip_at_the_end() {
        let input = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(window_average(&input, &[0, 2, 3, 9], 2), vec![1.5, 3.5, 4.0, 0.0]);
    }
}
