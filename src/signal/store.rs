use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use chrono::NaiveDateTime;
use ndarray::{Array2, ArrayView1};
use crate::signal::error::{AuxError, Result};
const HEADER_VALUES: usize = 4;
const VALUE_BYTES: usize = 8;
/// Metadata block at the start of every `.lvd` trace file.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordingHeader {
    pub sampling_frequency: u32,
    pub channel_count: usize,
    pub start_datetime: NaiveDateTime,
    pub max_voltage: f64,
}
impl RecordingHeader {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw = [0.0f64; HEADER_VALUES];
        for value in raw.iter_mut() {
            *value = reader.read_f64::<BigEndian>().map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => AuxError::TruncatedHeader,
                _ => AuxError::Io(e),
            })?;
        }
        let [sf, nchan, stamp, max_voltage] = raw;
        let sampling_frequency = positive_integer("sampling_frequency", sf)?;
        let channel_count = positive_integer("channel_count", nchan)? as usize;
        if !(max_voltage.is_finite() && max_voltage > 0.0) {
            return Err(AuxError::NonPositiveField {
                field: "max_voltage",
                value: max_voltage,
            });
        }
        Ok(Self {
            sampling_frequency,
            channel_count,
            start_datetime: decode_timestamp(stamp)?,
            max_voltage,
        })
    }
}
fn positive_integer(field: &'static str, value: f64) -> Result<u32> {
    let truncated = value.trunc();
    if !truncated.is_finite() || truncated < 1.0 || truncated > u32::MAX as f64 {
        return Err(AuxError::NonPositiveField { field, value });
    }
    Ok(truncated as u32)
}
/// The timestamp is stored as a float whose integer digits read `YYYYMMDDHHMMSS`.
fn decode_timestamp(value: f64) -> Result<NaiveDateTime> {
    let digits = if value.is_finite() && value >= 0.0 {
        format!("{}", value.trunc() as u64)
    } else {
        format!("{value}")
    };
    NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M%S")
        .map_err(|_| AuxError::InvalidTimestamp(digits))
}
/// Fully decoded trace: header plus the samples x channels matrix.
#[derive(Clone, Debug)]
pub struct ChannelStore {
    header: RecordingHeader,
    samples: Array2<f64>, // samples x channels
}
impl ChannelStore {
    pub fn new(header: RecordingHeader, samples: Array2<f64>) -> Result<Self> {
        if samples.ncols() != header.channel_count {
            return Err(AuxError::PayloadNotAligned {
                values: samples.len(),
                channel_count: header.channel_count,
            });
        }
        Ok(Self { header, samples })
    }
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::with_capacity(1 << 16, file);
        Self::from_reader(&mut reader)
    }
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let header = RecordingHeader::read_from(reader)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let trailing_bytes = bytes.len() % VALUE_BYTES;
        if trailing_bytes != 0 {
            return Err(AuxError::PartialValue { trailing_bytes });
        }
        let values = bytes.len() / VALUE_BYTES;
        if values % header.channel_count != 0 {
            return Err(AuxError::PayloadNotAligned {
                values,
                channel_count: header.channel_count,
            });
        }
        let rows = values / header.channel_count;
        let mut samples = Array2::<f64>::zeros((rows, header.channel_count));
        let mut payload = &bytes[..];
        // row-major, one sample of every channel after the other
        for value in samples.iter_mut() {
            *value = payload.read_f64::<BigEndian>()?;
        }
        Ok(Self { header, samples })
    }
    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }
    pub fn sample_count(&self) -> usize {
        self.samples.nrows()
    }
    pub fn sampling_frequency(&self) -> f64 {
        self.header.sampling_frequency as f64
    }
    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / self.sampling_frequency()
    }
    pub fn channel(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        if index >= self.header.channel_count {
            return Err(AuxError::ChannelOutOfRange {
                index,
                channel_count: self.header.channel_count,
            });
        }
        Ok(self.samples.column(index))
    }
}
/// Finds the recording in `dir` whose name matches the shell-style `pattern`.
/// Several matches resolve to the lexicographically first one.
pub fn find_recording(dir: impl AsRef<Path>, pattern: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let not_found = || AuxError::NotFound {
        dir: dir.to_path_buf(),
        pattern: pattern.to_string(),
    };
    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => not_found(),
        _ => AuxError::Io(e),
    })?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| wildcard_match(pattern, &entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();
    matches.sort();
    if matches.len() > 1 {
        log::warn!(
            "{} files match `{pattern}` in {}, using {}",
            matches.len(),
            dir.display(),
            matches[0].display()
        );
    }
    matches.into_iter().next().ok_or_else(not_found)
}
/// Shell-style match supporting `*`, `?` and `[...]` classes (`!` negates,
/// `a-z` ranges). An unclosed `[` matches itself.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    glob_match(&pattern, &name)
}
fn glob_match(pattern: &[char], name: &[char]) -> bool {
    let Some((&head, rest)) = pattern.split_first() else {
        return name.is_empty();
    };
    match head {
        '*' => (0..=name.len()).any(|skip| glob_match(rest, &name[skip..])),
        '?' => !name.is_empty() && glob_match(rest, &name[1..]),
        '[' => match (split_class(rest), name.split_first()) {
            (Some((class, after)), Some((&c, tail))) => {
                class_contains(class, c) && glob_match(after, tail)
            }
            (Some(_), None) => false,
            (None, _) => name.first() == Some(&'[') && glob_match(rest, &name[1..]),
        },
        literal => name.first() == Some(&literal) && glob_match(rest, &name[1..]),
    }
}
/// Splits `[...]` contents (after the opening bracket) from the rest of the
/// pattern. A `]` right after the opening (or after `!`) is a member.
fn split_class(pattern: &[char]) -> Option<(&[char], &[char])> {
    let mut start = 0;
    if pattern.get(start) == Some(&'!') {
        start += 1;
    }
    if pattern.get(start) == Some(&']') {
        start += 1;
    }
    let close = start + pattern[start..].iter().position(|&c| c == ']')?;
    Some((&pattern[..close], &pattern[close + 1..]))
}
fn class_contains(class: &[char], c: char) -> bool {
    let (negated, members) = match class.split_first() {
        Some((&'!', members)) => (true, members),
        _ => (false, class),
    };
    let mut found = false;
    let mut i = 0;
    while i < members.len() {
        if i + 2 < members.len() && members[i + 1] == '-' {
            found |= (members[i]..=members[i + 2]).contains(&c);
            i += 3;
        } else {
            found |= members[i] == c;
            i += 1;
        }
    }
    found != negated
}
/// Encodes a trace file in the on-disk layout; used to build fixtures.
pub fn encode_recording(header: &RecordingHeader, samples: &Array2<f64>) -> Vec<u8> {
    let stamp: f64 = header
        .start_datetime
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .unwrap_or(0.0);
    let mut values = vec![
        header.sampling_frequency as f64,
        header.channel_count as f64,
        stamp,
        header.max_voltage,
    ];
    values.extend(samples.iter().copied());
    let mut bytes = vec![0u8; values.len() * VALUE_BYTES];
    for (chunk, value) in bytes.chunks_exact_mut(VALUE_BYTES).zip(values) {
        BigEndian::write_f64(chunk, value);
    }
    bytes
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;
    fn header(channel_count: usize) -> RecordingHeader {
        RecordingHeader {
            sampling_frequency: 5000,
            channel_count,
            start_datetime: NaiveDate::from_ymd_opt(2020, 4, 12)
                .unwrap()
                .and_hms_opt(13, 5, 59)
                .unwrap(),
            max_voltage: 10.0,
        }
    }
    #[test]
    fn header_and_payload_round_trip() {
        let samples = Array2::from_shape_fn((7, 3), |(r, c)| (r * 3 + c) as f64 * 0.5);
        let bytes = encode_recording(&header(3), &samples);
        let store = ChannelStore::from_reader(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(store.header(), &header(3));
        assert_eq!(store.sample_count(), 7);
        assert_eq!(store.samples(), &samples);
        assert_eq!(store.channel(2).unwrap()[1], 2.5);
    }
    #[test]
    fn misaligned_payload_is_rejected() {
        let samples = Array2::from_shape_fn((4, 2), |(r, _)| r as f64);
        let mut bytes = encode_recording(&header(2), &samples);
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        let err = ChannelStore::from_reader(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            AuxError::PayloadNotAligned {
                values: 9,
                channel_count: 2
            }
        ));
    }
    #[test]
    fn partial_trailing_value_is_rejected() {
        let samples = Array2::zeros((2, 2));
        let mut bytes = encode_recording(&header(2), &samples);
        bytes.extend_from_slice(&[0u8; 3]);
        let err = ChannelStore::from_reader(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, AuxError::PartialValue { trailing_bytes: 3 }));
    }
    #[test]
    fn non_positive_sampling_frequency_is_rejected() {
        let mut bytes = encode_recording(&header(1), &Array2::zeros((1, 1)));
        bytes[..8].copy_from_slice(&0.0f64.to_be_bytes());
        let err = ChannelStore::from_reader(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            AuxError::NonPositiveField {
                field: "sampling_frequency",
                ..
            }
        ));
    }
    #[test]
    fn short_file_is_truncated_header() {
        let err = ChannelStore::from_reader(&mut Cursor::new(vec![0u8; 20])).unwrap_err();
        assert!(matches!(err, AuxError::TruncatedHeader));
    }
    #[test]
    fn channel_index_is_bounds_checked() {
        let store = ChannelStore::new(header(2), Array2::zeros((3, 2))).unwrap();
        assert!(matches!(
            store.channel(2),
            Err(AuxError::ChannelOutOfRange { index: 2, .. })
        ));
    }
    #[test]
    fn wildcards_match_like_a_glob() {
        assert!(wildcard_match("*.lvd", "mouse01-20200412.lvd"));
        assert!(wildcard_match("*0412*.lvd", "mouse01-20200412.lvd"));
        assert!(!wildcard_match("*.lvd", "mouse01.vid"));
        assert!(wildcard_match("exact.lvd", "exact.lvd"));
        assert!(!wildcard_match("a*a", "a"));
    }
    #[test]
    fn single_characters_and_classes() {
        assert!(wildcard_match("m0?.lvd", "m07.lvd"));
        assert!(!wildcard_match("m0?.lvd", "m0.lvd"));
        assert!(wildcard_match("m[0-9][0-9].lvd", "m12.lvd"));
        assert!(!wildcard_match("m[0-9].lvd", "mx.lvd"));
        assert!(wildcard_match("m[!x].lvd", "m1.lvd"));
        assert!(!wildcard_match("m[!x].lvd", "mx.lvd"));
        assert!(wildcard_match("[]]*", "]a"));
        // an unclosed bracket is literal
        assert!(wildcard_match("m[1.lvd", "m[1.lvd"));
    }
    struct FailingReader;
    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }
    }
    #[test]
    fn read_errors_other_than_eof_pass_through() {
        let err = ChannelStore::from_reader(&mut FailingReader).unwrap_err();
        assert!(matches!(err, AuxError::Io(e) if e.kind() == ErrorKind::PermissionDenied));
    }
    #[test]
    fn finds_first_lexicographic_match() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.lvd", "a.lvd", "c.vid"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = find_recording(dir.path(), "*.lvd").unwrap();
        assert_eq!(found.file_name().unwrap(), "a.lvd");
        let found = find_recording(dir.path(), "[b-z].lvd").unwrap();
        assert_eq!(found.file_name().unwrap(), "b.lvd");
        assert!(matches!(
            find_recording(dir.path(), "*.eye1"),
            Err(AuxError::NotFound { .. })
        ));
    }
}
