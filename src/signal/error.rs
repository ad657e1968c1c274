use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum AuxError {
    #[error("no file matching `{pattern}` in {}", dir.display())]
    NotFound { dir: PathBuf, pattern: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file too short to hold the 4-value header")]
    TruncatedHeader,
    #[error("header field `{field}` must be positive, got {value}")]
    NonPositiveField { field: &'static str, value: f64 },
    #[error("cannot decode start timestamp `{0}` as YYYYMMDDHHMMSS")]
    InvalidTimestamp(String),
    #[error("payload ends with {trailing_bytes} bytes that do not form a full value")]
    PartialValue { trailing_bytes: usize },
    #[error("payload of {values} values is not a multiple of {channel_count} channels")]
    PayloadNotAligned { values: usize, channel_count: usize },
    #[error("channel `{0}` is not configured")]
    UnknownChannel(String),
    #[error("event `{0}` is not configured")]
    UnknownEvent(String),
    #[error("channel index {index} out of range for {channel_count} channels")]
    ChannelOutOfRange { index: usize, channel_count: usize },
    #[error("imaging plane {index} out of range for {count} planes")]
    InvalidPlane { index: usize, count: usize },
    #[error("channel `{channel}` has an empty voltage range")]
    InvalidRange { channel: String },
    #[error("channel `{channel}` recodes {recode_len} values but quantizes to {levels} levels")]
    InvalidRecode {
        channel: String,
        levels: u32,
        recode_len: usize,
    },
    #[error("first offset at sample {first_offset} precedes first onset at {first_onset}")]
    UnbracketedInterval {
        first_offset: usize,
        first_onset: usize,
    },
    #[error("recording has no usable imaging frame clock")]
    NoImagingClock,
}
pub type Result<T> = std::result::Result<T, AuxError>;
