// Signal-to-event extraction stages, leaf first
pub mod cleaner;
pub mod derived;
pub mod edges;
pub mod error;
pub mod events;
pub mod filter;
pub mod frames;
pub mod store;
pub mod sync;
// Re-export the types callers work with
pub use cleaner::{clean, clean_with_recovery, quantize, LevelMap};
pub use derived::{DarkframeWindow, ShutterWindow};
pub use edges::{detect_edges, Direction, EdgeSet};
pub use error::AuxError;
pub use events::{composite_offsets, map_events, nearest_frame, EventTimes, MapMode};
pub use filter::BoxFilter;
pub use frames::{FrameClock, FrameClockResult, PlaneSelection, TriggerKind};
pub use store::{find_recording, ChannelStore, RecordingHeader};
pub use sync::{video_frame_index, FrameTimestamps, ManualTimestamps};
