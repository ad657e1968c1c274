//! Decoding of two-photon / fUSI rig aux recordings into frame-aligned events.
//!
//! [`AuxRecording`] loads one trace file and answers queries about it: the
//! imaging frame clock, events mapped to frames, darkframe and shutter
//! windows, and running speed. The stages it is built from live in
//! [`signal`] and can be used on their own.
pub mod session;
pub mod settings;
pub mod signal;
pub use session::AuxRecording;
pub use settings::{Acquisition, AuxSettings, Calibration, ChannelSpec, CleanSpec, EventSpec};
pub use signal::AuxError;
