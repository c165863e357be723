//! Hot-swap deployment components

pub mod artifact;
pub mod builder;
pub mod diversion;
pub mod log_streamer;
pub mod uploader;
