//! HTTP access to an instance

pub mod client;
pub mod endpoint;
pub mod logs;
pub mod update;
