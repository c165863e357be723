//! gok library
//!
//! Hot-swaps freshly built programs into running gokrazy instances: build,
//! upload to the instance's staging area, divert the service to the new
//! binary and follow its logs.

pub mod app;
pub mod cli;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod progress;
pub mod storage;
pub mod utils;
