//! Local filesystem helpers

pub mod file;
pub mod workspace;
