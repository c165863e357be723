//! Instance configuration on the operator's machine

pub mod layout;
pub mod settings;
