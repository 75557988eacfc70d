//! Command implementations

pub mod simulate;
pub mod validate;
