//! File input and output.

pub mod export;
pub mod profiles;
