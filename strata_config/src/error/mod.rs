//! Error types produced by composition and instantiation.

mod constructors;
mod types;

pub use types::{StrataError, StrataResult};
