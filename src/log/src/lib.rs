#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate async_trait;

pub mod chunk;
pub mod config;
pub mod convert;
pub mod error;
pub mod file;
pub mod source;

/// DEFAULT_OUTPUT is the file name the converter writes when no output is given.
pub const DEFAULT_OUTPUT: &'static str = "out.viaemslog";
