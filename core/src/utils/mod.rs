//! Small helpers shared by the credential and secret layers.

pub mod env;

pub use env::{EnvUtils, EnvVarError};
