#![forbid(unsafe_code)]

//! StateHolder counter demo library.
//!
//! Exposes the demo's view-model and option parsing so tests can drive them
//! without the binary.

pub mod app;
pub mod cli;
