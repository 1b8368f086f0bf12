//! # Audioviz channel tool
//!
//! Library half of the `audioviz` binary: argument parsing, the synthetic
//! producer and the subcommand loops, kept here so they can be tested without
//! spawning the binary.

#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod synth;

pub use cli::{Args, Command};
pub use synth::TravellingPeak;
