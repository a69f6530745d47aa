//! # swell-cli: the simulation driver
//!
//! Reads a configuration file, runs the pipeline (ACF → coefficient fit →
//! partitioned generation → optional transforms → velocity potential →
//! outputs) and reports every failure as a diagnostic with a non-zero exit
//! code.

pub mod driver;
