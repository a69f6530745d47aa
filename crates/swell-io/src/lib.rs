//! # swell-io: configuration and output formats
//!
//! The `key = value` parameter-block parser, the typed simulation
//! configuration assembled from it, output flag parsing and the binary /
//! text surface writers. Unknown keys fail loudly before any heavy
//! computation.

pub mod binary;
pub mod config;
pub mod csv;
pub mod output_flags;
pub mod params;

pub use binary::BinaryWriter;
pub use config::{AcfSource, ModelKind, SimulationConfig, VelocitySolverConfig};
pub use csv::{write_csv, write_potential_csv, write_text};
pub use output_flags::{Flag, OutputFlags};
pub use params::{parse_shape, parse_vector, Params, Value};
