//! # swell-gen: partitioned parallel surface generation
//!
//! Turns fitted process coefficients into realizations: partitions the
//! output grid into blocks, assigns each block an independent Mersenne
//! Twister stream from a pre-generated pool, and schedules the blocks as a
//! topological wavefront over the seven-predecessor dependency lattice.
//! The surface is bit-identical across runs and worker counts for a fixed
//! partition shape, pool and seed.

pub mod lh;
pub mod mt;
pub mod partition;
pub mod pool;
pub mod surface;
pub mod wavefront;

pub use lh::LonguetHigginsModel;
pub use mt::{MtConfig, ParallelMt};
pub use partition::{make_partitions, num_partitions, partition_shape, Partition};
pub use pool::MtConfigPool;
pub use surface::{SlabWriter, SurfaceGenerator};
pub use wavefront::{LatticeTask, Wavefront};
