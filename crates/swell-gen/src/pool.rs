//! Pools of pre-generated Mersenne Twister configurations.
//!
//! The pool file is a concatenation of fixed-layout little-endian records;
//! each record holds the state vector length, the parameter words, the seed
//! placeholder and the stream identifier, followed by the state array.
//! Binary-compatible across runs.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use swell_core::{SwellError, SwellResult};

use crate::mt::{MtConfig, ParallelMt};

/// Header words per record, before the state array.
const HEADER_WORDS: usize = 13;

/// An ordered set of independent Mersenne Twister parameterizations;
/// configurations are consumed one per partition.
#[derive(Debug, Clone, Default)]
pub struct MtConfigPool {
    configs: Vec<MtConfig>,
}

impl MtConfigPool {
    pub fn new(configs: Vec<MtConfig>) -> Self {
        Self { configs }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn configs(&self) -> &[MtConfig] {
        &self.configs
    }

    /// A pool of `n` streams derived from a base seed.
    ///
    /// Each stream carries the MT19937 geometry with a distinct id; stream
    /// independence comes from well-separated seeding at instantiation
    /// time. Parameter-independent streams come from a dynamic-creation
    /// parameter file instead ([`MtConfigPool::read`]).
    pub fn generate(n: usize, seed: u32) -> Self {
        let configs = (0..n)
            .map(|i| {
                let mut config = MtConfig::mt19937(i as u32);
                config.seed = mix_seed(seed, i as u32);
                config
            })
            .collect();
        Self { configs }
    }

    /// Read a concatenated record file until end of stream.
    pub fn read(path: &Path) -> SwellResult<Self> {
        let file = File::open(path).map_err(|err| {
            SwellError::Io(std::io::Error::new(
                err.kind(),
                format!("cannot open MT configuration file {}: {err}", path.display()),
            ))
        })?;
        let mut reader = BufReader::new(file);
        let mut configs = Vec::new();
        loop {
            match read_record(&mut reader)? {
                Some(config) => {
                    config.validate()?;
                    configs.push(config);
                }
                None => break,
            }
        }
        Ok(Self { configs })
    }

    pub fn write(&self, path: &Path) -> SwellResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for config in &self.configs {
            write_record(&mut writer, config)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Instantiate the first `count` streams, seeding them from `seed`.
    ///
    /// Fails with [`SwellError::PrngPoolExhausted`] when the pool holds
    /// fewer configurations than requested; callers check this before any
    /// generation starts.
    pub fn instantiate(&self, count: usize, seed: u32) -> SwellResult<Vec<ParallelMt>> {
        if self.configs.len() < count {
            return Err(SwellError::PrngPoolExhausted {
                available: self.configs.len(),
                required: count,
            });
        }
        Ok(self.configs[..count]
            .iter()
            .map(|config| ParallelMt::new(config.clone(), mix_seed(seed, config.id)))
            .collect())
    }
}

/// SplitMix step keyed by the stream id; spreads one run seed into
/// well-separated per-stream seeds.
fn mix_seed(seed: u32, id: u32) -> u32 {
    let mut z = seed
        .wrapping_add(id.wrapping_mul(0x9e37_79b9))
        .wrapping_add(0x6a09_e667);
    z = (z ^ (z >> 16)).wrapping_mul(0x85eb_ca6b);
    z = (z ^ (z >> 13)).wrapping_mul(0xc2b2_ae35);
    z ^ (z >> 16)
}

fn read_record<R: Read>(reader: &mut R) -> SwellResult<Option<MtConfig>> {
    let mut word = [0u8; 4];
    // The first word of a record is the state vector length; a clean end of
    // file here means the pool is complete.
    match reader.read_exact(&mut word) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let nn = u32::from_le_bytes(word);
    if nn == 0 || nn > 1 << 20 {
        return Err(SwellError::Validation(format!(
            "bad MT record: state vector length {nn}"
        )));
    }
    let mut header = [0u32; HEADER_WORDS - 1];
    for slot in header.iter_mut() {
        reader.read_exact(&mut word)?;
        *slot = u32::from_le_bytes(word);
    }
    let mut state = vec![0u32; nn as usize];
    for slot in state.iter_mut() {
        reader.read_exact(&mut word)?;
        *slot = u32::from_le_bytes(word);
    }
    let [id, seed, ww, mm, rr, matrix_a, shift0, shift_b, shift_c, shift1, mask_b, mask_c] =
        header;
    Ok(Some(MtConfig {
        id,
        seed,
        ww,
        nn,
        mm,
        rr,
        matrix_a,
        shift0,
        shift_b,
        shift_c,
        shift1,
        mask_b,
        mask_c,
        state,
    }))
}

fn write_record<W: Write>(writer: &mut W, config: &MtConfig) -> SwellResult<()> {
    let header = [
        config.nn,
        config.id,
        config.seed,
        config.ww,
        config.mm,
        config.rr,
        config.matrix_a,
        config.shift0,
        config.shift_b,
        config.shift_c,
        config.shift1,
        config.mask_b,
        config.mask_c,
    ];
    for word in header {
        writer.write_all(&word.to_le_bytes())?;
    }
    for word in &config.state {
        writer.write_all(&word.to_le_bytes())?;
    }
    Ok(())
}
