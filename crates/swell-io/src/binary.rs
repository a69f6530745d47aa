//! Raw binary surface output.
//!
//! Network-byte-order floating-point values, row-major with the leading
//! (time) axis first, no header. Slabs of leading-axis levels may be
//! appended incrementally while later slabs are still being computed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayView3, ArrayView4};

use swell_core::{Real, SwellResult};

pub struct BinaryWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl BinaryWriter {
    pub fn create(path: &Path) -> SwellResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a slab of leading-axis levels.
    pub fn write_view(&mut self, data: ArrayView3<Real>) -> SwellResult<()> {
        for value in data.iter() {
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    /// Append `count` leading-axis levels starting at `t0`.
    pub fn write_slab(
        &mut self,
        data: ArrayView3<Real>,
        t0: usize,
        count: usize,
    ) -> SwellResult<()> {
        self.write_view(data.slice(ndarray::s![t0..t0 + count, .., ..]))
    }

    pub fn write_all(&mut self, data: ArrayView3<Real>) -> SwellResult<()> {
        let nt = data.shape()[0];
        self.write_slab(data, 0, nt)
    }

    /// Write a whole 4-D field, leading axis first.
    pub fn write_view4(&mut self, data: ArrayView4<Real>) -> SwellResult<()> {
        for value in data.iter() {
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    /// Flush and close the output.
    pub fn finish(mut self) -> SwellResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Roll back an aborted run: the partially written file is truncated so
    /// no partial output is retained.
    pub fn abort(self) -> SwellResult<()> {
        let file = self.writer.into_inner().map_err(|err| err.into_error())?;
        file.set_len(0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn slabs_concatenate_to_the_full_record() {
        let data = Array3::from_shape_fn((4, 2, 3), |(t, x, y)| {
            (t * 100 + x * 10 + y) as Real
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeta.bin");
        let mut writer = BinaryWriter::create(&path).unwrap();
        writer.write_slab(data.view(), 0, 2).unwrap();
        writer.write_slab(data.view(), 2, 2).unwrap();
        writer.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let width = std::mem::size_of::<Real>();
        assert_eq!(bytes.len(), 4 * 2 * 3 * width);
        // First and last values in network byte order.
        let first = Real::from_be_bytes(bytes[..width].try_into().unwrap());
        let last = Real::from_be_bytes(bytes[bytes.len() - width..].try_into().unwrap());
        assert_eq!(first, 0.0);
        assert_eq!(last, 312.0);
    }

    #[test]
    fn abort_truncates_the_file() {
        let data = Array3::from_elem((2, 2, 2), 1.0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeta.bin");
        let mut writer = BinaryWriter::create(&path).unwrap();
        writer.write_all(data.view()).unwrap();
        writer.abort().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
