//! Self-descriptive text output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{ArrayView3, ArrayView4};

use swell_core::{Domain2, Grid3, Real, SwellResult};

/// Write a 3-D field as `t,x,y,z` rows: the time index, the physical `x`
/// and `y` coordinates and the field value.
pub fn write_csv(
    path: &Path,
    data: ArrayView3<Real>,
    grid: &Grid3,
    separator: char,
) -> SwellResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    writeln!(out, "t{separator}x{separator}y{separator}z")?;
    let (nt, nx, ny) = data.dim();
    let dx = grid.patch_size(1);
    let dy = grid.patch_size(2);
    for t in 0..nt {
        for i in 0..nx {
            for j in 0..ny {
                let x = i as Real * dx;
                let y = j as Real * dy;
                writeln!(
                    out,
                    "{t}{separator}{x}{separator}{y}{separator}{}",
                    data[[t, i, j]]
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Write the velocity potential as `t,z,x,y,phi` rows with physical
/// coordinates taken from the solver domain and the surface grid.
pub fn write_potential_csv(
    path: &Path,
    data: ArrayView4<Real>,
    domain: &Domain2,
    grid: &Grid3,
    separator: char,
) -> SwellResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    writeln!(
        out,
        "t{separator}z{separator}x{separator}y{separator}phi"
    )?;
    let (nt, nz, nx, ny) = data.dim();
    let dx = grid.patch_size(1);
    let dy = grid.patch_size(2);
    for t in 0..nt {
        let tv = domain.point(t, 0);
        for zi in 0..nz {
            let z = domain.point(zi, 1);
            for i in 0..nx {
                for j in 0..ny {
                    let x = i as Real * dx;
                    let y = j as Real * dy;
                    writeln!(
                        out,
                        "{tv}{separator}{z}{separator}{x}{separator}{y}{separator}{}",
                        data[[t, zi, i, j]]
                    )?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Plain nested text dump of a 3-D field, one spatial slice per block.
pub fn write_text(path: &Path, data: ArrayView3<Real>) -> SwellResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let (nt, nx, ny) = data.dim();
    writeln!(out, "({nt}, {nx}, {ny})")?;
    for t in 0..nt {
        for i in 0..nx {
            for j in 0..ny {
                if j > 0 {
                    write!(out, " ")?;
                }
                write!(out, "{}", data[[t, i, j]])?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
