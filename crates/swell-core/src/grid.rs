//! Rectilinear lattices.
//!
//! A grid is defined by the number of points and the physical length along
//! each dimension. The number of points equals the number of patches plus
//! one, so a grid with 4 points spans 3 patches:
//!
//! ```text
//!   o---o---o---o
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{SwellError, SwellResult};
use crate::Real;

/// A rectilinear lattice: integer point counts and real lengths per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid<const N: usize> {
    npoints: [usize; N],
    length: [Real; N],
}

// `serde`'s derive macro only implements `Serialize`/`Deserialize` for
// arrays of concrete lengths, not for a const-generic `[T; N]`, so these
// impls are written by hand to cover every `N`.
impl<const N: usize> Serialize for Grid<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Grid", 2)?;
        state.serialize_field("npoints", &self.npoints[..])?;
        state.serialize_field("length", &self.length[..])?;
        state.end()
    }
}

impl<'de, const N: usize> Deserialize<'de> for Grid<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GridVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for GridVisitor<N> {
            type Value = Grid<N>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "struct Grid")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let npoints: Vec<usize> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let length: Vec<Real> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                build_grid(npoints, length).map_err(de::Error::custom)
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut npoints: Option<Vec<usize>> = None;
                let mut length: Option<Vec<Real>> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "npoints" => npoints = Some(map.next_value()?),
                        "length" => length = Some(map.next_value()?),
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                let npoints = npoints.ok_or_else(|| de::Error::missing_field("npoints"))?;
                let length = length.ok_or_else(|| de::Error::missing_field("length"))?;
                build_grid(npoints, length).map_err(de::Error::custom)
            }
        }

        fn build_grid<const N: usize>(
            npoints: Vec<usize>,
            length: Vec<Real>,
        ) -> Result<Grid<N>, String> {
            let npoints: [usize; N] = npoints
                .try_into()
                .map_err(|v: Vec<usize>| format!("expected {N} npoints, got {}", v.len()))?;
            let length: [Real; N] = length
                .try_into()
                .map_err(|v: Vec<Real>| format!("expected {N} length entries, got {}", v.len()))?;
            Ok(Grid { npoints, length })
        }

        deserializer.deserialize_struct("Grid", &["npoints", "length"], GridVisitor::<N>)
    }
}

pub type Grid1 = Grid<1>;
pub type Grid2 = Grid<2>;
pub type Grid3 = Grid<3>;

impl<const N: usize> Grid<N> {
    pub fn new(npoints: [usize; N], length: [Real; N]) -> Self {
        Self { npoints, length }
    }

    /// Grid with unit patches: the length is the patch count along each axis.
    pub fn from_points(npoints: [usize; N]) -> Self {
        let mut length = [0.0; N];
        for i in 0..N {
            length[i] = npoints[i].saturating_sub(1) as Real;
        }
        Self { npoints, length }
    }

    pub fn num_points(&self, i: usize) -> usize {
        self.npoints[i]
    }

    pub fn size(&self) -> [usize; N] {
        self.npoints
    }

    pub fn num_elements(&self) -> usize {
        self.npoints.iter().product()
    }

    pub fn num_patches(&self, i: usize) -> usize {
        self.npoints[i] - 1
    }

    pub fn length(&self, i: usize) -> Real {
        self.length[i]
    }

    pub fn lengths(&self) -> [Real; N] {
        self.length
    }

    /// Physical distance between adjacent points; zero for a single-point axis.
    pub fn patch_size(&self, i: usize) -> Real {
        if self.npoints[i] <= 1 {
            0.0
        } else {
            self.length[i] / (self.npoints[i] - 1) as Real
        }
    }

    pub fn delta(&self) -> [Real; N] {
        let mut d = [0.0; N];
        for i in 0..N {
            d[i] = self.patch_size(i);
        }
        d
    }

    /// Validate the grid invariants: every axis has at least one point and a
    /// finite, non-negative length.
    pub fn validate(&self, name: &str) -> SwellResult<()> {
        for i in 0..N {
            if self.npoints[i] < 1 {
                return Err(SwellError::Validation(format!(
                    "bad \"{name}\": axis {i} has {} points",
                    self.npoints[i]
                )));
            }
            if !self.length[i].is_finite() || self.length[i] < 0.0 {
                return Err(SwellError::Validation(format!(
                    "bad \"{name}\": axis {i} has length {}",
                    self.length[i]
                )));
            }
        }
        Ok(())
    }
}

fn write_tuple<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

impl<const N: usize> fmt::Display for Grid<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tuple(f, &self.npoints)?;
        write!(f, ":")?;
        write_tuple(f, &self.length)
    }
}

fn parse_tuple<T: FromStr>(s: &str) -> Option<Vec<T>> {
    let s = s.trim();
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect()
}

impl<const N: usize> FromStr for Grid<N> {
    type Err = SwellError;

    /// Parses `(n_1,…,n_N):(L_1,…,L_N)`; the length part may be omitted, in
    /// which case patches have unit size.
    fn from_str(s: &str) -> SwellResult<Self> {
        let bad = || SwellError::Config(format!("bad grid: \"{s}\""));
        let mut parts = s.splitn(2, ':');
        let npoints: Vec<usize> = parse_tuple(parts.next().ok_or_else(bad)?).ok_or_else(bad)?;
        if npoints.len() != N {
            return Err(bad());
        }
        let mut grid_points = [0usize; N];
        grid_points.copy_from_slice(&npoints);
        let grid = match parts.next() {
            Some(length_str) => {
                let length: Vec<Real> = parse_tuple(length_str).ok_or_else(bad)?;
                if length.len() != N {
                    return Err(bad());
                }
                let mut grid_length = [0.0; N];
                grid_length.copy_from_slice(&length);
                Grid::new(grid_points, grid_length)
            }
            None => Grid::from_points(grid_points),
        };
        grid.validate("grid")?;
        Ok(grid)
    }
}
