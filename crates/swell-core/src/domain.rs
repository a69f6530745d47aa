//! Real-bounded computation regions.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{SwellError, SwellResult};
use crate::Real;

/// A region of computation with real lower and upper bounds and a point
/// count along each dimension. Unlike [`Grid`](crate::grid::Grid), the lower
/// bound need not be zero; the empirical ACF generator samples cubes
/// centered on the origin and the velocity solver sweeps `(t, z)` ranges
/// with negative `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain<const N: usize> {
    lower: [Real; N],
    upper: [Real; N],
    npoints: [usize; N],
}

// `serde`'s derive macro only implements `Serialize`/`Deserialize` for
// arrays of concrete lengths, not for a const-generic `[T; N]`, so these
// impls are written by hand to cover every `N`.
impl<const N: usize> Serialize for Domain<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Domain", 3)?;
        state.serialize_field("lower", &self.lower[..])?;
        state.serialize_field("upper", &self.upper[..])?;
        state.serialize_field("npoints", &self.npoints[..])?;
        state.end()
    }
}

impl<'de, const N: usize> Deserialize<'de> for Domain<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DomainVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for DomainVisitor<N> {
            type Value = Domain<N>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "struct Domain")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let lower: Vec<Real> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let upper: Vec<Real> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let npoints: Vec<usize> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                build_domain(lower, upper, npoints).map_err(de::Error::custom)
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut lower: Option<Vec<Real>> = None;
                let mut upper: Option<Vec<Real>> = None;
                let mut npoints: Option<Vec<usize>> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "lower" => lower = Some(map.next_value()?),
                        "upper" => upper = Some(map.next_value()?),
                        "npoints" => npoints = Some(map.next_value()?),
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                let lower = lower.ok_or_else(|| de::Error::missing_field("lower"))?;
                let upper = upper.ok_or_else(|| de::Error::missing_field("upper"))?;
                let npoints = npoints.ok_or_else(|| de::Error::missing_field("npoints"))?;
                build_domain(lower, upper, npoints).map_err(de::Error::custom)
            }
        }

        fn build_domain<const N: usize>(
            lower: Vec<Real>,
            upper: Vec<Real>,
            npoints: Vec<usize>,
        ) -> Result<Domain<N>, String> {
            let lower: [Real; N] = lower
                .try_into()
                .map_err(|v: Vec<Real>| format!("expected {N} lower entries, got {}", v.len()))?;
            let upper: [Real; N] = upper
                .try_into()
                .map_err(|v: Vec<Real>| format!("expected {N} upper entries, got {}", v.len()))?;
            let npoints: [usize; N] = npoints
                .try_into()
                .map_err(|v: Vec<usize>| format!("expected {N} npoints, got {}", v.len()))?;
            Ok(Domain {
                lower,
                upper,
                npoints,
            })
        }

        deserializer.deserialize_struct("Domain", &["lower", "upper", "npoints"], DomainVisitor::<N>)
    }
}

pub type Domain1 = Domain<1>;
pub type Domain2 = Domain<2>;
pub type Domain3 = Domain<3>;

impl<const N: usize> Domain<N> {
    pub fn new(lower: [Real; N], upper: [Real; N], npoints: [usize; N]) -> Self {
        Self {
            lower,
            upper,
            npoints,
        }
    }

    pub fn lower(&self, i: usize) -> Real {
        self.lower[i]
    }

    pub fn upper(&self, i: usize) -> Real {
        self.upper[i]
    }

    pub fn num_points(&self, i: usize) -> usize {
        self.npoints[i]
    }

    pub fn shape(&self) -> [usize; N] {
        self.npoints
    }

    pub fn num_elements(&self) -> usize {
        self.npoints.iter().product()
    }

    pub fn patch_size(&self, i: usize) -> Real {
        if self.npoints[i] <= 1 {
            0.0
        } else {
            (self.upper[i] - self.lower[i]) / (self.npoints[i] - 1) as Real
        }
    }

    pub fn delta(&self) -> [Real; N] {
        let mut d = [0.0; N];
        for i in 0..N {
            d[i] = self.patch_size(i);
        }
        d
    }

    /// Coordinate of point `idx` along axis `axis`.
    pub fn point(&self, idx: usize, axis: usize) -> Real {
        self.lower[axis] + self.patch_size(axis) * idx as Real
    }

    pub fn validate(&self, name: &str) -> SwellResult<()> {
        for i in 0..N {
            if self.npoints[i] < 1 {
                return Err(SwellError::Validation(format!(
                    "bad \"{name}\": axis {i} has {} points",
                    self.npoints[i]
                )));
            }
            if !self.lower[i].is_finite()
                || !self.upper[i].is_finite()
                || self.upper[i] < self.lower[i]
            {
                return Err(SwellError::Validation(format!(
                    "bad \"{name}\": axis {i} spans [{}, {}]",
                    self.lower[i], self.upper[i]
                )));
            }
        }
        Ok(())
    }
}

impl<const N: usize> fmt::Display for Domain<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_tuple = |f: &mut fmt::Formatter<'_>, items: &[Real]| -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, ")")
        };
        fmt_tuple(f, &self.lower)?;
        write!(f, ":")?;
        fmt_tuple(f, &self.upper)?;
        write!(f, ":(")?;
        for (i, n) in self.npoints.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{n}")?;
        }
        write!(f, ")")
    }
}

impl<const N: usize> FromStr for Domain<N> {
    type Err = SwellError;

    /// Parses `(l…):(u…):(n…)`.
    fn from_str(s: &str) -> SwellResult<Self> {
        let bad = || SwellError::Config(format!("bad domain: \"{s}\""));
        let parse_part = |part: &str| -> Option<Vec<Real>> {
            let inner = part.trim().strip_prefix('(')?.strip_suffix(')')?;
            inner
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .map(|p| p.parse().ok())
                .collect()
        };
        let parts: Vec<&str> = s.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(bad());
        }
        let lower_v = parse_part(parts[0]).ok_or_else(bad)?;
        let upper_v = parse_part(parts[1]).ok_or_else(bad)?;
        let npoints_v = parse_part(parts[2]).ok_or_else(bad)?;
        if lower_v.len() != N || upper_v.len() != N || npoints_v.len() != N {
            return Err(bad());
        }
        let mut lower = [0.0; N];
        let mut upper = [0.0; N];
        let mut npoints = [0usize; N];
        lower.copy_from_slice(&lower_v);
        upper.copy_from_slice(&upper_v);
        for (dst, src) in npoints.iter_mut().zip(&npoints_v) {
            if *src < 0.0 || src.fract() != 0.0 {
                return Err(bad());
            }
            *dst = *src as usize;
        }
        let domain = Domain::new(lower, upper, npoints);
        domain.validate("domain")?;
        Ok(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn points_span_bounds() {
        let dom = Domain::new([-5.0, 0.0], [0.0, 10.0], [6, 11]);
        assert_relative_eq!(dom.point(0, 0), -5.0);
        assert_relative_eq!(dom.point(5, 0), 0.0);
        assert_relative_eq!(dom.point(10, 1), 10.0);
        assert_relative_eq!(dom.patch_size(1), 1.0);
    }

    #[test]
    fn parse_round_trip() {
        let dom: Domain<2> = "(0,-5):(1,0):(4,6)".parse().unwrap();
        assert_eq!(dom.shape(), [4, 6]);
        let again: Domain<2> = dom.to_string().parse().unwrap();
        assert_eq!(dom, again);
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert!("(1):(0):(4)".parse::<Domain<1>>().is_err());
    }
}
