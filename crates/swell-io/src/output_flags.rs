//! Output and verification flag sets.

use std::fmt;
use std::str::FromStr;

use swell_core::{SwellError, SwellResult};

/// One output/verification option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Summary = 0,
    Qq = 1,
    Waves = 2,
    Acf = 3,
    Csv = 4,
    Blitz = 5,
    Binary = 6,
    Surface = 7,
}

const ALL_FLAGS: [(Flag, &str); 8] = [
    (Flag::Summary, "summary"),
    (Flag::Qq, "qq"),
    (Flag::Waves, "waves"),
    (Flag::Acf, "acf"),
    (Flag::Csv, "csv"),
    (Flag::Blitz, "blitz"),
    (Flag::Binary, "binary"),
    (Flag::Surface, "surface"),
];

/// A comma-separated flag set such as `summary,csv,binary`; `none` clears
/// everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFlags {
    bits: u32,
}

impl OutputFlags {
    pub fn set(&mut self, flag: Flag) {
        self.bits |= 1 << flag as u32;
    }

    pub fn isset(&self, flag: Flag) -> bool {
        self.bits & (1 << flag as u32) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Output file name for a given prefix and flag.
    pub fn filename(prefix: &str, flag: Flag) -> String {
        match flag {
            Flag::Csv => format!("{prefix}.csv"),
            Flag::Binary => format!("{prefix}.bin"),
            Flag::Blitz => format!("{prefix}.blitz"),
            _ => prefix.to_string(),
        }
    }
}

impl FromStr for OutputFlags {
    type Err = SwellError;

    fn from_str(s: &str) -> SwellResult<Self> {
        let mut flags = OutputFlags::default();
        for part in s.split(',') {
            let name = part.trim();
            if name.is_empty() || name == "none" {
                continue;
            }
            let flag = ALL_FLAGS
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(f, _)| *f)
                .ok_or_else(|| {
                    let names: Vec<&str> = ALL_FLAGS.iter().map(|(_, n)| *n).collect();
                    SwellError::Config(format!(
                        "bad output flag \"{name}\"; supported values: none, {}",
                        names.join(", ")
                    ))
                })?;
            flags.set(flag);
        }
        Ok(flags)
    }
}

impl fmt::Display for OutputFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in ALL_FLAGS {
            if self.isset(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
