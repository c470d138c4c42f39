use crate::errors::ParsingError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RINEX revision
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Default for Version {
    fn default() -> Self {
        Self { major: 3, minor: 4 }
    }
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl std::str::FromStr for Version {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('.') {
            Some((major, minor)) => {
                let major = major.trim().parse::<u8>().or(Err(ParsingError::Version))?;
                let minor = minor.trim();
                let minor = if minor.is_empty() {
                    0
                } else {
                    minor.parse::<u8>().or(Err(ParsingError::Version))?
                };
                Ok(Self { major, minor })
            },
            None => {
                let major = s.parse::<u8>().or(Err(ParsingError::Version))?;
                Ok(Self { major, minor: 0 })
            },
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}
