use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ProtocolError};

/// `major.minor` protocol version. Versions sharing a major number are compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolVersion {
    major: u16,
    minor: u16,
}

impl ProtocolVersion {
    pub const CURRENT: Self = Self::new(1, 1);

    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub const fn major(self) -> u16 {
        self.major
    }

    #[must_use]
    pub const fn minor(self) -> u16 {
        self.minor
    }

    #[must_use]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        self.major == other.major
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    /// Accepts `major.minor`; a bare `major` means `major.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::from(ProtocolError::InvalidVersion(s.to_owned()));

        let trimmed = s.trim();
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));

        Ok(Self {
            major: major.parse().map_err(|_e| invalid())?,
            minor: minor.parse().map_err(|_e| invalid())?,
        })
    }
}
