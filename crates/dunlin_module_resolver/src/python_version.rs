use std::fmt;
use std::str::FromStr;

/// Representation of a Python language version, e.g. `3.7`.
///
/// Unknown future versions are accepted; resolution only branches on the
/// major version.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl PythonVersion {
    pub const PY27: PythonVersion = PythonVersion { major: 2, minor: 7 };
    pub const PY37: PythonVersion = PythonVersion { major: 3, minor: 7 };

    pub const fn is_python2(self) -> bool {
        self.major == 2
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        Self::PY37
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let PythonVersion { major, minor } = self;
        write!(f, "{major}.{minor}")
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("invalid python version `{0}`")]
pub struct PythonVersionParseError(String);

impl FromStr for PythonVersion {
    type Err = PythonVersionParseError;

    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let error = || PythonVersionParseError(version.to_string());

        let (major, rest) = version.split_once('.').unwrap_or((version, "0"));
        let major: u8 = major.parse().map_err(|_| error())?;
        // Tolerate trailing micro versions, e.g. `3.7.4`.
        let minor = rest.split('.').next().unwrap_or("0");
        let minor: u8 = minor.parse().map_err(|_| error())?;

        Ok(PythonVersion { major, minor })
    }
}

#[cfg(test)]
mod tests {
    use super::PythonVersion;

    #[test]
    fn parse() {
        assert_eq!("3.7".parse(), Ok(PythonVersion { major: 3, minor: 7 }));
        assert_eq!("3.10.2".parse(), Ok(PythonVersion { major: 3, minor: 10 }));
        assert_eq!("2".parse(), Ok(PythonVersion { major: 2, minor: 0 }));
        assert!("three.seven".parse::<PythonVersion>().is_err());
    }
}
