//! Carrier identifiers
//!
//! A carrier is keyed by (platform, architecture, runtime version, capacity
//! bucket) and rendered as `{platform}-{arch}-{version}-v1-{bucket}MB`. The
//! rendered form is both the cache filename and the remote artifact name.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use unibin_core::BucketMb;

/// Errors from parsing identifier components
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// Unknown platform token or alias
    #[error("unrecognized platform: {0}")]
    UnknownPlatform(String),

    /// Unknown architecture token or alias
    #[error("unrecognized architecture: {0}")]
    UnknownArch(String),
}

/// Target platform of a carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Darwin,
    Linux,
    Alpine,
}

impl Platform {
    /// Canonical token used in carrier names.
    pub fn token(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Alpine => "alpine",
        }
    }

    /// Platform of the running process.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::Darwin,
            _ => Platform::Linux,
        }
    }
}

impl FromStr for Platform {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "windows" | "win32" | "win" => Ok(Platform::Windows),
            "darwin" | "macos" | "mac" => Ok(Platform::Darwin),
            "linux" => Ok(Platform::Linux),
            "alpine" | "static" => Ok(Platform::Alpine),
            other => Err(IdentifierError::UnknownPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Target architecture of a carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X64,
    Arm6l,
    Arm7l,
    Arm64,
}

impl Arch {
    /// Canonical token used in carrier names.
    pub fn token(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
            Arch::Arm6l => "arm6l",
            Arch::Arm7l => "arm7l",
            Arch::Arm64 => "arm64",
        }
    }

    /// Architecture of the running process.
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86" => Arch::X86,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Arm7l,
            _ => Arch::X64,
        }
    }
}

impl FromStr for Arch {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Container-style tokens arrive as "linux/arm64" etc.
        let s = s.rsplit('/').next().unwrap_or(s);
        match s {
            "x86" | "ia32" | "x32" => Ok(Arch::X86),
            "x64" | "amd64" => Ok(Arch::X64),
            "arm6" | "arm6l" => Ok(Arch::Arm6l),
            "arm" | "arm7" | "arm7l" => Ok(Arch::Arm7l),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => Err(IdentifierError::UnknownArch(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Key identifying one pre-built carrier binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CarrierId {
    pub platform: Platform,
    pub arch: Arch,
    /// Runtime version string, e.g. "18.16.0".
    pub version: String,
    pub bucket: BucketMb,
}

impl CarrierId {
    pub fn new(platform: Platform, arch: Arch, version: impl Into<String>, bucket: BucketMb) -> Self {
        Self {
            platform,
            arch,
            version: version.into(),
            bucket,
        }
    }

    /// Rendered name, used verbatim as cache filename and artifact name.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-v1-{}",
            self.platform, self.arch, self.version, self.bucket
        )
    }
}

impl fmt::Display for CarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_format() {
        let id = CarrierId::new(
            Platform::Linux,
            Arch::X64,
            "18.16.0",
            BucketMb::new(4).unwrap(),
        );
        assert_eq!(id.file_name(), "linux-x64-18.16.0-v1-4MB");
    }

    #[test]
    fn test_platform_aliases() {
        assert_eq!("win32".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!("static".parse::<Platform>().unwrap(), Platform::Alpine);
        assert!("beos".parse::<Platform>().is_err());
    }

    #[test]
    fn test_arch_aliases() {
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X64);
        assert_eq!("ia32".parse::<Arch>().unwrap(), Arch::X86);
        assert_eq!("arm7".parse::<Arch>().unwrap(), Arch::Arm7l);
        assert_eq!("linux/arm64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert!("mips".parse::<Arch>().is_err());
    }
}
