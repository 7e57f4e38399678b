//! Host platform identification.
//!
//! Download URLs are keyed by a Rust-style target triple such as
//! `aarch64-apple-darwin`. Only a fixed set of triples is supported; the
//! current one is computed once per process from compile-time target info.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Operating system and libc flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS
    Darwin,
    /// Linux, statically linked against musl
    LinuxMusl,
    /// Windows with the MSVC toolchain
    WindowsMsvc,
}

impl Os {
    /// Get the current OS.
    #[must_use]
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "macos" => Some(Self::Darwin),
            "linux" => Some(Self::LinuxMusl),
            "windows" => Some(Self::WindowsMsvc),
            _ => None,
        }
    }

    fn vendor_os(self) -> &'static str {
        match self {
            Self::Darwin => "apple-darwin",
            Self::LinuxMusl => "unknown-linux-musl",
            Self::WindowsMsvc => "pc-windows-msvc",
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit ARM
    Aarch64,
    /// 64-bit x86
    X86_64,
}

impl Arch {
    /// Get the current architecture.
    #[must_use]
    pub fn current() -> Option<Self> {
        match std::env::consts::ARCH {
            "aarch64" => Some(Self::Aarch64),
            "x86_64" => Some(Self::X86_64),
            _ => None,
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aarch64" | "arm64" => Some(Self::Aarch64),
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aarch64 => write!(f, "aarch64"),
            Self::X86_64 => write!(f, "x86_64"),
        }
    }
}

/// A supported target triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTriple {
    arch: Arch,
    os: Os,
}

impl PlatformTriple {
    /// `aarch64-apple-darwin`
    pub const AARCH64_APPLE_DARWIN: Self = Self::new_unchecked(Arch::Aarch64, Os::Darwin);
    /// `x86_64-apple-darwin`
    pub const X86_64_APPLE_DARWIN: Self = Self::new_unchecked(Arch::X86_64, Os::Darwin);
    /// `aarch64-unknown-linux-musl`
    pub const AARCH64_LINUX_MUSL: Self = Self::new_unchecked(Arch::Aarch64, Os::LinuxMusl);
    /// `x86_64-unknown-linux-musl`
    pub const X86_64_LINUX_MUSL: Self = Self::new_unchecked(Arch::X86_64, Os::LinuxMusl);
    /// `x86_64-pc-windows-msvc`
    pub const X86_64_WINDOWS_MSVC: Self = Self::new_unchecked(Arch::X86_64, Os::WindowsMsvc);

    /// Every supported triple.
    pub const SUPPORTED: [Self; 5] = [
        Self::AARCH64_APPLE_DARWIN,
        Self::X86_64_APPLE_DARWIN,
        Self::AARCH64_LINUX_MUSL,
        Self::X86_64_LINUX_MUSL,
        Self::X86_64_WINDOWS_MSVC,
    ];

    const fn new_unchecked(arch: Arch, os: Os) -> Self {
        Self { arch, os }
    }

    /// Combine an architecture and OS.
    ///
    /// # Errors
    ///
    /// Returns a platform error for combinations outside the supported set.
    pub fn new(arch: Arch, os: Os) -> Result<Self> {
        let triple = Self { arch, os };
        if Self::SUPPORTED.contains(&triple) {
            Ok(triple)
        } else {
            Err(Error::platform(format!(
                "{arch}-{} is not a supported target",
                os.vendor_os()
            )))
        }
    }

    /// Detect the triple of the running process.
    ///
    /// # Errors
    ///
    /// Returns a platform error on hosts outside the supported set.
    pub fn current() -> Result<Self> {
        let os = Os::current().ok_or_else(|| {
            Error::platform(format!("operating system '{}'", std::env::consts::OS))
        })?;
        let arch = Arch::current().ok_or_else(|| {
            Error::platform(format!("architecture '{}'", std::env::consts::ARCH))
        })?;
        Self::new(arch, os)
    }

    /// CPU architecture.
    #[must_use]
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// OS flavor.
    #[must_use]
    pub fn os(&self) -> Os {
        self.os
    }

    /// Suffix appended to executable names on this platform.
    #[must_use]
    pub fn exe_suffix(&self) -> &'static str {
        match self.os {
            Os::WindowsMsvc => ".exe",
            Os::Darwin | Os::LinuxMusl => "",
        }
    }
}

impl fmt::Display for PlatformTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch, self.os.vendor_os())
    }
}

impl FromStr for PlatformTriple {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (arch, rest) = s
            .split_once('-')
            .ok_or_else(|| Error::platform(format!("'{s}' is not a target triple")))?;
        let arch = Arch::parse(arch)
            .ok_or_else(|| Error::platform(format!("unknown architecture in '{s}'")))?;
        let os = match rest {
            "apple-darwin" => Os::Darwin,
            "unknown-linux-musl" => Os::LinuxMusl,
            "pc-windows-msvc" => Os::WindowsMsvc,
            _ => return Err(Error::platform(format!("unknown OS in '{s}'"))),
        };
        Self::new(arch, os)
    }
}

impl Serialize for PlatformTriple {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlatformTriple {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
