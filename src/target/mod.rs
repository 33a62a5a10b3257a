//! Host operating system families and their release target matrix.
//!
//! Every host-dependent decision in the pipeline (which triples to build,
//! whether cross compilers must be installed, what the shipped binary is
//! called) is looked up on [`HostOs`] instead of comparing OS strings.
//!
//! | Host | Targets | Provisioning | Binary |
//! |------|---------|--------------|--------|
//! | Windows | x86_64, i686, aarch64 (MSVC) | none | `<app>.exe` |
//! | Linux | i686, x86_64, aarch64 (GNU) | apt cross gcc + multilib | `<app>` |
//! | macOS | x86_64, aarch64 | none | `<app>` |

mod matrix;

pub use matrix::{TargetMatrix, TargetSpec};

use crate::error::ConfigError;
use std::fmt;

/// Build host operating system family.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HostOs {
    /// Windows with the MSVC toolchain
    Windows,
    /// Linux with the GNU toolchain
    Linux,
    /// macOS
    Darwin,
}

impl HostOs {
    /// Detect the family of the running host.
    ///
    /// Uses runtime detection via `std::env::consts::OS` so the decision is
    /// made by the binary that is actually running.
    pub fn detect() -> Result<Self, ConfigError> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Parse an OS name.
    ///
    /// Accepts both Rust's `std::env::consts::OS` spelling (`linux`, `macos`,
    /// `windows`) and the kernel names (`Linux`, `Darwin`, `Windows`).
    pub fn from_os_name(os: &str) -> Result<Self, ConfigError> {
        match os.to_ascii_lowercase().as_str() {
            "windows" => Ok(HostOs::Windows),
            "linux" => Ok(HostOs::Linux),
            "macos" | "darwin" => Ok(HostOs::Darwin),
            _ => Err(ConfigError::UnsupportedHost { os: os.to_string() }),
        }
    }

    /// Human readable family name
    pub fn name(&self) -> &'static str {
        match self {
            HostOs::Windows => "Windows",
            HostOs::Linux => "Linux",
            HostOs::Darwin => "Darwin",
        }
    }

    /// Host package manager steps needed before cross compiling.
    ///
    /// Each step is one command line. Only Linux needs any: the native MSVC
    /// and Apple toolchains already cover every target in their matrix.
    pub fn provisioning_steps(&self) -> &'static [&'static [&'static str]] {
        match self {
            HostOs::Linux => &[
                &["apt", "update"],
                &["apt", "install", "-y", "gcc-aarch64-linux-gnu"],
                &["apt", "install", "-y", "gcc-i686-linux-gnu"],
                &["apt", "install", "-y", "gcc-multilib", "g++-multilib"],
                &["apt", "install", "-y", "libc6-dev-i386", "libstdc++-10-dev:i386"],
                &["apt", "install", "-y", "libm-dev:i386"],
            ],
            HostOs::Windows | HostOs::Darwin => &[],
        }
    }

    /// File name of the compiled application binary on this OS family.
    pub fn binary_name(&self, app_name: &str) -> String {
        match self {
            HostOs::Windows => format!("{}.exe", app_name),
            HostOs::Linux | HostOs::Darwin => app_name.to_string(),
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
