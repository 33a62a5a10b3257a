//! Static target matrix.

use super::HostOs;
use crate::error::{ConfigError, UploadError};

/// One buildable target: compiler triple plus the `<os>-<arch>` alias used
/// in archive names and registry metadata.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TargetSpec {
    /// Compiler target triple
    pub triple: &'static str,
    /// Platform alias, `<os>-<arch>`
    pub alias: &'static str,
    /// Host family this target is built on
    pub os_family: HostOs,
    /// Cross linker to hand to cargo, when the host default cannot link this target
    pub linker: Option<&'static str>,
}

const WINDOWS_TARGETS: &[TargetSpec] = &[
    TargetSpec {
        triple: "x86_64-pc-windows-msvc",
        alias: "windows-x86_64",
        os_family: HostOs::Windows,
        linker: None,
    },
    TargetSpec {
        triple: "i686-pc-windows-msvc",
        alias: "windows-x86",
        os_family: HostOs::Windows,
        linker: None,
    },
    TargetSpec {
        triple: "aarch64-pc-windows-msvc",
        alias: "windows-aarch64",
        os_family: HostOs::Windows,
        linker: None,
    },
];

const LINUX_TARGETS: &[TargetSpec] = &[
    TargetSpec {
        triple: "i686-unknown-linux-gnu",
        alias: "linux-x86",
        os_family: HostOs::Linux,
        linker: Some("i686-linux-gnu-gcc"),
    },
    TargetSpec {
        triple: "x86_64-unknown-linux-gnu",
        alias: "linux-x86_64",
        os_family: HostOs::Linux,
        linker: None,
    },
    TargetSpec {
        triple: "aarch64-unknown-linux-gnu",
        alias: "linux-aarch64",
        os_family: HostOs::Linux,
        linker: Some("aarch64-linux-gnu-gcc"),
    },
];

const DARWIN_TARGETS: &[TargetSpec] = &[
    TargetSpec {
        triple: "x86_64-apple-darwin",
        alias: "macos-x86_64",
        os_family: HostOs::Darwin,
        linker: None,
    },
    TargetSpec {
        triple: "aarch64-apple-darwin",
        alias: "macos-aarch64",
        os_family: HostOs::Darwin,
        linker: None,
    },
];

/// Mapping from host family to its ordered targets.
pub struct TargetMatrix;

impl TargetMatrix {
    /// Targets for `host`, in build order.
    pub fn resolve(host: HostOs) -> &'static [TargetSpec] {
        match host {
            HostOs::Windows => WINDOWS_TARGETS,
            HostOs::Linux => LINUX_TARGETS,
            HostOs::Darwin => DARWIN_TARGETS,
        }
    }

    /// Targets for `host` restricted to `triples`, keeping matrix order.
    ///
    /// An empty filter selects the whole matrix. A triple outside the host
    /// matrix is a configuration error.
    pub fn select(host: HostOs, triples: &[String]) -> Result<Vec<TargetSpec>, ConfigError> {
        let all = Self::resolve(host);

        if let Some(unknown) = triples
            .iter()
            .find(|t| !all.iter().any(|spec| spec.triple == t.as_str()))
        {
            return Err(ConfigError::UnknownTarget {
                triple: unknown.clone(),
                host: host.name().to_string(),
                available: all.iter().map(|s| s.triple).collect::<Vec<_>>().join(", "),
            });
        }

        Ok(all
            .iter()
            .filter(|spec| triples.is_empty() || triples.iter().any(|t| t == spec.triple))
            .copied()
            .collect())
    }
}

impl TargetSpec {
    /// Split the alias into `(os, arch)`.
    pub fn platform(&self) -> Result<(&'static str, &'static str), UploadError> {
        split_alias(self.alias)
    }

    /// Environment variable cargo reads the linker for this triple from.
    pub fn linker_env_var(&self) -> String {
        format!(
            "CARGO_TARGET_{}_LINKER",
            self.triple.to_ascii_uppercase().replace('-', "_")
        )
    }
}

/// Split a `<os>-<arch>` alias into exactly two non-empty tokens.
pub(crate) fn split_alias(alias: &str) -> Result<(&str, &str), UploadError> {
    let mut parts = alias.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(os), Some(arch), None) if !os.is_empty() && !arch.is_empty() => Ok((os, arch)),
        _ => Err(UploadError::InvalidAlias {
            alias: alias.to_string(),
        }),
    }
}
