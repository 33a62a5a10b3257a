//! # liveserver_release
//!
//! Release automation for liveserver: one invocation per build host turns the
//! source tree into one zip archive per supported target and publishes each of
//! them to the package registry.
//!
//! ## Pipeline
//!
//! For every target of the host's matrix, strictly in order:
//!
//! 1. **Provision** - cross compilers (Linux) and `rustup target add`
//! 2. **Build** - `cargo build --release --target <triple>` with static CRT linking
//! 3. **Package** - `dist/<app>-<os>-<arch>.zip` holding the single binary
//! 4. **Upload** - multipart `POST` of metadata and archive to the registry
//!
//! A failing target does not stop the remaining ones; the exit code reports it.
//!
//! ## Usage
//!
//! ```bash
//! liveserver_release 1.2.3 "$REGISTRY_TOKEN"
//! liveserver_release 1.2.3 "$REGISTRY_TOKEN" --target aarch64-unknown-linux-gnu
//! liveserver_release 1.2.3 unused --dry-run
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build;
pub mod cli;
pub mod error;
pub mod package;
pub mod process;
pub mod registry;
pub mod release;
pub mod target;
pub mod toolchain;

// Re-export main types for public API
pub use build::{BuildArtifact, BuildEnv, BuildExecutor};
pub use cli::{Args, RetryConfig, RuntimeConfig};
pub use error::{ReleaseError, Result};
pub use package::{ArtifactPackager, PackageArchive};
pub use process::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use registry::{RegistryConfig, RegistryResponse, RegistryUploader, UploadDescriptor, UploadResult};
pub use release::{ReleaseOrchestrator, ReleaseReport, ReleaseSettings, TargetOutcome, TargetStatus};
pub use target::{HostOs, TargetMatrix, TargetSpec};
pub use toolchain::ToolchainProvisioner;
