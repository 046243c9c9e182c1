//! venvpin installer library.
//!
//! This crate fetches the source archives named by a pinned install plan,
//! verifies each against its SHA-256 digest, and installs them into an
//! isolated Python virtual environment. It is used by the `venvpin` CLI
//! binary and can be consumed programmatically for testing or custom
//! installation workflows.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered installer configuration
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`environment`] - Install roots, archive extraction, and `pip` installs
//! - [`error`] - Installer error types and failure categories
//! - [`exec`] - Subprocess execution with timeouts
//! - [`fetch`] - Archive download, retry, and caching
//! - [`formula`] - The built-in AirIAM formula
//! - [`orchestrator`] - Fetch, verify, and install sequencing
//! - [`output`] - User-facing messages
//! - [`receipt`] - The receipt written into completed roots
//! - [`setup`] - Resolution of plans, paths, and the fetcher stack
//! - [`spec`] - Dependency specs and install plans
//! - [`verify`] - SHA-256 integrity checks

pub mod cli;
pub mod config;
pub mod dirs;
pub mod environment;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod formula;
pub mod orchestrator;
pub mod output;
pub mod receipt;
pub mod setup;
pub mod spec;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
