//! Purpose: Shared library crate behind the `tcp-ip` CLI and the C ABI artifact.
//! Exports: `core` (service engine, errors), `supervisor` (lifecycle), `abi` (C entry points).
//! Role: Internal library backing the binary and the cdylib; not a stable public SDK.
//! Invariants: Treat the crate API as internal until a dedicated library release.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod abi;
pub mod core;
pub mod supervisor;
