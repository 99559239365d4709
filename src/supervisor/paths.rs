//! Purpose: Shared-library name and location resolution for host mode.
//! Exports: `PlatformFamily`, `CURRENT_FAMILY`, `library_file_name`, `default_library_path`.
//! Role: Keep CLI and loader path semantics aligned from one source.
//! Invariants: The library is `tcp-ip.{dll,dylib,so}` next to the supervisor executable.
//! Invariants: Unrecognized platforms fall back to the Unix shared-object extension.

use std::path::PathBuf;

use crate::core::error::{Error, ErrorKind};

pub const LIBRARY_STEM: &str = "tcp-ip";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformFamily {
    Windows,
    MacOs,
    UnixLike,
}

#[cfg(target_os = "windows")]
pub const CURRENT_FAMILY: PlatformFamily = PlatformFamily::Windows;
#[cfg(target_os = "macos")]
pub const CURRENT_FAMILY: PlatformFamily = PlatformFamily::MacOs;
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const CURRENT_FAMILY: PlatformFamily = PlatformFamily::UnixLike;

impl PlatformFamily {
    pub fn library_extension(self) -> &'static str {
        match self {
            PlatformFamily::Windows => "dll",
            PlatformFamily::MacOs => "dylib",
            PlatformFamily::UnixLike => "so",
        }
    }
}

pub fn library_file_name(family: PlatformFamily) -> String {
    format!("{LIBRARY_STEM}.{}", family.library_extension())
}

/// The library co-located with the supervisor executable.
pub fn default_library_path() -> Result<PathBuf, Error> {
    let exe = std::env::current_exe().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to locate the supervisor executable")
            .with_source(err)
    })?;
    let dir = exe.parent().ok_or_else(|| {
        Error::new(ErrorKind::Io).with_message("supervisor executable has no parent directory")
    })?;
    Ok(dir.join(library_file_name(CURRENT_FAMILY)))
}
