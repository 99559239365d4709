//! Purpose: Load the native service from a shared library and bind its entry points.
//! Exports: `SharedLibraryService`, `START_SYMBOL`, `STOP_SYMBOL`.
//! Role: dlopen-backed implementation of the service-control boundary.
//! Invariants: Both entry points resolve at load time or the load fails.
//! Invariants: Entry points are zero-argument, non-unwinding C functions.
//! Invariants: The library handle outlives every bound function pointer.

use std::path::{Path, PathBuf};

use libloading::Library;

use crate::core::error::{Error, ErrorKind};
use crate::supervisor::ServiceControl;

pub const START_SYMBOL: &str = "start_server";
pub const STOP_SYMBOL: &str = "stop_server";

type ControlFn = unsafe extern "C" fn();

#[derive(Debug)]
pub struct SharedLibraryService {
    start: ControlFn,
    stop: ControlFn,
    path: PathBuf,
    _library: Library,
}

impl SharedLibraryService {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let library = unsafe { Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::Load)
                .with_message("failed to load native service library")
                .with_path(path)
                .with_hint(
                    "Place tcp-ip.{so,dylib,dll} next to the executable or pass --library.",
                )
                .with_source(err)
        })?;
        let start = bind(&library, path, START_SYMBOL)?;
        let stop = bind(&library, path, STOP_SYMBOL)?;
        Ok(Self {
            start,
            stop,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn bind(library: &Library, path: &Path, symbol: &str) -> Result<ControlFn, Error> {
    let found = unsafe { library.get::<ControlFn>(symbol.as_bytes()) }.map_err(|err| {
        Error::new(ErrorKind::Load)
            .with_message("library does not export a required entry point")
            .with_path(path)
            .with_symbol(symbol)
            .with_source(err)
    })?;
    Ok(*found)
}

impl ServiceControl for SharedLibraryService {
    fn start(&self) -> Result<(), Error> {
        unsafe { (self.start)() };
        Ok(())
    }

    fn stop(&self) -> Result<(), Error> {
        unsafe { (self.stop)() };
        Ok(())
    }
}
