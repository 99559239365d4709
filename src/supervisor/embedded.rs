//! Purpose: In-process implementation of the service-control boundary.
//! Exports: `EmbeddedService`.
//! Role: Drives the embedded TCP service through the same start/stop seam as a loaded library.
//! Invariants: At most one live server per instance; double start is a `State` error.

use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use crate::core::error::{Error, ErrorKind};
use crate::core::server::{self, ServerConfig, ServerHandle};
use crate::supervisor::ServiceControl;

pub struct EmbeddedService {
    config: ServerConfig,
    active: Mutex<Option<ServerHandle>>,
}

impl EmbeddedService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            active: Mutex::new(None),
        }
    }

    /// Actual bound address while the server is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        let active = self.active.lock().ok()?;
        active.as_ref().map(|handle| handle.local_addr())
    }
}

impl ServiceControl for EmbeddedService {
    fn start(&self) -> Result<(), Error> {
        let mut active = self.active.lock().map_err(poisoned)?;
        if active.is_some() {
            return Err(Error::new(ErrorKind::State).with_message("server already running"));
        }
        *active = Some(server::start(self.config.clone())?);
        Ok(())
    }

    fn stop(&self) -> Result<(), Error> {
        let mut active = self.active.lock().map_err(poisoned)?;
        match active.take() {
            Some(handle) => handle.stop(),
            None => Err(Error::new(ErrorKind::State).with_message("server is not running")),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::new(ErrorKind::Internal).with_message("server state lock poisoned")
}
