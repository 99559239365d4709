//! Purpose: C ABI for hosting the service from non-Rust loaders (libtcp_ip).
//! Exports: `start_server`, `stop_server`.
//! Role: Zero-argument entry points over one process-wide server slot.
//! Invariants: Calls never panic across the FFI boundary.
//! Invariants: Double start logs and returns; stop without start is a silent no-op.
//! Notes: The entry points take no configuration; the server uses the compiled defaults.

use std::sync::Mutex;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::core::server::{self, ServerConfig, ServerHandle};

static ACTIVE: Mutex<Option<ServerHandle>> = Mutex::new(None);

#[unsafe(no_mangle)]
pub extern "C" fn start_server() {
    ensure_tracing();
    let Ok(mut active) = ACTIVE.lock() else {
        error!("server state lock poisoned");
        return;
    };
    if active.is_some() {
        info!("server already running");
        return;
    }
    match server::start(ServerConfig::default()) {
        Ok(handle) => {
            *active = Some(handle);
        }
        Err(err) => {
            error!(error = %err, "failed to start server");
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn stop_server() {
    let Ok(mut active) = ACTIVE.lock() else {
        error!("server state lock poisoned");
        return;
    };
    let Some(handle) = active.take() else {
        return;
    };
    // The lock stays held across the join; a concurrent start waits until
    // the listener is released.
    if let Err(err) = handle.stop() {
        error!(error = %err, "failed to stop server");
    }
}

fn ensure_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
