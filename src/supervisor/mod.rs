//! Purpose: Process-lifecycle supervision for the native TCP service.
//! Exports: `ServiceControl`, `run`, `wait_for_shutdown`; `loader`, `embedded`, `paths` submodules.
//! Role: Start the service once, park until a shutdown signal, stop it on the way out.
//! Invariants: `start` failures are fatal; `stop` failures during shutdown are logged and swallowed.
//! Invariants: Signal handlers are installed only after `start` has returned.
//! Notes: A second signal during shutdown is not guarded against.

pub mod embedded;
pub mod loader;
pub mod paths;

use tracing::{info, warn};

use crate::core::error::Error;

/// The two capabilities the supervisor needs from a managed service.
pub trait ServiceControl {
    fn start(&self) -> Result<(), Error>;
    fn stop(&self) -> Result<(), Error>;
}

/// Full lifecycle: start, block until SIGINT/SIGTERM, stop.
pub async fn run<C: ServiceControl>(control: &C) -> Result<(), Error> {
    control.start()?;
    info!("service started");
    wait_for_shutdown(control).await;
    Ok(())
}

/// Blocks until a shutdown signal, then stops the service. A failed stop is
/// logged and swallowed so the process can still exit.
pub async fn wait_for_shutdown<C: ServiceControl>(control: &C) {
    shutdown_signal().await;
    info!("shutdown signal received; stopping service");
    if let Err(err) = control.stop() {
        warn!(error = %err, "service stop failed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}
