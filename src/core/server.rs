//! Purpose: TCP listener lifecycle for the embedded service.
//! Exports: `ServerConfig`, `ServerHandle`, `start`, `DEFAULT_BIND`.
//! Role: Owns the accept loop; each connection is served on its own detached thread.
//! Invariants: `start` returns once the listener is bound; long-running work stays on the accept thread.
//! Invariants: `stop` wakes a blocked accept and joins the accept thread before returning.
//! Notes: Connection threads are not joined on stop; every response closes its connection.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::routes;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub files_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            files_dir: PathBuf::from("."),
        }
    }
}

pub struct ServerHandle {
    running: Arc<AtomicBool>,
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

pub fn start(config: ServerConfig) -> Result<ServerHandle, Error> {
    let listener = bind_listener(config.bind).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to bind {}", config.bind))
            .with_source(err)
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read bound address")
            .with_source(err)
    })?;

    let listener = Arc::new(listener);
    let running = Arc::new(AtomicBool::new(true));
    let acceptor = {
        let listener = Arc::clone(&listener);
        let running = Arc::clone(&running);
        let files_dir = config.files_dir;
        thread::Builder::new()
            .name("tcp-ip-accept".to_string())
            .spawn(move || accept_loop(&listener, &running, &files_dir))
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to spawn accept thread")
                    .with_source(err)
            })?
    };

    info!(addr = %local_addr, "server listening");
    Ok(ServerHandle {
        running,
        listener,
        local_addr,
        acceptor,
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(self) -> Result<(), Error> {
        self.running.store(false, Ordering::SeqCst);
        wake_acceptor(&self.listener, self.local_addr);
        self.acceptor
            .join()
            .map_err(|_| Error::new(ErrorKind::Internal).with_message("accept thread panicked"))?;
        Ok(())
    }
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    // The server closes every connection, so a stopped instance leaves its
    // port in TIME_WAIT; SO_REUSEADDR keeps the next bind from failing with
    // EADDRINUSE on kernels that enforce the classic conflict rules.
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    Ok(socket.into())
}

fn accept_loop(listener: &TcpListener, running: &AtomicBool, files_dir: &Path) {
    while running.load(Ordering::SeqCst) {
        let conn = listener.accept();
        if !running.load(Ordering::SeqCst) {
            // Woken by stop(); discard whatever accept returned.
            break;
        }
        match conn {
            Ok((stream, peer)) => {
                debug!(%peer, "client connected");
                let files_dir = files_dir.to_path_buf();
                let spawned = thread::Builder::new()
                    .name("tcp-ip-conn".to_string())
                    .spawn(move || serve_connection(stream, &files_dir));
                if let Err(err) = spawned {
                    warn!(error = %err, "failed to spawn connection thread");
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "accept failed");
            }
        }
    }
    info!("server stopped");
}

fn serve_connection(mut stream: TcpStream, files_dir: &Path) {
    if let Err(err) = routes::handle_connection(&mut stream, files_dir) {
        debug!(error = %err, "connection error");
    }
}

fn wake_acceptor(listener: &TcpListener, local_addr: SocketAddr) {
    #[cfg(unix)]
    {
        use std::os::fd::AsRawFd;
        // On Linux a half-close unblocks the pending accept immediately.
        unsafe {
            libc::shutdown(listener.as_raw_fd(), libc::SHUT_RDWR);
        }
    }
    #[cfg(not(unix))]
    let _ = listener;

    // Some platforms reject shutdown on a listening socket; a loopback
    // connect wakes the accept there.
    let ip = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        other => other,
    };
    let nudge = SocketAddr::new(ip, local_addr.port());
    let _ = TcpStream::connect_timeout(&nudge, Duration::from_millis(200));
}
