// Supervisor lifecycle driven by real signal delivery.
#![cfg(unix)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tcp_ip::core::error::{Error, ErrorKind};
use tcp_ip::supervisor::{self, ServiceControl};

#[derive(Default)]
struct StubService {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_stop: bool,
}

impl ServiceControl for StubService {
    fn start(&self) -> Result<(), Error> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), Error> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(Error::new(ErrorKind::State).with_message("refusing to stop"));
        }
        Ok(())
    }
}

fn raise_sigterm_after(delay: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        unsafe {
            libc::raise(libc::SIGTERM);
        }
    })
}

// Both scenarios share one test so the raised signals stay ordered with
// the waits that consume them.
#[test]
fn sigterm_stops_the_service_exactly_once() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        // Register a persistent handler first so a raised SIGTERM can never
        // hit the default disposition and kill the test process.
        let _guard = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install test signal handler");

        let service = StubService::default();
        let raiser = raise_sigterm_after(Duration::from_millis(300));
        supervisor::run(&service).await.expect("run");
        raiser.await.expect("raiser");
        assert_eq!(service.starts.load(Ordering::SeqCst), 1);
        assert_eq!(service.stops.load(Ordering::SeqCst), 1);

        // A failing stop is swallowed; the lifecycle still ends cleanly.
        let failing = StubService {
            fail_stop: true,
            ..StubService::default()
        };
        let raiser = raise_sigterm_after(Duration::from_millis(300));
        supervisor::run(&failing).await.expect("run with failing stop");
        raiser.await.expect("raiser");
        assert_eq!(failing.starts.load(Ordering::SeqCst), 1);
        assert_eq!(failing.stops.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn start_failure_aborts_before_any_wait() {
    struct FailingStart;

    impl ServiceControl for FailingStart {
        fn start(&self) -> Result<(), Error> {
            Err(Error::new(ErrorKind::Io).with_message("failed to bind"))
        }

        fn stop(&self) -> Result<(), Error> {
            panic!("stop must not run when start fails");
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let err = runtime
        .block_on(supervisor::run(&FailingStart))
        .expect_err("start failure propagates");
    assert_eq!(err.kind(), ErrorKind::Io);
}
