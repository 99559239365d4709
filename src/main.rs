//! Purpose: `tcp-ip` CLI entry point: host a native service library or serve embedded.
//! Role: Binary crate root; parses args, runs the supervisor, derives the exit code.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
//! Invariants: Errors print on stderr as `error: ...` with an optional hint line.
//! Invariants: All lifecycle work goes through `supervisor::ServiceControl`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use tracing_subscriber::EnvFilter;

use tcp_ip::core::error::{Error, ErrorKind, to_exit_code};
use tcp_ip::core::server::{DEFAULT_BIND, ServerConfig};
use tcp_ip::supervisor::embedded::EmbeddedService;
use tcp_ip::supervisor::loader::SharedLibraryService;
use tcp_ip::supervisor::paths::default_library_path;
use tcp_ip::supervisor::{self, ServiceControl};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `tcp-ip --help`."));
            }
        },
    };

    init_tracing();
    dispatch(cli.command)
}

#[derive(Parser)]
#[command(
    name = "tcp-ip",
    version,
    about = "Host and serve the tcp-ip native TCP/HTTP service",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"The service lives behind two C entry points, start_server and stop_server.

Mental model:
  - `host` loads tcp-ip.{so,dylib,dll} and supervises it
  - `serve` runs the same service in-process
Both park until Ctrl-C or SIGTERM, then stop the service and exit.
"#,
    after_help = r#"EXAMPLES
  $ tcp-ip serve --bind 127.0.0.1:8080 --directory ./public
  $ cp target/release/libtcp_ip.so target/release/tcp-ip.so
  $ target/release/tcp-ip host
  $ tcp-ip host --library target/release/libtcp_ip.so
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the shared service library and supervise it until a shutdown signal
    Host {
        /// Library path (default: tcp-ip.{so,dylib,dll} next to this executable)
        #[arg(long, value_name = "PATH")]
        library: Option<PathBuf>,
    },
    /// Run the embedded service in-process until a shutdown signal
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
        /// Directory backing the /files endpoints
        #[arg(long, value_name = "DIR", default_value = ".")]
        directory: PathBuf,
    },
}

fn dispatch(command: Command) -> Result<RunOutcome, Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;

    match command {
        Command::Host { library } => {
            let path = match library {
                Some(path) => path,
                None => default_library_path()?,
            };
            let service = SharedLibraryService::load(&path)?;
            tracing::info!(path = %service.path().display(), "native service library loaded");
            runtime.block_on(supervisor::run(&service))?;
            Ok(RunOutcome::ok())
        }
        Command::Serve { bind, directory } => {
            let service = EmbeddedService::new(ServerConfig {
                bind,
                files_dir: directory,
            });
            service.start()?;
            if let Some(addr) = service.local_addr() {
                println!("listening on {addr}");
            }
            runtime.block_on(supervisor::wait_for_shutdown(&service));
            Ok(RunOutcome::ok())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn emit_error(err: &Error) {
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
