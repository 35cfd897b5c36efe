use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "window_pin.log";

/// Initialise logging to stderr and a non-blocking log file. In debug
/// mode the level defaults to `debug` and `RUST_LOG` may override it;
/// otherwise the level is pinned to `info` regardless of the
/// environment. The returned guard must stay alive for the process
/// lifetime or buffered file output is lost.
pub fn init(debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", LOG_FILE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(file_writer.and(std::io::stderr))
        .try_init();

    guard
}
