use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling::daily};
use tracing_subscriber::{fmt, registry::LookupSpan, Layer};

/// Daily-rolling, non-blocking file layer. The guard must outlive logging.
pub fn layer<S>(
    dir: &Path,
    file_name: &str,
) -> (impl Layer<S> + Send + Sync, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let file_appender = daily(dir, file_name);
    let (non_blocking_writer, guard) = non_blocking(file_appender);

    let layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_writer);

    (layer, guard)
}
