pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use self::config::{LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub type LoggingError = Box<dyn std::error::Error + Send + Sync>;

/// Installs the global subscriber: `EnvFilter`, console layer and the
/// optional daily-rolling file layer.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(config);
    let mut layers = vec![sinks::console::layer_with_config(config)];

    let file_guard = match &config.log_dir {
        Some(dir) => {
            let (file_layer, guard) = sinks::file::layer(dir, &config.file_name);
            layers.push(file_layer.boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        file_enabled = config.file_enabled(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
