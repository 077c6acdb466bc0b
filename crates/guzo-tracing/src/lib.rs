//! Tracing bootstrap for Guzo binaries.
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard as FileLayerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
#[error("Failed to initialize tracing")]
pub struct TracingInitError;

/// Keep this alive for as long as the process logs; dropping it stops
/// the non-blocking file writer.
#[allow(unused)]
pub struct TracingInitGuard {
    file_guard: Option<FileLayerGuard>,
}

pub fn init(config: &guzo_config::Logging) -> Result<TracingInitGuard, TracingInitError> {
    // RUST_LOG wins over the config file so operators can poke at a
    // running deployment the usual way.
    let targets = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| config.targets.clone())
        .unwrap_or_default();

    let console = tracing_subscriber::fmt::layer();

    let (file, file_guard) = match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "guzo.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(make_env_filter(&targets))
        .with(console)
        .with(file)
        .try_init()
        .change_context(TracingInitError)
        .attach_printable("already initialized tracing")?;

    Ok(TracingInitGuard { file_guard })
}

/// Quiet, capture-friendly setup for unit and API tests. Repeated
/// calls are fine.
pub fn init_for_tests() {
    let targets = std::env::var("RUST_LOG").ok().unwrap_or_default();

    let _ = tracing_subscriber::registry()
        .with(make_env_filter(&targets))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn make_env_filter(targets: &str) -> EnvFilter {
    let default_level = if guzo_utils::RELEASE {
        LevelFilter::INFO
    } else {
        LevelFilter::DEBUG
    };

    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(targets)
}
