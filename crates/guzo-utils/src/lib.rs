pub mod env;

pub use guzo_api_types::util::Sensitive;

/// This value determines whether it was compiled in release mode
/// during building a binary or library.
pub const RELEASE: bool = cfg!(not(debug_assertions));

/// Resolves once the process receives SIGINT (Ctrl+C) or, on Unix,
/// SIGTERM. Used to drive graceful shutdown of the HTTP server.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
