use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use guzo_server::App;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, Instrument};

#[derive(Debug, Error)]
#[error("Could not start Guzo HTTP server")]
struct StartError;

#[tracing::instrument(skip_all, name = "server.run")]
async fn start_guzo_server(config: guzo_config::Server) -> Result<(), StartError> {
    if !guzo_utils::RELEASE {
        info!(?config, "Starting Guzo HTTP server...");
    }

    let app = App::new(config).change_context(StartError)?;

    setup_database(&app)
        .await
        .change_context(StartError)
        .attach_printable("could not prepare the database")?;

    debug!("binding server");
    let listener = TcpListener::bind((app.config.ip, app.config.port))
        .await
        .change_context(StartError)
        .attach_printable("could not bind server with address and port")?;

    let addr = listener
        .local_addr()
        .change_context(StartError)
        .attach_printable("could not get socket address of the server")?;

    let make_service = guzo_server::build_axum_router(app.clone())
        .into_make_service_with_connect_info::<SocketAddr>();

    info!(
        "Guzo HTTP server is listening at http://{addr} with {} workers",
        app.config.workers
    );

    axum::serve(listener, make_service)
        .with_graceful_shutdown(
            async {
                guzo_utils::shutdown_signal().await;
                info!("Received graceful shutdown signal. Shutting down server...");
            }
            .instrument(tracing::Span::current()),
        )
        .await
        .change_context(StartError)
        .attach_printable("could not serve Guzo HTTP service")?;

    Ok(())
}

#[tracing::instrument(skip_all, name = "server.setup_database")]
async fn setup_database(app: &App) -> Result<()> {
    debug!("waiting for the primary database...");
    app.primary_db.wait_until_healthy().await?;

    let mut conn = app.primary_db.acquire().await?;
    guzo_db::migrations::run_pending(&mut conn, &guzo_model::DB_MIGRATIONS).await?;

    Ok(())
}

fn main() -> Result<(), StartError> {
    let config = guzo_config::Server::load().change_context(StartError)?;
    let _guard = guzo_tracing::init(&config.logging).change_context(StartError)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(config.workers)
        .build()
        .change_context(StartError)
        .attach_printable("could not build the tokio runtime")?;

    rt.block_on(start_guzo_server(config))
}
