use crate::config::Config;
use crate::prediction::PredictionClient;
use crate::server::HttpServer;
use crate::upload::UploadController;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let prediction_client = match PredictionClient::new(&config.prediction_service) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to initialize prediction client: {:?}", e);
            return Err(Box::new(e));
        }
    };
    tracing::info!(
        "Using prediction service at {}",
        prediction_client.base_url()
    );

    let controller = Arc::new(UploadController::new(
        prediction_client,
        config.upload.clone(),
    ));

    // checked once; a slow or absent service must not delay serving the page
    tokio::spawn({
        let controller = controller.clone();
        async move {
            controller.check_server_health().await;
        }
    });

    let server = HttpServer::new(controller, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
