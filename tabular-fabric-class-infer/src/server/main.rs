use anyhow::Context;
use tabular_fabric_class_infer::config::Config;
use tabular_fabric_class_infer::serve::serve;
use tabular_fabric_class_infer::trace;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `token` on SIGINT or SIGTERM.
fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(terminate) => terminate,
                Err(e) => {
                    error!("failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    token.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = terminate.recv() => {},
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("shutting down grpc server");
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load config from env")?;

    trace::init(
        "tabular-class-infer-server",
        &config.log_format,
        &config.timezone,
        &config.log_level,
    );
    info!("config loaded: {:?}", config);

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    if let Err(e) = serve(&config, shutdown).await {
        error!("failed to start server: {}", e);
        return Err(e.into());
    }
    Ok(())
}
