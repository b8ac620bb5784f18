use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use upload_relay::{Application, Config, config::Args, telemetry};

/// Resolves on Ctrl+C, or SIGTERM on unix. A handler that cannot be installed is logged and
/// never fires, leaving the other one in charge.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    info!("Received {received}, finishing in-flight uploads before exit");
}

/// Summary printed by `--validate`. The access token is never shown.
fn describe(config: &Config) -> String {
    let store = config.shopify.store.as_deref().unwrap_or("<unset>");
    format!(
        "Configuration is valid.\n  store:       {store}\n  api version: {}\n  concurrency: {}\n  max body:    {} bytes\n  listen:      {}",
        config.shopify.api_version,
        config.upload.concurrency,
        config.upload.max_body_size,
        config.bind_address(),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // reqwest is built without a crypto provider
    upload_relay::install_crypto_provider();

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("{}", describe(&config));
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    info!(
        store = config.shopify.store.as_deref().unwrap_or_default(),
        api_version = %config.shopify.api_version,
        concurrency = config.upload.concurrency,
        "Configuration loaded from {}",
        args.config
    );

    Application::new(config)?.serve(shutdown_signal()).await
}
