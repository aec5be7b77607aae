use anyhow::Context;
use google_gmail1::Gmail;
use sbd_downloader::auth::Authenticator;
use sbd_downloader::config::{Config, SETTINGS_FILE};
use sbd_downloader::gmail::GmailClient;
use sbd_downloader::processor::{MessageProcessor, ProcessorConfig};
use sbd_downloader::Error;
use tracing::{error, info, warn};

fn interrupted(signal: std::io::Result<()>) {
    match signal {
        Ok(()) => info!("Ctrl-C received!"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, stopping"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let debug_logging = std::env::args().any(|arg| arg == "--debug");
    let run_once = std::env::args().any(|arg| arg == "--once");

    tracing_subscriber::fmt()
        .with_max_level(if debug_logging {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = Config::load(SETTINGS_FILE)?;

    // Handle token reset
    if std::env::args().any(|arg| arg == "--reset-token") {
        Authenticator::reset_token(&config.auth).await?;
        println!("Token cleared. Please restart without --reset-token to re-authenticate.");
        return Ok(());
    }

    info!("SBD downloader: checking every {}s, press Ctrl-C to quit", config.poll_interval_secs);

    let secret = Authenticator::load_secret(&config.auth.client_secret_path).await?;
    let auth = Authenticator::authenticate(secret, &config.auth).await?;

    // Run the consent flow now instead of inside the first cycle.
    auth.token(&[config.auth.scope.as_str()])
        .await
        .context("Failed to obtain an access token")?;

    let hub = Gmail::new(
        hyper::Client::builder().build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .context("Failed to load native roots")?
                .https_only()
                .enable_http1()
                .build(),
        ),
        auth,
    );

    let processor = MessageProcessor::new(
        GmailClient::new(hub, &config.auth.scope),
        ProcessorConfig::from(&config),
    );

    match processor.resolve_label(&config.folder).await {
        Ok(_) => {}
        Err(Error::LabelNotFound(name)) => warn!(
            "Label {name:?} does not exist yet; create it in Gmail or messages will stay in the inbox"
        ),
        Err(e) => warn!(error = %e, "Could not check destination label"),
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                interrupted(signal);
                break;
            }
            result = processor.run_cycle() => match result {
                Ok(report) => report.log_summary(),
                Err(e) => error!(error = %e, "Polling cycle failed"),
            },
        }

        if run_once {
            break;
        }

        tokio::select! {
            signal = &mut shutdown => {
                interrupted(signal);
                break;
            }
            _ = tokio::time::sleep(config.poll_interval()) => {}
        }
    }

    Ok(())
}
