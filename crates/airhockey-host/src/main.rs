use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use airhockey_host::config::HostConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Air hockey starting");

    let config = HostConfig::load();
    match airhockey_host::run(config).await {
        Ok(()) => {
            tracing::info!("Air hockey stopped");
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        },
    }
}
