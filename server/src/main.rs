use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server::DEFAULT_PORT;

#[tokio::main(worker_threads = 5)]
async fn main() -> ExitCode {
    let flags = xflags::parse_or_exit! {
        /// Port to listen on (defaults to 9000)
        optional port: u16
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = flags.port.unwrap_or(DEFAULT_PORT);
    if let Err(e) = server::run(port).await {
        tracing::error!("fatal: {e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
