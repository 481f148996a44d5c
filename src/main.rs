mod cli;
mod settings;

use std::process::ExitCode;

use prerender_lib::{connect_session, serve, telemetry};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();
    telemetry::init(args.verbose);

    let config = match settings::load_config(args.config.as_deref()) {
        Ok(config) => settings::resolve_settings(&args, config),
        Err(err) => {
            error!(error = %err, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "{}",
        settings::format_effective_config(&config, args.config.as_deref())
    );

    let session = match connect_session(&config).await {
        Ok(session) => session,
        Err(err) => {
            error!(
                error = %err,
                category = %err.category(),
                "cannot start without a browser session"
            );
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    match serve(config, session, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server stopped with an error");
            ExitCode::FAILURE
        }
    }
}
