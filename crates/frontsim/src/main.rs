//! frontsim - Detector front-end emulator
//!
//! Streams synthetic multi-channel ADC samples as JSON lines to one TCP client.

use clap::Parser;
use frontsim::{Cli, Settings, output, server};
use frontsim_core::EventGenerator;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    frontsim::init_tracing(cli.verbose);

    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    let listener = match server::bind(&settings.host, settings.port).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Transport setup failed");
            return ExitCode::FAILURE;
        }
    };

    let mut generator = EventGenerator::new(&settings.generator);
    for line in output::banner(&settings, generator.weights()) {
        println!("{}", line);
    }
    if generator.weights().all_dead() {
        warn!("Every channel is dead; all samples will report the last channel");
    }

    let token = CancellationToken::new();
    tokio::spawn(server::cancel_on_signal(token.clone()));

    match frontsim::serve(&listener, &mut generator, &settings, &token).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Transport failure");
            ExitCode::FAILURE
        }
    }
}
