//! Human-readable process output (stdout).

use crate::config::Settings;
use frontsim_core::{ChannelWeights, SessionSummary};

/// Startup banner: listening address, config path and nominal per-channel rates.
pub fn banner(settings: &Settings, weights: &ChannelWeights) -> Vec<String> {
    let mut lines = vec![format!(
        "Simulator listening on {}:{}",
        settings.host, settings.port
    )];
    if let Some(path) = &settings.config_path {
        lines.push(format!("Config: {}", path.display()));
    }
    lines.push("Effective per-channel rates (Hz):".to_string());
    for (ch, rate) in weights
        .nominal_rates(settings.generator.rate_hz)
        .iter()
        .enumerate()
    {
        lines.push(format!("  ch {}: {:.2}", ch, rate));
    }
    lines
}

pub fn summary(summary: &SessionSummary) -> Vec<String> {
    vec![
        format!(
            "Final summary: sent={} dropped={}",
            summary.sent_total, summary.dropped_total
        ),
        "Client disconnected".to_string(),
    ]
}
