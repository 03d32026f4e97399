//! `nctel check`: load, validate, and summarize the configuration.

use std::io::Write;

use nctel_api::HostKeyFingerprint;
use nctel_core::{ControllerConfig, HostKeyVerification, RequestSpec, SelectorRegistry};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = nctel_config::load_config(global.config.as_deref())?;
    let config = nctel_config::to_controller_config(&cfg)?;

    // The collector would retry a bad fingerprint forever; catch it here.
    if let HostKeyVerification::Fingerprint(ref raw) = config.host_key {
        raw.parse::<HostKeyFingerprint>()
            .map_err(|e| CliError::Validation {
                field: "host_key_fingerprint".into(),
                reason: e.to_string(),
            })?;
    }

    tracing::debug!(address = %config.address, "configuration valid");

    let mut out = std::io::stdout().lock();
    if args.show {
        writeln!(out, "{}", nctel_config::render_redacted(&cfg)?)?;
    }
    write_summary(&mut out, &config)?;
    Ok(())
}

fn write_summary(out: &mut impl Write, config: &ControllerConfig) -> std::io::Result<()> {
    writeln!(out, "address: {}", config.address)?;
    match &config.host_key {
        HostKeyVerification::DangerAcceptAny => writeln!(out, "host key: any (insecure)")?,
        HostKeyVerification::Fingerprint(fp) => writeln!(out, "host key: {fp}")?,
        HostKeyVerification::Unspecified => writeln!(out, "host key: unspecified")?,
    }
    writeln!(out, "redial interval: {:?}", config.redial_interval)?;
    writeln!(out, "timeout: {:?}", config.timeout)?;

    if let Some(ref subscription) = config.subscription {
        writeln!(
            out,
            "subscription service: {} subscription(s), {} notification stream(s)",
            subscription.subscriptions.len(),
            subscription.notifications.len()
        )?;
    }
    if let Some(ref polling) = config.polling {
        writeln!(out, "polling service: {} poll(s)", polling.polls.len())?;
    }

    let specs: Vec<RequestSpec> = config.request_specs().collect();
    let selectors = SelectorRegistry::from_specs(&specs);
    writeln!(out, "measurements:")?;
    for measurement in selectors.measurements() {
        writeln!(out, "  {measurement}")?;
    }
    writeln!(out, "tags:")?;
    for tag in selectors.tags() {
        writeln!(out, "  {tag}")?;
    }
    Ok(())
}
