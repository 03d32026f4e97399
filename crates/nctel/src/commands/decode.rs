//! `nctel decode`: offline decoding of a captured payload.

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use nctel_core::{SelectorRegistry, decode};

use crate::cli::DecodeArgs;
use crate::error::CliError;

pub fn handle(args: &DecodeArgs) -> Result<(), CliError> {
    let xml = read_input(&args.file)?;
    let roots = nctel_api::xml::parse_forest(&xml).map_err(|source| CliError::Payload {
        path: args.file.display().to_string(),
        source,
    })?;

    let mut selectors = SelectorRegistry::new();
    for measurement in &args.measurement {
        selectors.add_measurement(measurement);
    }
    for tag in &args.tag {
        selectors.add_tag(tag);
    }

    let timestamp = match args.timestamp {
        Some(ref raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| CliError::Validation {
                field: "timestamp".into(),
                reason: format!("'{raw}': {e}"),
            })?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    tracing::debug!(roots = roots.len(), "decoding payload");

    let mut out = std::io::stdout().lock();
    for root in &roots {
        for record in decode(root, &selectors, &args.source, timestamp)? {
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
