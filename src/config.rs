use log::{debug, info};
use std::env;
use std::net::SocketAddr;

use crate::error::{ExporterError, Result};
use crate::location::{LocationMatcher, MatcherKind};

const DEFAULT_LISTEN: &str = "0.0.0.0:9001";
const DEFAULT_SUBPROCESS: &str = "rtl_433 -F json";

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub listen_addr: SocketAddr,
    pub subprocess: String,
    pub matchers: Vec<LocationMatcher>,
}

impl ExporterConfig {
    pub fn new() -> Result<Self> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen = lookup("RTL433_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen_addr = listen.trim().parse::<SocketAddr>().map_err(|e| {
            ExporterError::Config(format!("invalid RTL433_LISTEN '{}': {}", listen, e))
        })?;

        let subprocess = lookup("RTL433_SUBPROCESS")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBPROCESS.to_string());

        let mut matchers = Vec::new();
        if let Some(raw) = lookup("RTL433_ID_MATCHERS") {
            matchers.extend(parse_matchers(&raw, MatcherKind::Id)?);
        }
        if let Some(raw) = lookup("RTL433_CHANNEL_MATCHERS") {
            matchers.extend(parse_matchers(&raw, MatcherKind::Channel)?);
        }

        info!("Total location matchers loaded: {}", matchers.len());
        for matcher in &matchers {
            debug!(
                "Matcher {:?}: {} / {} -> {}",
                matcher.kind, matcher.model, matcher.value, matcher.location
            );
        }

        Ok(ExporterConfig {
            listen_addr,
            subprocess,
            matchers,
        })
    }
}

/// Parse `model,value,location` entries separated by `;`
pub fn parse_matchers(raw: &str, kind: MatcherKind) -> Result<Vec<LocationMatcher>> {
    let mut matchers = Vec::new();

    for entry in raw.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let fields: Vec<&str> = entry.split(',').map(str::trim).collect();
        match fields.as_slice() {
            [model, value, location]
                if !model.is_empty() && !value.is_empty() && !location.is_empty() =>
            {
                matchers.push(LocationMatcher {
                    kind,
                    model: model.to_string(),
                    value: value.to_string(),
                    location: location.to_string(),
                });
            }
            _ => {
                return Err(ExporterError::Config(format!(
                    "invalid {:?} matcher '{}', expected model,value,location",
                    kind, entry
                )))
            }
        }
    }

    Ok(matchers)
}
