use std::path::PathBuf;

use anyhow::{Context, Result};

/// Dataset path used when `SALES_DASHBOARD_DATA` is not set.
pub const DEFAULT_DATA_PATH: &str = "data.csv";

const DEFAULT_WINDOW: [f32; 2] = [1400.0, 900.0];

/// Startup settings, read from the environment (and an optional `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub window_size: [f32; 2],
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            window_size: DEFAULT_WINDOW,
        }
    }
}

impl DashboardConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("SALES_DASHBOARD_DATA").filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path.trim());
        }
        if let Some(width) = lookup("SALES_DASHBOARD_WIDTH") {
            config.window_size[0] = parse_dimension("SALES_DASHBOARD_WIDTH", &width)?;
        }
        if let Some(height) = lookup("SALES_DASHBOARD_HEIGHT") {
            config.window_size[1] = parse_dimension("SALES_DASHBOARD_HEIGHT", &height)?;
        }

        Ok(config)
    }
}

fn parse_dimension(key: &str, value: &str) -> Result<f32> {
    let parsed: f32 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number, got '{value}'"))?;
    anyhow::ensure!(parsed > 0.0, "{key} must be positive, got {parsed}");
    Ok(parsed)
}
