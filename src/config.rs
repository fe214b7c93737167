use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_VIEW_NAME: &str = "IPO Metrics Dashboard";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    /// Comps document; when unset the comps model is derived from records.
    pub comps_path: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub view_name: String,
    pub logo_base: String,
    /// No logos are fetched without a token.
    pub logo_token: Option<String>,
    pub logo_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("IPO_DATA_PATH")
                .unwrap_or_else(|_| "data/ipo_data.json".to_string())
                .into(),
            comps_path: std::env::var("COMPS_PATH").ok().filter(|v| !v.is_empty()).map(PathBuf::from),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or_else(|_| "out/exports".to_string()).into(),
            view_name: std::env::var("VIEW_NAME").unwrap_or_else(|_| DEFAULT_VIEW_NAME.to_string()),
            logo_base: std::env::var("LOGO_BASE").unwrap_or_else(|_| "https://img.logo.dev".to_string()),
            logo_token: std::env::var("LOGO_TOKEN").ok().filter(|v| !v.is_empty()),
            logo_timeout_secs: std::env::var("LOGO_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
        }
    }

    pub fn logo_timeout(&self) -> Duration {
        Duration::from_secs(self.logo_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/ipo_data.json"),
            comps_path: None,
            export_dir: PathBuf::from("out/exports"),
            view_name: DEFAULT_VIEW_NAME.to_string(),
            logo_base: "https://img.logo.dev".to_string(),
            logo_token: None,
            logo_timeout_secs: 10,
        }
    }
}
