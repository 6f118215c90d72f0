use anyhow::{bail, Context, Result};
use governance::GovernanceConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_DATA_DIR: &str = ".steward";

/// On-disk TOML layout.
///
/// ```toml
/// data_dir = "/var/lib/steward"
///
/// [governance]
/// change_budget = 3
/// cooldown_hours = 48
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    governance: GovernanceConfig,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub governance: GovernanceConfig,
    pub data_dir: PathBuf,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// Precedence: CLI flag, then environment, then config file, then defaults.
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        Self::load_with(config_path, data_dir, |key| std::env::var(key).ok())
    }

    pub fn load_with(
        config_path: Option<&Path>,
        data_dir: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| env("STEWARD_CONFIG").map(PathBuf::from));

        let file = match &config_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str::<FileConfig>(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        let mut governance = file.governance;
        if let Some(raw) = env("STEWARD_CHANGE_BUDGET") {
            governance.change_budget = raw
                .trim()
                .parse()
                .with_context(|| format!("STEWARD_CHANGE_BUDGET={} is not a count", raw))?;
        }
        if let Some(raw) = env("STEWARD_COOLDOWN_HOURS") {
            governance.cooldown_hours = raw
                .trim()
                .parse()
                .with_context(|| format!("STEWARD_COOLDOWN_HOURS={} is not a number of hours", raw))?;
        }

        let problems = governance.validate();
        if !problems.is_empty() {
            bail!("invalid governance config: {}", problems.join("; "));
        }

        let data_dir = data_dir
            .or_else(|| env("STEWARD_DATA_DIR").map(PathBuf::from))
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            governance,
            data_dir,
        })
    }
}
