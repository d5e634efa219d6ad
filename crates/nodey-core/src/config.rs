//! Layered configuration.
//!
//! Resolution order, later layers win:
//!
//! 1. built-in defaults
//! 2. YAML file (`--config`, else `./nodey.yaml`, else `<config_dir>/nodey/config.yaml`)
//! 3. `.env.local` / `.env` in the working directory (never overriding the environment)
//! 4. `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `NODEY_MODEL`
//! 5. command-line overrides
//!
//! ```yaml
//! provider:
//!   adapter: openai
//!   model: gpt-4o-mini
//!   api_key: ${OPENAI_API_KEY}
//! revision_cap: 3
//! step_timeout_secs: 180
//! policies:
//!   review: { policy: fail_fast }
//!   analyze: { policy: retry, attempts: 2 }
//! out_dir: ./flows
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::orchestration::{FailurePolicy, OrchestratorConfig, PolicyTable, DEFAULT_REVISION_CAP};
use crate::steps::{ChatConfig, StepKind};

pub const LOCAL_CONFIG_FILE: &str = "nodey.yaml";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const MODEL_VAR: &str = "NODEY_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeyConfig {
    pub provider: ChatConfig,
    /// Rejections tolerated before the current draft is force-accepted.
    pub revision_cap: u32,
    pub step_timeout_secs: u64,
    pub policies: PolicyTable,
    /// Where emitted JSON/HTML pairs are written.
    pub out_dir: PathBuf,
    /// Where saved flowcharts are listed from.
    pub history_dir: PathBuf,
    /// Number of log entries the surfaces show.
    pub log_window: usize,
    /// Mirror the session log to `.nodey/traces/`.
    pub trace: bool,
    /// System prompt overrides keyed by role id (analyst, researcher, architect, judges).
    pub prompts: HashMap<String, String>,
}

impl Default for NodeyConfig {
    fn default() -> Self {
        Self {
            provider: ChatConfig::default(),
            revision_cap: DEFAULT_REVISION_CAP,
            step_timeout_secs: 180,
            policies: PolicyTable::default(),
            out_dir: PathBuf::from("."),
            history_dir: PathBuf::from("."),
            log_window: 10,
            trace: false,
            prompts: HashMap::new(),
        }
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub revision_cap: Option<u32>,
    pub step_timeout_secs: Option<u64>,
    pub out_dir: Option<PathBuf>,
}

impl NodeyConfig {
    /// Resolve every layer for the current process.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, FlowError> {
        load_dotenv(Path::new("."));

        let mut config = match locate_config_file(overrides.config_path.as_deref())? {
            Some(path) => {
                tracing::info!("[Config] Loading {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, FlowError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| FlowError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse YAML after expanding `${VAR}` / `${VAR:-default}` references.
    pub fn from_yaml(yaml: &str) -> Result<Self, FlowError> {
        let resolved = resolve_env_vars(yaml);
        if resolved.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&resolved).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Environment layer; `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(API_KEY_VAR) {
            self.provider.api_key = key;
        }
        if let Some(url) = non_empty(BASE_URL_VAR) {
            self.provider.base_url = url;
        }
        if let Some(model) = non_empty(MODEL_VAR) {
            self.provider.model = model;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(model) = &overrides.model {
            self.provider.model = model.clone();
        }
        if let Some(url) = &overrides.base_url {
            self.provider.base_url = url.clone();
        }
        if let Some(cap) = overrides.revision_cap {
            self.revision_cap = cap;
        }
        if let Some(secs) = overrides.step_timeout_secs {
            self.step_timeout_secs = secs;
        }
        if let Some(dir) = &overrides.out_dir {
            self.out_dir = dir.clone();
        }
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.step_timeout_secs == 0 {
            return Err(FlowError::Config(
                "step_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.log_window == 0 {
            return Err(FlowError::Config("log_window must be greater than zero".to_string()));
        }
        for kind in [StepKind::Draft, StepKind::Emit] {
            if matches!(
                self.policies.get(kind),
                FailurePolicy::Degrade | FailurePolicy::FailOpen
            ) {
                return Err(FlowError::Config(format!(
                    "policy for {} must be fail_fast or retry",
                    kind
                )));
            }
        }
        if self.provider.api_key.trim().is_empty() {
            return Err(FlowError::MissingCredential(format!(
                "{} is not set. Run: export {}=\"sk-...\"",
                API_KEY_VAR, API_KEY_VAR
            )));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            revision_cap: self.revision_cap,
            policies: self.policies.clone(),
        }
    }
}

fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, FlowError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(FlowError::NotFound(format!("config file {}", path.display())));
        }
        return Ok(Some(path.to_path_buf()));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }
    Ok(dirs::config_dir()
        .map(|dir| dir.join("nodey").join("config.yaml"))
        .filter(|path| path.is_file()))
}

/// Resolve environment variable references in a string.
/// Supports `${ENV_VAR}` and `${ENV_VAR:-default}` syntax; unknown variables
/// without a default are left as written.
pub fn resolve_env_vars(input: &str) -> String {
    resolve_with(input, |key| std::env::var(key).ok())
}

fn resolve_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let expr = &caps[1];
        match expr.split_once(":-") {
            Some((name, default)) => lookup(name).unwrap_or_else(|| default.to_string()),
            None => lookup(expr).unwrap_or_else(|| format!("${{{}}}", expr)),
        }
    })
    .to_string()
}

/// Load `.env.local` then `.env` from `dir`; variables already set win.
pub fn load_dotenv(dir: &Path) {
    for filename in [".env.local", ".env"] {
        let path = dir.join(filename);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for (key, value) in parse_dotenv(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(&key, value);
            }
        }
        tracing::info!("[Config] Loaded environment from '{}'", path.display());
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                &value[1..value.len() - 1]
            } else {
                value
            };
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
