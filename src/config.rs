use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;

use crate::agents::AgentKind;

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Get all overrides as a map of setting key -> env var name.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed browser origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// What PRECHECK does when the usage store cannot be read.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Reject the request with a 503 and do not run the agent.
    #[default]
    Closed,
    /// Log a warning and run the agent anyway.
    Open,
}

impl std::fmt::Display for StoreFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

impl FromStr for StoreFailurePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "closed" | "fail_closed" => Ok(Self::Closed),
            "open" | "fail_open" => Ok(Self::Open),
            _ => Err(format!("Unknown store failure policy: {s}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BudgetConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum spend per local calendar day.
    #[serde(default = "default_daily_limit_eur")]
    pub daily_limit_eur: f64,
    #[serde(default = "default_input_price")]
    pub input_price_per_million_eur: f64,
    #[serde(default = "default_output_price")]
    pub output_price_per_million_eur: f64,
    /// IANA zone whose midnight starts a new budget day.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// The one agent id subject to the daily ceiling.
    #[serde(default = "default_metered_agent")]
    pub metered_agent: String,
    #[serde(default)]
    pub on_store_error: StoreFailurePolicy,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_limit_eur: default_daily_limit_eur(),
            input_price_per_million_eur: default_input_price(),
            output_price_per_million_eur: default_output_price(),
            timezone: default_timezone(),
            metered_agent: default_metered_agent(),
            on_store_error: StoreFailurePolicy::default(),
        }
    }
}

/// Persona override for one agent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ProfileConfig {
    pub id: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Fetched once at startup; takes precedence over `instructions`.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentsConfig {
    /// OpenAI-compatible API root, e.g. "https://api.openai.com/v1".
    #[serde(default = "default_agents_base_url")]
    pub base_url: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            base_url: default_agents_base_url(),
            api_key: None,
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
            profiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("healthsoc.db")
}
const fn default_true() -> bool {
    true
}
const fn default_daily_limit_eur() -> f64 {
    2.0
}
const fn default_input_price() -> f64 {
    1.87
}
const fn default_output_price() -> f64 {
    7.48
}
fn default_timezone() -> String {
    "Europe/Vienna".to_string()
}
fn default_metered_agent() -> String {
    AgentKind::HealthsocChatbot.id().to_string()
}
fn default_agents_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
const fn default_timeout_secs() -> u64 {
    120
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading, env overrides, and validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `HEALTHSOC_` takes precedence over
    /// the file value and is tracked in `env_overrides`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Parsed budget timezone. Only fails on configs that skipped `validate`.
    pub fn budget_timezone(&self) -> anyhow::Result<Tz> {
        self.budget.timezone.parse().map_err(|e| {
            anyhow::anyhow!("Invalid budget timezone '{}': {e}", self.budget.timezone)
        })
    }

    /// All agent ids this configuration can serve: the built-ins plus any
    /// extra ids declared under `[[agents.profiles]]`.
    pub fn known_agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = AgentKind::ALL.iter().map(|k| k.id().to_string()).collect();
        for profile in &self.agents.profiles {
            if !ids.contains(&profile.id) {
                ids.push(profile.id.clone());
            }
        }
        ids
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.budget_timezone()?;

        let amounts = [
            ("budget.daily_limit_eur", self.budget.daily_limit_eur),
            (
                "budget.input_price_per_million_eur",
                self.budget.input_price_per_million_eur,
            ),
            (
                "budget.output_price_per_million_eur",
                self.budget.output_price_per_million_eur,
            ),
        ];
        for (key, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{key} must be a finite, non-negative amount (got {value})");
            }
        }

        let metered = self.budget.metered_agent.trim();
        if metered.is_empty() {
            anyhow::bail!("budget.metered_agent must not be empty");
        }
        if !self.known_agent_ids().iter().any(|id| id == metered) {
            anyhow::bail!("budget.metered_agent '{metered}' is not a known agent");
        }

        for profile in &self.agents.profiles {
            if profile.id.trim().is_empty() {
                anyhow::bail!("agents.profiles entries need a non-empty id");
            }
        }

        if self.agents.base_url.trim().is_empty() {
            anyhow::bail!("agents.base_url must not be empty");
        }

        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Every supported setting has a corresponding `HEALTHSOC_*` env var. When
    /// set, the env var value replaces the file/default value and the setting
    /// key is recorded in `env_overrides`. A value that does not parse for its
    /// setting is an error.
    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        let mut ov = EnvOverrides::default();

        // -- Helpers (macros for concise per-field overrides) --

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = match val.trim().to_lowercase().as_str() {
                        "1" | "true" | "yes" | "on" => true,
                        "0" | "false" | "no" | "off" => false,
                        _ => anyhow::bail!("{} = '{}' is not a boolean ({})", $env, val, $key),
                    };
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val.trim().parse().map_err(|_| {
                        anyhow::anyhow!("{} = '{}' is not a valid value for {}", $env, val, $key)
                    })?;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_path {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = PathBuf::from(val);
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_opt_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(val) };
                    ov.record($key, $env);
                }
            };
        }

        // -- Server --
        env_str!("server.host", "HEALTHSOC_SERVER_HOST", self.server.host);
        env_parse!("server.port", "HEALTHSOC_SERVER_PORT", self.server.port);
        if let Ok(val) = std::env::var("HEALTHSOC_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            ov.record("server.cors_origins", "HEALTHSOC_SERVER_CORS_ORIGINS");
        }

        // -- Database --
        env_path!("database.path", "HEALTHSOC_DATABASE_PATH", self.database.path);

        // -- Budget --
        env_bool!("budget.enabled", "HEALTHSOC_BUDGET_ENABLED", self.budget.enabled);
        env_parse!(
            "budget.daily_limit_eur",
            "HEALTHSOC_DAILY_BUDGET_EUR",
            self.budget.daily_limit_eur
        );
        env_parse!(
            "budget.input_price_per_million_eur",
            "HEALTHSOC_PRICE_INPUT_EUR",
            self.budget.input_price_per_million_eur
        );
        env_parse!(
            "budget.output_price_per_million_eur",
            "HEALTHSOC_PRICE_OUTPUT_EUR",
            self.budget.output_price_per_million_eur
        );
        env_str!(
            "budget.timezone",
            "HEALTHSOC_BUDGET_TIMEZONE",
            self.budget.timezone
        );
        env_str!(
            "budget.metered_agent",
            "HEALTHSOC_METERED_AGENT",
            self.budget.metered_agent
        );
        env_parse!(
            "budget.on_store_error",
            "HEALTHSOC_BUDGET_ON_STORE_ERROR",
            self.budget.on_store_error
        );

        // -- Agents --
        env_str!(
            "agents.base_url",
            "HEALTHSOC_AGENTS_BASE_URL",
            self.agents.base_url
        );
        env_opt_str!(
            "agents.api_key",
            "HEALTHSOC_AGENTS_API_KEY",
            self.agents.api_key
        );
        env_str!(
            "agents.default_model",
            "HEALTHSOC_AGENTS_DEFAULT_MODEL",
            self.agents.default_model
        );

        // -- Logging --
        env_str!("logging.level", "HEALTHSOC_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "HEALTHSOC_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, PathBuf::from("healthsoc.db"));
        assert!(config.budget.enabled);
        assert_eq!(config.budget.daily_limit_eur, 2.0);
        assert_eq!(config.budget.input_price_per_million_eur, 1.87);
        assert_eq!(config.budget.output_price_per_million_eur, 7.48);
        assert_eq!(config.budget.timezone, "Europe/Vienna");
        assert_eq!(config.budget.metered_agent, "healthsoc_chatbot");
        assert_eq!(config.budget.on_store_error, StoreFailurePolicy::Closed);
        assert_eq!(config.agents.default_model, "gpt-4o");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_store_failure_policy_from_str() {
        assert_eq!("closed".parse::<StoreFailurePolicy>().unwrap(), StoreFailurePolicy::Closed);
        assert_eq!("OPEN".parse::<StoreFailurePolicy>().unwrap(), StoreFailurePolicy::Open);
        assert_eq!("fail_open".parse::<StoreFailurePolicy>().unwrap(), StoreFailurePolicy::Open);
        assert!("sometimes".parse::<StoreFailurePolicy>().is_err());
        assert_eq!(StoreFailurePolicy::Open.to_string(), "open");
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let mut config = Config::default();
        config.budget.timezone = "Europe/Atlantis".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Europe/Atlantis"));
    }

    #[test]
    fn test_validate_rejects_negative_amounts() {
        let mut config = Config::default();
        config.budget.daily_limit_eur = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.budget.input_price_per_million_eur = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.budget.output_price_per_million_eur = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_allows_zero_limit() {
        let mut config = Config::default();
        config.budget.daily_limit_eur = 0.0;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_metered_agent() {
        let mut config = Config::default();
        config.budget.metered_agent = "  ".to_string();
        assert!(config.validate().is_err());

        config.budget.metered_agent = "hrn_agent".to_string();
        assert!(config.validate().is_err());

        config.agents.profiles.push(ProfileConfig {
            id: "hrn_agent".to_string(),
            ..ProfileConfig::default()
        });
        config.validate().unwrap();
    }

    #[test]
    fn test_known_agent_ids_deduplicates() {
        let mut config = Config::default();
        config.agents.profiles.push(ProfileConfig {
            id: "control_agent".to_string(),
            ..ProfileConfig::default()
        });
        assert_eq!(config.known_agent_ids().len(), AgentKind::ALL.len());
    }

    /// Set env vars for the duration of `f`. Callers are `#[serial]`, so no
    /// other test observes the environment meanwhile.
    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        // SAFETY: every test that touches the environment or calls
        // `Config::load` runs under `#[serial]`.
        unsafe {
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        let result = f();
        unsafe {
            for (key, _) in vars {
                std::env::remove_var(key);
            }
        }
        result
    }

    #[test]
    fn test_env_overrides_tracking() {
        let mut ov = EnvOverrides::default();
        assert!(ov.all().is_empty());

        ov.record("budget.timezone", "HEALTHSOC_BUDGET_TIMEZONE");
        assert_eq!(
            ov.all().get("budget.timezone").map(String::as_str),
            Some("HEALTHSOC_BUDGET_TIMEZONE")
        );
        assert_eq!(ov.all().len(), 1);
    }

    #[test]
    #[serial]
    fn test_env_override_applies() {
        let config = with_env(
            &[
                ("HEALTHSOC_SERVER_PORT", "9999"),
                ("HEALTHSOC_DAILY_BUDGET_EUR", "5.5"),
                ("HEALTHSOC_BUDGET_ON_STORE_ERROR", "open"),
                ("HEALTHSOC_LOG_LEVEL", "debug"),
            ],
            || {
                let mut config = Config::default();
                config.apply_env_overrides().unwrap();
                config
            },
        );

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.budget.daily_limit_eur, 5.5);
        assert_eq!(config.budget.on_store_error, StoreFailurePolicy::Open);
        assert_eq!(config.logging.level, "debug");

        let overridden = config.env_overrides.all();
        assert!(overridden.contains_key("server.port"));
        assert!(overridden.contains_key("budget.daily_limit_eur"));
        assert!(overridden.contains_key("budget.on_store_error"));
        assert!(!overridden.contains_key("server.host"));
    }

    #[test]
    #[serial]
    fn test_env_malformed_number_is_rejected() {
        let err = with_env(&[("HEALTHSOC_DAILY_BUDGET_EUR", "20,0")], || {
            let mut config = Config::default();
            config.apply_env_overrides().unwrap_err()
        });
        let msg = err.to_string();
        assert!(msg.contains("HEALTHSOC_DAILY_BUDGET_EUR"), "{msg}");
        assert!(msg.contains("20,0"), "{msg}");
    }

    #[test]
    #[serial]
    fn test_env_malformed_price_is_rejected() {
        let result = with_env(&[("HEALTHSOC_PRICE_OUTPUT_EUR", "seven")], || {
            Config::default().apply_env_overrides()
        });
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_malformed_policy_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthsoc.toml");
        std::fs::write(&path, "[budget]\ndaily_limit_eur = 2.0\n").unwrap();

        let result = with_env(&[("HEALTHSOC_BUDGET_ON_STORE_ERROR", "opne")], || {
            Config::load(&path)
        });
        let err = result.unwrap_err().to_string();
        assert!(err.contains("HEALTHSOC_BUDGET_ON_STORE_ERROR"), "{err}");
        assert!(err.contains("opne"), "{err}");
    }

    #[test]
    #[serial]
    fn test_env_bool_variants() {
        for (val, expected) in [
            ("1", true),
            ("true", true),
            ("yes", true),
            ("ON", true),
            ("0", false),
            ("false", false),
            ("no", false),
            ("off", false),
        ] {
            let config = with_env(&[("HEALTHSOC_LOG_JSON", val)], || {
                let mut config = Config::default();
                config.apply_env_overrides().unwrap();
                config
            });
            assert_eq!(config.logging.json, expected, "HEALTHSOC_LOG_JSON={val}");
        }
    }

    #[test]
    #[serial]
    fn test_env_malformed_bool_is_rejected() {
        let result = with_env(&[("HEALTHSOC_BUDGET_ENABLED", "maybe")], || {
            Config::default().apply_env_overrides()
        });
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_cors_origins_split() {
        let config = with_env(
            &[(
                "HEALTHSOC_SERVER_CORS_ORIGINS",
                "http://localhost:3000, https://os-agent-ui.vercel.app",
            )],
            || {
                let mut config = Config::default();
                config.apply_env_overrides().unwrap();
                config
            },
        );
        assert_eq!(
            config.server.cors_origins,
            vec!["http://localhost:3000", "https://os-agent-ui.vercel.app"]
        );
    }

    #[test]
    fn test_listen_addr() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:8000");
    }

    #[test]
    #[serial]
    fn test_config_load_missing_file() {
        let path = Path::new("/tmp/nonexistent_healthsoc_config_test.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    #[serial]
    fn test_config_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9000

[budget]
daily_limit_eur = 3.5
timezone = "America/New_York"
on_store_error = "open"

[[agents.profiles]]
id = "healthsoc_chatbot"
instructions = "Answer briefly."

[logging]
level = "debug"
json = true
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.budget.daily_limit_eur, 3.5);
        assert_eq!(config.budget.input_price_per_million_eur, 1.87);
        assert_eq!(config.budget.timezone, "America/New_York");
        assert_eq!(config.budget.on_store_error, StoreFailurePolicy::Open);
        assert_eq!(config.agents.profiles.len(), 1);
        assert_eq!(
            config.agents.profiles[0].instructions.as_deref(),
            Some("Answer briefly.")
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        config.validate().unwrap();
    }

    #[test]
    fn test_example_config_lists_ui_origins() {
        let config: Config = toml::from_str(include_str!("../healthsoc.toml")).unwrap();
        let origins = &config.server.cors_origins;
        assert_eq!(origins.len(), 5);
        assert!(origins.iter().any(|o| o == "https://app.agno.com"));
        assert!(origins.iter().any(|o| o == "http://localhost:3000"));
        assert!(origins.iter().any(|o| o.starts_with("https://hrn-agent-ui.")));
        assert!(origins.iter().any(|o| o.starts_with("https://marhinovirus-study-ui.")));
        config.validate().unwrap();
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.budget.timezone, config.budget.timezone);
        assert_eq!(parsed.budget.on_store_error, config.budget.on_store_error);
    }
}
