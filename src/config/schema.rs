use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub panel: PanelConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub routes: RoutesConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            panel: PanelConfig::default(),
            cache: CacheConfig::default(),
            routes: RoutesConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

// ── Panel ─────────────────────────────────────────────────────────

/// Connection details for the proxy panel's web API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Base URL of the panel, without a trailing slash.
    #[serde(default = "default_panel_url")]
    pub base_url: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Default headers applied to every panel request.
    #[serde(default = "default_headers")]
    pub headers: HashMap<String, String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: default_panel_url(),
            username: default_username(),
            password: default_password(),
            headers: default_headers(),
        }
    }
}

fn default_panel_url() -> String {
    "http://127.0.0.1:2053".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(
        "Accept-Language".to_string(),
        "zh-CN,zh;q=0.9".to_string(),
    );
    headers.insert(
        "User-Agent".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36"
            .to_string(),
    );
    headers
}

// ── Credential cache ──────────────────────────────────────────────

/// The external key-value store holding state that must survive across
/// invocations: the serialized cookie jar and the previous reachable set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store backend: "redis" (production) or "memory" (testing).
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    #[serde(default = "default_cache_url")]
    pub url: String,

    /// Key under which the serialized cookie jar lives.
    #[serde(default = "default_cookie_key")]
    pub cookie_key: String,

    /// Key under which the previous reachable set lives.
    #[serde(default = "default_routes_key")]
    pub routes_key: String,

    #[serde(default = "default_ttl_secs")]
    pub cookie_ttl_secs: u64,

    #[serde(default = "default_ttl_secs")]
    pub routes_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            url: default_cache_url(),
            cookie_key: default_cookie_key(),
            routes_key: default_routes_key(),
            cookie_ttl_secs: default_ttl_secs(),
            routes_ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_cache_backend() -> String {
    "redis".to_string()
}

fn default_cache_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_cookie_key() -> String {
    "routeshift_cookies".to_string()
}

fn default_routes_key() -> String {
    "routeshift_onlines".to_string()
}

fn default_ttl_secs() -> u64 {
    86_400
}

// ── Managed routes ────────────────────────────────────────────────

/// The fixed universe of egress routes this tool manages, plus the scope of
/// the rule it synthesizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Managed route names in priority order: when several are reachable,
    /// the first reachable entry of this list carries the traffic.
    #[serde(default = "default_universe")]
    pub universe: Vec<String>,

    /// Panel users the synthesized rule applies to.
    #[serde(default = "default_users")]
    pub users: Vec<String>,

    /// Inbound tags the synthesized rule applies to.
    #[serde(default = "default_inbound_tags")]
    pub inbound_tags: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            universe: default_universe(),
            users: default_users(),
            inbound_tags: default_inbound_tags(),
        }
    }
}

fn default_universe() -> Vec<String> {
    vec!["hostip".to_string(), "docker".to_string()]
}

fn default_users() -> Vec<String> {
    vec!["home_ip".to_string(), "ss_home_ip".to_string()]
}

fn default_inbound_tags() -> Vec<String> {
    vec!["inbound-35833".to_string(), "inbound-443".to_string()]
}

// ── Observability ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Observer backend: "log", "none"/"noop".
    #[serde(default = "default_observability_backend")]
    pub backend: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_observability_backend(),
        }
    }
}

fn default_observability_backend() -> String {
    "log".to_string()
}

// ── Load / save / env overrides ───────────────────────────────────

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let dir = home.join(".routeshift");
        let config_path = dir.join("config.toml");

        if !dir.exists() {
            fs::create_dir_all(&dir).context("Failed to create .routeshift directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            config.apply_env_overrides();
            Ok(config)
        } else {
            let mut config = Config::default();
            config.config_path = config_path;
            config.save()?;
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ROUTESHIFT_PANEL_URL") {
            if !url.is_empty() {
                self.panel.base_url = url;
            }
        }
        if let Ok(username) = std::env::var("ROUTESHIFT_PANEL_USERNAME") {
            if !username.is_empty() {
                self.panel.username = username;
            }
        }
        if let Ok(password) = std::env::var("ROUTESHIFT_PANEL_PASSWORD") {
            if !password.is_empty() {
                self.panel.password = password;
            }
        }
        if let Ok(url) = std::env::var("ROUTESHIFT_REDIS_URL") {
            if !url.is_empty() {
                self.cache.url = url;
            }
        }
        if let Ok(backend) = std::env::var("ROUTESHIFT_CACHE_BACKEND") {
            if !backend.is_empty() {
                self.cache.backend = backend;
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        fs::write(&self.config_path, toml_str).with_context(|| {
            format!("Failed to write config to {}", self.config_path.display())
        })?;
        Ok(())
    }
}
