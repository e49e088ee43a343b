use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "moonshotai/Kimi-K2-Instruct-0905:groq";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Ceiling on output tokens; requests may only lower it.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Config file the values were loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Keys a config file may set. Absent keys leave the current value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u64>,
    host: Option<String>,
    port: Option<u16>,
    debug: Option<bool>,
    audit_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u64 {
    16384
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8323
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("openbridge-audit.jsonl")
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            host: default_host(),
            port: default_port(),
            debug: false,
            audit_path: default_audit_path(),
            request_timeout_secs: default_request_timeout_secs(),
            source: None,
        }
    }
}

impl BridgeConfig {
    /// Build the effective config: defaults, then environment, then the
    /// config file (explicit path or the first one found), then the Hugging
    /// Face token if no key was set anywhere.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());

        if let Some(path) = find_config_file(explicit_path)? {
            config.apply_file(&path)?;
            config.source = Some(path);
        }

        if config.api_key.is_empty() {
            if let Some(token) = huggingface_token() {
                config.api_key = token;
            }
        }

        Ok(config)
    }

    /// Override fields from environment variables. Values that fail to
    /// parse are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = var("OPENAI_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("OPENAI_MODEL") {
            self.model = v;
        }
        if let Some(v) = var("MAX_OUTPUT_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = v;
        }
        if let Some(v) = var("HOST") {
            self.host = v;
        }
        if let Some(v) = var("PORT").and_then(|v| v.parse().ok()) {
            self.port = v;
        }
        if let Some(v) = var("DEBUG").and_then(|v| parse_bool(&v)) {
            self.debug = v;
        }
        if let Some(v) = var("AUDIT_PATH") {
            self.audit_path = PathBuf::from(v);
        }
        if let Some(v) = var("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = v;
        }
    }

    /// Override fields from a TOML file.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let file: FileConfig = toml::from_str(&content)?;

        if let Some(v) = file.api_key {
            self.api_key = v;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.host {
            self.host = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.debug {
            self.debug = v;
        }
        if let Some(v) = file.audit_path {
            self.audit_path = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        Ok(())
    }

    /// True while neither the upstream nor the model has been customized.
    pub fn is_using_defaults(&self) -> bool {
        self.base_url == DEFAULT_BASE_URL && self.model == DEFAULT_MODEL
    }

    /// The API key with only its first and last four characters visible.
    pub fn masked_api_key(&self) -> String {
        let key = &self.api_key;
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Priority: CLI arg > CWD > XDG config > home dir
fn find_config_file(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit_path {
        if !path.is_file() {
            return Err(BridgeError::config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    Ok(config_search_paths().into_iter().find(|p| p.is_file()))
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("openbridge.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("openbridge").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("openbridge").join("config.toml"));
        paths.push(home.join(".openbridge.toml"));
    }

    paths
}

fn huggingface_token() -> Option<String> {
    let path = home_dir()?.join(".huggingface").join("token");
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
