// Configuration loading and parsing (validator.toml, credentials.toml, env).

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use validator_llm::ClientSettings;

/// Environment variable naming the directory holding `config/` and `defaults/`.
pub const HOME_ENV: &str = "DATA_VALIDATOR_HOME";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const PORT_ENV: &str = "PORT";
pub const APP_URL_ENV: &str = "APP_URL";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("OpenRouter API key not set; add it to config/credentials.toml or set OPENROUTER_API_KEY")]
    MissingApiKey,
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub pricing: PricingConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// validator.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire validator.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ValidatorFile {
    server: ServerConfig,
    llm: LlmConfig,
    pricing: PricingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
    pub app_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub price_per_request: f64,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub openrouter_api_key: Option<String>,
}

impl Config {
    /// The configured API key, if any non-empty key is present.
    pub fn api_key(&self) -> Option<&str> {
        self.credentials
            .openrouter_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// `host:port` string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Build the upstream client settings from the `[llm]` section.
    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        let api_key = self.api_key().ok_or(ConfigError::MissingApiKey)?;
        let mut settings = ClientSettings::new(api_key);
        settings.base_url = self.llm.base_url.clone();
        settings.model = self.llm.model.clone();
        settings.temperature = self.llm.temperature;
        settings.max_tokens = self.llm.max_tokens;
        settings.timeout = Duration::from_secs(self.llm.timeout_secs);
        settings.max_concurrency = self.llm.max_concurrency;
        settings.app_url = self.llm.app_url.clone();
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/validator.toml` and
/// (optionally) `config/credentials.toml` under `base_dir`, then apply
/// environment overrides read through `env`.
///
/// `env` is injected so tests can supply overrides without touching the
/// process environment. Does not copy defaults; see `load_config()`.
pub fn load_config_from<F>(base_dir: &Path, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_dir = base_dir.join("config");

    // --- validator.toml (required) ---
    let validator_path = config_dir.join("validator.toml");
    let validator_text = read_file(&validator_path)?;
    let validator_file: ValidatorFile =
        toml::from_str(&validator_text).map_err(|e| ConfigError::ParseError {
            path: validator_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let mut config = Config {
        server: validator_file.server,
        llm: validator_file.llm,
        pricing: validator_file.pricing,
        credentials,
    };

    apply_env_overrides(&mut config, &env)?;
    validate(&config)?;

    if config.api_key().is_none() {
        return Err(ConfigError::MissingApiKey);
    }

    Ok(config)
}

/// Install every shipped file from `defaults/` that is missing from
/// `config/`, returning the paths written (sorted). `.example` templates and
/// subdirectories are left alone; existing config files are never touched.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (false, false) => {
            return Err(copy_failure(format!(
                "neither defaults/ nor config/ directory found in {}; \
                 run from the project root or set {HOME_ENV}",
                base_dir.display()
            )))
        }
        (false, true) => return Ok(Vec::new()),
        (true, _) => {}
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| copy_failure(format!("failed to create config directory: {e}")))?;

    let mut sources = Vec::new();
    for entry in fs::read_dir(&defaults_dir)
        .map_err(|e| copy_failure(format!("failed to read defaults directory: {e}")))?
    {
        let path = entry
            .map_err(|e| copy_failure(format!("failed to read defaults entry: {e}")))?
            .path();
        if is_shipped_default(&path) {
            sources.push(path);
        }
    }
    sources.sort();

    let mut installed = Vec::new();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if install_default(&source, &target)? {
            installed.push(target);
        }
    }
    Ok(installed)
}

/// Regular files in `defaults/` other than `*.example` templates.
fn is_shipped_default(path: &Path) -> bool {
    path.is_file() && path.extension().map_or(true, |ext| ext != "example")
}

/// Copy `source` to `target` unless `target` already exists. Returns whether
/// anything was written. An existing target is never opened for writing.
fn install_default(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(copy_failure(format!(
                "failed to create {}: {e}",
                target.display()
            )))
        }
    };
    let mut src = fs::File::open(source)
        .map_err(|e| copy_failure(format!("failed to read {}: {e}", source.display())))?;
    io::copy(&mut src, &mut dest)
        .map_err(|e| copy_failure(format!("failed to write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_failure(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Directory holding `config/` and `defaults/`: `$DATA_VALIDATOR_HOME` if
/// set, otherwise the current working directory.
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
            path: PathBuf::from("."),
        }),
    }
}

/// Convenience wrapper: copies defaults, then loads config from `base_dir()`
/// with overrides from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = base_dir()?;
    ensure_config_files(&base)?;
    load_config_from(&base, |key| std::env::var(key).ok())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Environment values win over file values. Empty values are ignored.
fn apply_env_overrides<F>(config: &mut Config, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = lookup(API_KEY_ENV) {
        config.credentials.openrouter_api_key = Some(key.trim().to_string());
    }

    if let Some(port) = lookup(PORT_ENV) {
        config.server.port =
            port.trim()
                .parse()
                .map_err(|_| ConfigError::ValidationError {
                    field: PORT_ENV.into(),
                    message: format!("not a valid port number: {port}"),
                })?;
    }

    if let Some(url) = lookup(APP_URL_ENV) {
        config.llm.app_url = url.trim().to_string();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    let llm = &config.llm;
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::ValidationError {
            field: "llm.temperature".into(),
            message: format!("must be between 0.0 and 2.0 inclusive, got {}", llm.temperature),
        });
    }

    let positive_fields: &[(&str, u64)] = &[
        ("llm.max_tokens", u64::from(llm.max_tokens)),
        ("llm.timeout_secs", llm.timeout_secs),
        ("llm.max_concurrency", llm.max_concurrency as u64),
    ];
    for (name, val) in positive_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    let price = config.pricing.price_per_request;
    if !price.is_finite() || price < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "pricing.price_per_request".into(),
            message: format!("must be a non-negative number, got {price}"),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// Create a fresh temp base dir whose `config/` holds the default
    /// validator.toml. Returns the base dir.
    fn temp_base(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults/validator.toml"),
            tmp.join("config/validator.toml"),
        )
        .unwrap();
        tmp
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn with_key() -> impl Fn(&str) -> Option<String> {
        env_from(&[(API_KEY_ENV, "sk-or-env-key")])
    }

    /// Rewrite one line of config/validator.toml in `base`.
    fn patch_validator(base: &Path, from: &str, to: &str) {
        let path = base.join("config/validator.toml");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "default validator.toml lacks `{from}`");
        fs::write(&path, text.replace(from, to)).unwrap();
    }

    fn expect_validation_field(err: ConfigError, expected: &str) {
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = temp_base("dv_config_defaults");
        let config = load_config_from(&tmp, with_key()).expect("should load valid config");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.llm.model, "mistralai/mixtral-8x7b-instruct");
        assert!((config.llm.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.llm.max_tokens, 200);
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.llm.max_concurrency, 100);
        assert_eq!(config.llm.app_url, "https://your-app.com");
        assert!((config.pricing.price_per_request - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.api_key(), Some("sk-or-env-key"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn client_settings_follow_llm_section() {
        let tmp = temp_base("dv_config_client_settings");
        patch_validator(&tmp, "timeout_secs = 30", "timeout_secs = 7");
        let config = load_config_from(&tmp, with_key()).unwrap();

        let settings = config.client_settings().unwrap();
        assert_eq!(settings.api_key, "sk-or-env-key");
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert_eq!(settings.max_concurrency, 100);
        assert_eq!(settings.model, config.llm.model);
        assert_eq!(settings.app_url, "https://your-app.com");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_supplies_api_key() {
        let tmp = temp_base("dv_config_with_creds");
        fs::write(
            tmp.join("config/credentials.toml"),
            "openrouter_api_key = \"sk-or-file-key\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp, env_from(&[])).expect("should load with credentials");
        assert_eq!(config.api_key(), Some("sk-or-file-key"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn env_api_key_overrides_credentials_file() {
        let tmp = temp_base("dv_config_env_wins");
        fs::write(
            tmp.join("config/credentials.toml"),
            "openrouter_api_key = \"sk-or-file-key\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp, with_key()).unwrap();
        assert_eq!(config.api_key(), Some("sk-or-env-key"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let tmp = temp_base("dv_config_no_key");
        let err = load_config_from(&tmp, env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey), "got: {err}");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let tmp = temp_base("dv_config_empty_key");
        fs::write(tmp.join("config/credentials.toml"), "openrouter_api_key = \"\"\n").unwrap();
        let err = load_config_from(&tmp, env_from(&[(API_KEY_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey), "got: {err}");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn port_and_app_url_env_overrides() {
        let tmp = temp_base("dv_config_port_env");
        let env = env_from(&[
            (API_KEY_ENV, "k"),
            (PORT_ENV, "9090"),
            (APP_URL_ENV, "https://agents.example.com"),
        ]);
        let config = load_config_from(&tmp, env).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.llm.app_url, "https://agents.example.com");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unparseable_port_env() {
        let tmp = temp_base("dv_config_bad_port");
        let err =
            load_config_from(&tmp, env_from(&[(API_KEY_ENV, "k"), (PORT_ENV, "eighty")]))
                .unwrap_err();
        expect_validation_field(err, "PORT");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_port_zero() {
        let tmp = temp_base("dv_config_port_zero");
        let err = load_config_from(&tmp, env_from(&[(API_KEY_ENV, "k"), (PORT_ENV, "0")]))
            .unwrap_err();
        expect_validation_field(err, "server.port");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let tmp = temp_base("dv_config_temperature");
        patch_validator(&tmp, "temperature = 0.1", "temperature = 2.5");
        let err = load_config_from(&tmp, with_key()).unwrap_err();
        expect_validation_field(err, "llm.temperature");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let tmp = temp_base("dv_config_zero_tokens");
        patch_validator(&tmp, "max_tokens = 200", "max_tokens = 0");
        let err = load_config_from(&tmp, with_key()).unwrap_err();
        expect_validation_field(err, "llm.max_tokens");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let tmp = temp_base("dv_config_zero_concurrency");
        patch_validator(&tmp, "max_concurrency = 100", "max_concurrency = 0");
        let err = load_config_from(&tmp, with_key()).unwrap_err();
        expect_validation_field(err, "llm.max_concurrency");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_negative_price() {
        let tmp = temp_base("dv_config_negative_price");
        patch_validator(&tmp, "price_per_request = 0.10", "price_per_request = -1.0");
        let err = load_config_from(&tmp, with_key()).unwrap_err();
        expect_validation_field(err, "pricing.price_per_request");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_validator_toml() {
        let tmp = std::env::temp_dir().join("dv_config_missing_validator");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp, with_key()).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("validator.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_base("dv_config_invalid_toml");
        fs::write(tmp.join("config/validator.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&tmp, with_key()).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("validator.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_credentials() {
        let tmp = temp_base("dv_config_invalid_creds");
        fs::write(tmp.join("config/credentials.toml"), "openrouter_api_key = 42\n").unwrap();

        let err = load_config_from(&tmp, with_key()).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("credentials.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("dv_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::copy(
            project_root().join("defaults/validator.toml"),
            defaults_dir.join("validator.toml"),
        )
        .unwrap();
        fs::write(
            defaults_dir.join("credentials.toml.example"),
            "openrouter_api_key = \"sk-or-...\"\n",
        )
        .unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/validator.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("dv_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();
        fs::copy(
            project_root().join("defaults/validator.toml"),
            defaults_dir.join("validator.toml"),
        )
        .unwrap();
        fs::write(config_dir.join("validator.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        let content = fs::read_to_string(config_dir.join("validator.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_ignores_subdirectories_and_sorts() {
        let tmp = std::env::temp_dir().join("dv_config_ensure_subdirs");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(defaults_dir.join("nested")).unwrap();
        fs::write(defaults_dir.join("nested/extra.toml"), "x = 1\n").unwrap();
        fs::write(defaults_dir.join("b.toml"), "b = 1\n").unwrap();
        fs::write(defaults_dir.join("a.toml"), "a = 1\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(
            copied,
            vec![tmp.join("config/a.toml"), tmp.join("config/b.toml")]
        );
        assert!(!tmp.join("config/nested").exists());
        assert_eq!(
            fs::read_to_string(tmp.join("config/b.toml")).unwrap(),
            "b = 1\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_no_defaults_dir_is_ok() {
        let tmp = std::env::temp_dir().join("dv_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("dv_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
