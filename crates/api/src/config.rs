//! Configuration loading and validation.
//!
//! Service-level settings come from environment variables. Each downstream
//! integration is configured by its own YAML file in `CONFIG_DIR`; an absent
//! file disables that integration, a malformed one stops startup.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Per-request timeout used when `REQUEST_TIMEOUT_SECS` is unset.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP(S) listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,

    /// Port the HTTP(S) listener binds to.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Tokio worker threads. Defaults to the number of CPUs.
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// PEM-encoded certificate chain. TLS is enabled when this and
    /// `tls_key_path` are both set.
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,

    /// PEM-encoded private key matching `tls_cert_path`.
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,

    /// Directory holding the integration YAML files.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// HS256 secret for access and refresh tokens. Required when the auth
    /// integration is enabled.
    #[serde(default)]
    pub jwt_secret_key: Option<String>,

    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: i64,

    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_secs: i64,

    /// How often (seconds) to reload the access-file allow-list.
    #[serde(default = "default_allowlist_refresh_interval")]
    pub allowlist_refresh_interval_secs: u64,

    /// Per-request timeout applied to every route.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_listen_addr() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}
fn default_listen_port() -> u16 {
    8000
}
fn default_config_dir() -> PathBuf {
    PathBuf::from("configs")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_access_token_ttl() -> i64 {
    3600
}
fn default_refresh_token_ttl() -> i64 {
    30 * 24 * 3600
}
fn default_allowlist_refresh_interval() -> u64 {
    300
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Socket address the listener binds to.
    pub fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }

    /// Certificate and key paths, when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together");
        }
        if self.worker_threads == Some(0) {
            anyhow::bail!("WORKER_THREADS must be > 0");
        }
        if self.access_token_ttl_secs <= 0 {
            anyhow::bail!("ACCESS_TOKEN_TTL_SECS must be > 0");
        }
        if self.refresh_token_ttl_secs <= self.access_token_ttl_secs {
            anyhow::bail!("REFRESH_TOKEN_TTL_SECS must be greater than ACCESS_TOKEN_TTL_SECS");
        }
        if self.allowlist_refresh_interval_secs == 0 {
            anyhow::bail!("ALLOWLIST_REFRESH_INTERVAL_SECS must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }

    /// Return the JWT secret, failing when it is missing or blank.
    pub fn require_jwt_secret(&self) -> Result<&str> {
        match self.jwt_secret_key.as_deref() {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => anyhow::bail!("JWT_SECRET_KEY is required when auth.yml is present"),
        }
    }
}

// ---------------------------------------------------------------------------
// Integration files
// ---------------------------------------------------------------------------

/// MySQL connection settings shared by every database-backed integration.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub address: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

fn default_mysql_port() -> u16 {
    3306
}

impl DatabaseConfig {
    /// Connection URL for sea-orm. Credentials are percent-encoded.
    pub fn url(&self) -> Result<String> {
        let mut url = url::Url::parse(&format!(
            "mysql://{}:{}/{}",
            self.address, self.port, self.database
        ))
        .with_context(|| format!("invalid database address {:?}", self.address))?;
        url.set_username(&self.username)
            .map_err(|_| anyhow::anyhow!("database username cannot be encoded"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| anyhow::anyhow!("database password cannot be encoded"))?;
        Ok(url.into())
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

/// `oai.yml`: metadata database plus repository identity.
#[derive(Debug, Clone, Deserialize)]
pub struct OaiConfig {
    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(default = "default_repository_name")]
    pub repository_name: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Prefix joined with a derivate file path to build public file URLs.
    #[serde(default = "default_accessfile_base_url")]
    pub accessfile_base_url: String,
}

fn default_repository_name() -> String {
    "SLS/Arkiva".into()
}
fn default_admin_email() -> String {
    "is@sls.fi".into()
}
fn default_accessfile_base_url() -> String {
    "http://api.sls.fi/accessfiles/".into()
}

/// `swift_auth.yml`: Swift v1 auth endpoint and the allow-list location.
#[derive(Clone, Deserialize)]
pub struct SwiftConfig {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    /// Relative paths are resolved against `CONFIG_DIR`.
    #[serde(default = "default_allowlist_path")]
    pub allowlist_path: PathBuf,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_allowlist_path() -> PathBuf {
    PathBuf::from("derivate_objects_list.txt")
}

impl std::fmt::Debug for SwiftConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiftConfig")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("allowlist_path", &self.allowlist_path)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// `filemaker.yml`: FileMaker Server REST base URL.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMakerConfig {
    pub base_url: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// One project entry of `digital_editions.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub show_unpublished: bool,
    #[serde(default)]
    pub show_internally_published: bool,
    #[serde(default)]
    pub disabled_publications: Vec<i64>,
    /// Root of the project's `html/`, `xml/` and `cache/` trees.
    /// Defaults to `<project>-required`.
    #[serde(default)]
    pub file_root: Option<PathBuf>,
}

impl ProjectConfig {
    /// Minimum `ed_lansering` value visible under this project's settings.
    pub fn publish_level(&self) -> i64 {
        if self.show_unpublished {
            0
        } else if self.show_internally_published {
            1
        } else {
            2
        }
    }
}

/// `digital_editions.yml`: one entry per project plus XSLT settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EditionsConfig {
    #[serde(default = "default_xslt_dir")]
    pub xslt_dir: PathBuf,
    #[serde(default = "default_xsltproc")]
    pub xsltproc: PathBuf,
    #[serde(flatten)]
    pub projects: HashMap<String, ProjectConfig>,
}

fn default_xslt_dir() -> PathBuf {
    PathBuf::from("xslt")
}
fn default_xsltproc() -> PathBuf {
    PathBuf::from("xsltproc")
}

/// Name of the project entry holding the semantic-data database.
pub const SEMANTIC_DATA: &str = "semantic_data";

/// All integration settings found in `CONFIG_DIR`.
#[derive(Debug, Clone, Default)]
pub struct Integrations {
    pub oai: Option<OaiConfig>,
    pub swift: Option<SwiftConfig>,
    pub filemaker: Option<FileMakerConfig>,
    pub editions: Option<EditionsConfig>,
    pub auth: Option<DatabaseConfig>,
}

impl Integrations {
    /// Read every known integration file from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        let oai = match read_optional::<OaiConfig>(&dir.join("oai.yml"))? {
            Some(c) => Some(c),
            None => read_optional(&dir.join("mysql.yml"))?,
        };

        let mut swift = read_optional::<SwiftConfig>(&dir.join("swift_auth.yml"))?;
        if let Some(s) = swift.as_mut() {
            if s.allowlist_path.is_relative() {
                s.allowlist_path = dir.join(&s.allowlist_path);
            }
        }

        let filemaker = read_optional::<FileMakerConfig>(&dir.join("filemaker.yml"))?;
        if let Some(fm) = &filemaker {
            url::Url::parse(&fm.base_url)
                .with_context(|| format!("filemaker.yml: invalid base_url {:?}", fm.base_url))?;
        }

        let editions = read_optional(&dir.join("digital_editions.yml"))?;
        let auth = read_optional(&dir.join("auth.yml"))?;

        Ok(Self {
            oai,
            swift,
            filemaker,
            editions,
            auth,
        })
    }

    /// Names of the enabled integrations, in route order.
    pub fn enabled(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.oai.is_some() {
            names.push("oai".to_owned());
        }
        if self.swift.is_some() {
            names.push("accessfiles".to_owned());
        }
        if self.filemaker.is_some() {
            names.push("filemaker".to_owned());
        }
        if self.editions.is_some() {
            names.push("digitaledition".to_owned());
        }
        if self.auth.is_some() {
            names.push("auth".to_owned());
        }
        names
    }
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(parsed))
}
