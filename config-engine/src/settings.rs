use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Complete registry process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// TCP port on which the single TLS listener accepts connections
    pub port: u16,
    /// Main domain name by which the registry is reached
    pub primary_domain: Option<String>,
    pub tls: TlsConfig,
    pub identity: IdentityConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Server certificate material, either inline PEM or file paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert_pem: Option<String>,
    pub key_pem: Option<String>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
}

/// Identity service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// URL of the identity service, e.g. `https://identity.hooklift.io:443`
    pub address: String,
    /// OAuth2 client identifier assigned to the registry by the identity service
    pub client_id: String,
    /// Trust root for the identity connection; the server certificate when unset
    pub ca_cert_pem: Option<String>,
    pub verify_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the http-only cookie carrying the access token of browser sessions
    pub session_cookie: String,
    /// Holding any one of these scopes allows publishing and unpublishing
    pub privileged_scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// JSON path that must reach the static handler instead of the gateway
    pub static_exception_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Filesystem,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Root directory of the filesystem backend
    pub root: PathBuf,
    /// Bucket where all published plugin packages are stored
    pub s3_bucket: String,
    pub s3_region: String,
    /// Largest accepted upload request in bytes; unlimited when unset
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Directory holding the single page application bundle
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus scrape endpoint; metrics are only recorded when unset
    pub listen_address: Option<SocketAddr>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            port: 9001,
            primary_domain: None,
            tls: TlsConfig::default(),
            identity: IdentityConfig::default(),
            auth: AuthConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            client_id: String::new(),
            ca_cert_pem: None,
            verify_timeout_secs: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: "hatk".to_string(),
            privileged_scopes: vec!["admin".to_string(), "write".to_string(), "global".to_string()],
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            static_exception_path: "/lib/api.swagger.json".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Filesystem,
            root: PathBuf::from("./data/packages"),
            s3_bucket: "hooklift-lift-registry".to_string(),
            s3_region: "us-east-1".to_string(),
            max_upload_bytes: None,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("./ui/public"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RegistryConfig {
    /// Domain the registry is reached at, `localhost:<port>` when unset
    pub fn primary_domain(&self) -> String {
        self.primary_domain
            .clone()
            .unwrap_or_else(|| format!("localhost:{}", self.port))
    }

    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Trust root used when dialing the identity service
    ///
    /// # Errors
    /// Fails when no inline CA is configured and the server certificate cannot be read.
    pub fn identity_ca_pem(&self) -> Result<String> {
        match &self.identity.ca_cert_pem {
            Some(pem) => Ok(pem.clone()),
            None => self.tls.certificate_pem(),
        }
    }
}

impl TlsConfig {
    /// # Errors
    /// Fails when neither `cert_pem` nor a readable `cert_file` is configured.
    pub fn certificate_pem(&self) -> Result<String> {
        read_material(self.cert_pem.as_ref(), self.cert_file.as_deref(), "certificate")
    }

    /// # Errors
    /// Fails when neither `key_pem` nor a readable `key_file` is configured.
    pub fn private_key_pem(&self) -> Result<String> {
        read_material(self.key_pem.as_ref(), self.key_file.as_deref(), "private key")
    }

    pub fn is_configured(&self) -> bool {
        (self.cert_pem.is_some() || self.cert_file.is_some())
            && (self.key_pem.is_some() || self.key_file.is_some())
    }
}

fn read_material(inline: Option<&String>, file: Option<&Path>, what: &str) -> Result<String> {
    if let Some(pem) = inline {
        return Ok(pem.clone());
    }
    let path = file.ok_or_else(|| ConfigError::Validation(format!("no TLS {what} configured")))?;
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
