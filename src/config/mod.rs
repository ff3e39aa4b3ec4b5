use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub client_ip: ClientIpConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Lifetime applied when a request gives no usable validity
    pub default_validity_minutes: i64,
    /// Generated-code attempts before giving up with `Exhausted`
    pub max_generation_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_validity_minutes: 30,
            max_generation_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    #[default]
    None,
    Standard,
    Cloudflare,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientIpConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
    /// Proxy ranges skipped when walking `X-Forwarded-For`
    pub trusted_proxies: Vec<IpNet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed browser origins. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "memory".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "memory" | "mem" => DatabaseBackend::Memory,
            "sqlite" => DatabaseBackend::Sqlite,
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'memory'. Supported values: memory, sqlite, postgres"
                );
                DatabaseBackend::Memory
            }
        };

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if backend == DatabaseBackend::Postgres => {
                anyhow::bail!("DATABASE_URL must be set when DATABASE_BACKEND=postgres")
            }
            Err(_) => "sqlite://./clipr.db".to_string(),
        };

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let defaults = RegistryConfig::default();
        let default_validity_minutes = std::env::var("DEFAULT_VALIDITY_MINUTES")
            .ok()
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("DEFAULT_VALIDITY_MINUTES must be an integer")?
            .filter(|minutes| *minutes > 0)
            .unwrap_or(defaults.default_validity_minutes);
        let max_generation_attempts = std::env::var("MAX_GENERATION_ATTEMPTS")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("MAX_GENERATION_ATTEMPTS must be a positive integer")?
            .filter(|attempts| *attempts > 0)
            .unwrap_or(defaults.max_generation_attempts);

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = parse_list(&std::env::var("TRUSTED_PROXIES").unwrap_or_default())
            .into_iter()
            .map(|cidr| {
                cidr.parse::<IpNet>()
                    .with_context(|| format!("invalid CIDR in TRUSTED_PROXIES: {cidr}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let allowed_origins = parse_list(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default())
            .into_iter()
            .filter(|origin| origin != "*")
            .collect();

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            registry: RegistryConfig {
                default_validity_minutes,
                max_generation_attempts,
            },
            client_ip: ClientIpConfig {
                trusted_proxy_mode,
                trusted_proxies,
            },
            cors: CorsConfig { allowed_origins },
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
