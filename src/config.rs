use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, Result};

pub const SECRET_ENV: &str = "AUTH_COOKIE_SECRET";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub data: DataConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub seed_path: Option<PathBuf>,
}

/// 缓存窗口，单位秒
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub resource_max_age: u64,
    pub resource_stale_while_revalidate: u64,
    pub page_max_age: u64,
    pub page_stale_while_revalidate: u64,
    pub detail_max_age: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resource_max_age: 5,
            resource_stale_while_revalidate: 10,
            page_max_age: 3600,                       // 1 hour
            page_stale_while_revalidate: 3600 * 24 * 7, // 1 week
            detail_max_age: 10,
        }
    }
}

impl Config {
    /// 读取 `CONFIG_PATH` 指向的 TOML 文件，否则使用默认配置；
    /// `AUTH_COOKIE_SECRET` 环境变量覆盖文件中的 secret
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CONFIG_PATH").ok();
        let secret = std::env::var(SECRET_ENV).ok();
        Self::load_from(config_path.as_deref().map(Path::new), secret)
    }

    pub fn load_from(config_path: Option<&Path>, secret_override: Option<String>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                Self::from_file(path)?
            }
            None => {
                info!("CONFIG_PATH not set, using default configuration");
                Self::default()
            }
        };

        if let Some(secret) = secret_override {
            debug!("Cookie secret taken from {}", SECRET_ENV);
            config.auth.cookie_secret = Some(secret);
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// 启动时校验一次，缺少 cookie secret 直接失败
    pub fn validate(&self) -> Result<()> {
        self.cookie_secret()?;
        self.bind_addr()?;
        Ok(())
    }

    pub fn cookie_secret(&self) -> Result<&str> {
        match self.auth.cookie_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(AppError::Config(format!("Missing env: {}", SECRET_ENV))),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid server address: {}", e)))
    }
}
