use serde::{Deserialize, Serialize};
use std::env;

pub const LOCAL_API_BASE_URL: &str = "http://localhost:5000";
pub const DEPLOYED_API_BASE_URL: &str = "https://gt-cal.onrender.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where the sync layer sends its remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    /// `API_BASE_URL` wins; otherwise `GT_CAL_ENV=production` picks the
    /// deployed backend and anything else the local one.
    pub fn resolve(base_url: Option<String>, environment: Option<&str>) -> Self {
        let base_url = match base_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if environment == Some("production") => DEPLOYED_API_BASE_URL.to_string(),
            None => LOCAL_API_BASE_URL.to_string(),
        };
        Self { base_url }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = env::var("GT_CAL_ENV").ok();

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/gt_cal.db".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .or_else(|_| env::var("PORT"))
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .unwrap_or(5000),
            },
            api: ApiConfig::resolve(env::var("API_BASE_URL").ok(), environment.as_deref()),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url_selection() {
        assert_eq!(ApiConfig::resolve(None, None).base_url, LOCAL_API_BASE_URL);
        assert_eq!(
            ApiConfig::resolve(None, Some("production")).base_url,
            DEPLOYED_API_BASE_URL
        );
        assert_eq!(
            ApiConfig::resolve(Some("http://10.0.0.2:8080/".to_string()), Some("production"))
                .base_url,
            "http://10.0.0.2:8080"
        );
        assert_eq!(
            ApiConfig::resolve(Some("  ".to_string()), None).base_url,
            LOCAL_API_BASE_URL
        );
    }
}
