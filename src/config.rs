use std::env;

#[derive(Clone)]
pub struct Config {
    pub catalog_base_url: String,
    pub catalog_api_key: Option<String>,
    pub backend_url: String,
    pub backend_anon_key: String,
    pub token_proxy_url: String,
    pub streaming_api_url: String,
    pub streaming_accounts_url: String,
    pub streaming_client_id: Option<String>,
    pub streaming_client_secret: Option<String>,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            catalog_base_url: env::var("CATALOG_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/books/v1/volumes".to_string()),
            catalog_api_key: env::var("CATALOG_API_KEY").ok(),
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:54321".to_string()),
            backend_anon_key: env::var("BACKEND_ANON_KEY").unwrap_or_default(),
            token_proxy_url: env::var("TOKEN_PROXY_URL")
                .unwrap_or_else(|_| "http://localhost:5000/spotify-token".to_string()),
            streaming_api_url: env::var("STREAMING_API_URL")
                .unwrap_or_else(|_| "https://api.spotify.com/v1".to_string()),
            streaming_accounts_url: env::var("STREAMING_ACCOUNTS_URL")
                .unwrap_or_else(|_| "https://accounts.spotify.com".to_string()),
            streaming_client_id: env::var("SPOTIFY_CLIENT_ID").ok(),
            streaming_client_secret: env::var("SPOTIFY_CLIENT_SECRET").ok(),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_env_is_empty() {
        unsafe {
            env::remove_var("CATALOG_BASE_URL");
            env::remove_var("CATALOG_API_KEY");
            env::remove_var("PORT");
            env::remove_var("CORS_ALLOWED_ORIGINS");
        }

        let config = Config::from_env();
        assert_eq!(
            config.catalog_base_url,
            "https://www.googleapis.com/books/v1/volumes"
        );
        assert!(config.catalog_api_key.is_none());
        assert_eq!(config.port, 5000);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    #[serial]
    fn env_overrides_and_cors_list_splits() {
        unsafe {
            env::set_var("CATALOG_BASE_URL", "http://localhost:9090/volumes");
            env::set_var("PORT", "8123");
            env::set_var(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:5173, http://localhost:3000",
            );
        }

        let config = Config::from_env();
        assert_eq!(config.catalog_base_url, "http://localhost:9090/volumes");
        assert_eq!(config.port, 8123);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );

        unsafe {
            env::remove_var("CATALOG_BASE_URL");
            env::remove_var("PORT");
            env::remove_var("CORS_ALLOWED_ORIGINS");
        }
    }
}
