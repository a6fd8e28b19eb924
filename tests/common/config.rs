//! Test configuration helpers for mock servers and live credentials

use now_playing::Config;
use wiremock::MockServer;

/// API key the mock server expects
pub const TEST_API_KEY: &str = "test-key";

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Config pointing both the listing source and the image host at `server`
///
/// Listing requests go to `{uri}/3/movie/...`, posters to `{uri}/t/p/w500/...`.
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.source.base_url = format!("{}/3", server.uri());
    config.source.api_key = TEST_API_KEY.to_string();
    config.assets.image_base_url = format!("{}/t/p/w500", server.uri());
    config
}

/// Load the TMDB API key from the environment (or `.env`)
///
/// Required environment variables:
/// - `TMDB_API_KEY` - v3 API key
pub fn load_api_key() -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();

    std::env::var("TMDB_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ConfigError("TMDB_API_KEY not set in environment".to_string()))
}

/// Config for the real TMDB service
///
/// Optional environment variables:
/// - `TMDB_LANGUAGE` - listing language (default: ko-KR)
/// - `TMDB_REGION` - listing region (default: KR)
pub fn live_config() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    config.source.api_key = load_api_key()?;
    if let Ok(language) = std::env::var("TMDB_LANGUAGE") {
        config.source.language = language;
    }
    if let Ok(region) = std::env::var("TMDB_REGION") {
        config.source.region = region;
    }
    Ok(config)
}

/// Check whether live credentials are available
pub fn has_live_credentials() -> bool {
    load_api_key().is_ok()
}

/// Skip test if live credentials are not available
#[macro_export]
macro_rules! skip_if_no_credentials {
    () => {
        if !$crate::common::has_live_credentials() {
            eprintln!("Skipping test: TMDB_API_KEY not found in .env");
            return;
        }
    };
}
