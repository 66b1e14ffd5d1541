use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub vision_base_url: String,
    pub vision_api_key: String,
    pub vision_model: String,
    pub vision_timeout_secs: u64,
    pub report_dir: String,
    pub max_upload_bytes: usize,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            vision_base_url: std::env::var("VISION_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            vision_api_key: std::env::var("VISION_API_KEY")
                .map_err(|_| anyhow::anyhow!("VISION_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("VISION_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            vision_model: std::env::var("VISION_MODEL")
                .unwrap_or_else(|_| "gpt-4o".to_string()),
            vision_timeout_secs: std::env::var("VISION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "90".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("VISION_TIMEOUT_SECS must be a number of seconds"))?,
            report_dir: {
                let dir = std::env::var("REPORT_DIR").unwrap_or_else(|_| "reports".to_string());
                if dir.trim().is_empty() {
                    anyhow::bail!("REPORT_DIR cannot be empty");
                }
                dir
            },
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_BYTES must be a byte count"))
                .and_then(|bytes: usize| {
                    if bytes == 0 {
                        anyhow::bail!("MAX_UPLOAD_BYTES cannot be zero");
                    }
                    Ok(bytes)
                })?,
            cache_ttl_secs: std::env::var("EXTRACTION_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("EXTRACTION_CACHE_TTL_SECS must be a number of seconds")
                })?,
            cache_max_entries: std::env::var("EXTRACTION_CACHE_MAX_ENTRIES")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("EXTRACTION_CACHE_MAX_ENTRIES must be a number")
                })?,
        };

        if !config.vision_base_url.starts_with("http://")
            && !config.vision_base_url.starts_with("https://")
        {
            anyhow::bail!("VISION_BASE_URL must start with http:// or https://");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Vision base URL: {}", config.vision_base_url);
        tracing::debug!("Vision model: {}", config.vision_model);
        tracing::debug!("Report directory: {}", config.report_dir);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
