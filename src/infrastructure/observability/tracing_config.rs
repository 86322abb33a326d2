/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub level: String,
    pub json_format: bool,
    pub verbose: bool,
}

impl TracingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        if self.verbose {
            format!("{},docqa=debug", self.level)
        } else {
            format!("{},docqa={}", self.level, self.level)
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()),
            level: std::env::var("LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|_| "info".to_string()),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
            verbose: false,
        }
    }
}
