//! Structured logging setup built on tracing-subscriber

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug")
    pub level: String,
    /// Emit JSON structured logs instead of plain text
    pub json_format: bool,
    /// Pretty-print text output for development
    pub pretty_print: bool,
    /// Environment filter, e.g. "sockhub=debug,tokio_tungstenite=warn"
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Production configuration: JSON, info level
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            env_filter: Some("sockhub=info".to_string()),
        }
    }

    /// Development configuration: pretty text, debug level
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            env_filter: Some("sockhub=debug".to_string()),
        }
    }

    /// Test configuration: minimal output
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            env_filter: Some("sockhub=error".to_string()),
        }
    }

    /// Set the environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Initialize global logging for the application.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = config.env_filter.as_deref().unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(env_filter))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).json())
            .init();
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).pretty())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout))
            .init();
    }

    tracing::info!(
        target: "sockhub::logging",
        "Logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "JSON" } else { "text" }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(LoggingConfig::production().json_format);
        assert!(!LoggingConfig::development().json_format);
        assert_eq!(LoggingConfig::test().level, "error");
    }

    #[test]
    fn test_with_env_filter() {
        let config = LoggingConfig::default().with_env_filter("sockhub=trace");
        assert_eq!(config.env_filter.as_deref(), Some("sockhub=trace"));
    }
}
