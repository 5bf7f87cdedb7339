//! Logging utilities and configuration for sheet-schema.
//!
//! Pipeline code logs through `tracing`. [`LogConfig`] decides how chatty the
//! link and decode paths are; [`setup`] wires a `tracing-subscriber` for the
//! server binary.

use tracing::Level;

/// Runtime logging knobs consulted by the pipeline.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for sheet-schema components
    pub base_level: Level,
    /// Whether to log every individual link decision (stage hits, boosts)
    pub log_link_decisions: bool,
    /// Whether to log decode operations
    pub log_decode_operations: bool,
    /// Maximum length for logged field values (file names, SQL, previews)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_link_decisions: false,
            log_decode_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Everything on, long fields.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_link_decisions: true,
            log_decode_operations: true,
            max_field_length: 1024,
        }
    }

    /// Warnings only.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_link_decisions: false,
            log_decode_operations: false,
            max_field_length: 128,
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }

    /// Subscriber settings with `sheet_schema` targets at [`base_level`](Self::base_level).
    pub fn subscriber_config(&self) -> setup::LoggingConfig {
        setup::LoggingConfig::default().with_crate_level(self.base_level)
    }
}

/// Debug logging for a single link decision, gated on
/// [`LogConfig::log_link_decisions`].
#[macro_export]
macro_rules! log_link_decision {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_link_decisions {
            tracing::debug!($($arg)*);
        }
    };
}

/// Info logging for decode operations, gated on
/// [`LogConfig::log_decode_operations`].
#[macro_export]
macro_rules! log_decode_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_decode_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed, on a character
/// boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup for binaries.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything outside this crate
        pub level: Level,
        /// Log level for `sheet_schema` targets
        pub crate_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},sheet_schema={}",
                    self.level.as_str().to_lowercase(),
                    self.crate_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs the global subscriber. `RUST_LOG` wins over the configured
    /// filter when set.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use sheet_schema::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
