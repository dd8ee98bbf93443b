//! Batching options passed to a consumer as a string-keyed map.

use std::collections::HashMap;
use std::time::Duration;

use crate::defaults::{
    BATCH_SIZE_OPT, BATCH_THRESHOLD_MS_OPT, DEFAULT_BATCH_SIZE, DEFAULT_BATCH_THRESHOLD_MS,
    FLUSH_ON_SHUTDOWN_OPT,
};
use crate::error::{ConfigError, ConfigResult};

/// Flush policy for one partition's batching consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Buffered entry count that forces a flush.
    pub batch_size: usize,
    /// Longest time a partial batch may wait before a timer flush.
    pub batch_threshold: Duration,
    /// Flush buffered entries on shutdown instead of discarding them.
    pub flush_on_shutdown: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_threshold: Duration::from_millis(DEFAULT_BATCH_THRESHOLD_MS),
            flush_on_shutdown: false,
        }
    }
}

impl BatchOptions {
    /// Parse options from a consumer start-up map; absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] when a value is malformed or
    /// out of range.
    pub fn from_options(options: &HashMap<String, String>) -> ConfigResult<Self> {
        let defaults = Self::default();

        let batch_size = match options.get(BATCH_SIZE_OPT) {
            Some(value) => parse_positive(BATCH_SIZE_OPT, value)
                .and_then(|size| usize::try_from(size).map_err(|_| too_large(BATCH_SIZE_OPT, value)))?,
            None => defaults.batch_size,
        };
        let batch_threshold = match options.get(BATCH_THRESHOLD_MS_OPT) {
            Some(value) => Duration::from_millis(parse_positive(BATCH_THRESHOLD_MS_OPT, value)?),
            None => defaults.batch_threshold,
        };
        let flush_on_shutdown = match options.get(FLUSH_ON_SHUTDOWN_OPT) {
            Some(value) => parse_flag(FLUSH_ON_SHUTDOWN_OPT, value)?,
            None => defaults.flush_on_shutdown,
        };

        Ok(Self {
            batch_size,
            batch_threshold,
            flush_on_shutdown,
        })
    }

    /// Render the options back into the start-up map form.
    #[must_use]
    pub fn to_options(&self) -> HashMap<String, String> {
        HashMap::from([
            (BATCH_SIZE_OPT.to_string(), self.batch_size.to_string()),
            (
                BATCH_THRESHOLD_MS_OPT.to_string(),
                self.batch_threshold.as_millis().to_string(),
            ),
            (
                FLUSH_ON_SHUTDOWN_OPT.to_string(),
                self.flush_on_shutdown.to_string(),
            ),
        ])
    }
}

fn parse_positive(option: &'static str, value: &str) -> ConfigResult<u64> {
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidOption {
            option,
            value: value.to_string(),
            reason: "not_an_integer",
        })?;
    if parsed == 0 {
        return Err(ConfigError::InvalidOption {
            option,
            value: value.to_string(),
            reason: "must_be_positive",
        });
    }
    Ok(parsed)
}

fn parse_flag(option: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidOption {
            option,
            value: value.to_string(),
            reason: "not_a_boolean",
        }),
    }
}

fn too_large(option: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidOption {
        option,
        value: value.to_string(),
        reason: "out_of_range",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn empty_map_yields_defaults() {
        let parsed = BatchOptions::from_options(&HashMap::new()).expect("defaults");
        assert_eq!(parsed.batch_size, 10);
        assert_eq!(parsed.batch_threshold, Duration::from_millis(200));
        assert!(!parsed.flush_on_shutdown);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let parsed = BatchOptions::from_options(&options(&[
            ("batchSize", "250"),
            ("batchThresholdMs", " 1500 "),
            ("flushOnShutdown", "TRUE"),
        ]))
        .expect("valid options");
        assert_eq!(parsed.batch_size, 250);
        assert_eq!(parsed.batch_threshold, Duration::from_millis(1_500));
        assert!(parsed.flush_on_shutdown);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = BatchOptions::from_options(&options(&[("batchSize", "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidOption {
                option: "batchSize",
                value: "ten".to_string(),
                reason: "not_an_integer",
            }
        );

        let err = BatchOptions::from_options(&options(&[("batchThresholdMs", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOption {
                reason: "must_be_positive",
                ..
            }
        ));

        let err = BatchOptions::from_options(&options(&[("flushOnShutdown", "maybe")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOption {
                option: "flushOnShutdown",
                ..
            }
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let parsed = BatchOptions::from_options(&options(&[("retries", "3")])).expect("parse");
        assert_eq!(parsed, BatchOptions::default());
    }

    #[test]
    fn options_render_back_to_map() {
        let original = BatchOptions {
            batch_size: 3,
            batch_threshold: Duration::from_millis(50),
            flush_on_shutdown: true,
        };
        let reparsed = BatchOptions::from_options(&original.to_options()).expect("parse");
        assert_eq!(reparsed, original);
    }
}
