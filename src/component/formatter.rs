use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use serde::Deserialize;
use validator::Validate;

use crate::core::error::AppResult;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "formatter";

pub fn create_formatter_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: FormatterConfig = parse_options(cfg, COMPONENT_TYPE)?;
    config
        .validate()
        .map_err(|e| crate::config_error!("invalid `{COMPONENT_TYPE}` component options: {e}"))?;

    Ok(Arc::new(Formatter { config }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
struct FormatterConfig {
    #[validate(length(min = 1))]
    decimal_separator: String,
    thousand_separator: String,
    #[validate(length(min = 1))]
    date_format: String,
    #[validate(length(min = 1))]
    datetime_format: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            decimal_separator: ".".to_string(),
            thousand_separator: ",".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

/// Locale-aware number and date formatting.
pub struct Formatter {
    config: FormatterConfig,
}

impl Formatter {
    /// Format a number with the configured separators and a fixed number
    /// of decimals.
    pub fn format_number(&self, value: f64, decimals: usize) -> String {
        let formatted = format!("{value:.decimals$}");
        let (sign, unsigned) = match formatted.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", formatted.as_str()),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (unsigned, None),
        };

        let mut grouped = String::new();
        let digits: Vec<char> = int_part.chars().collect();
        for (i, digit) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push_str(&self.config.thousand_separator);
            }
            grouped.push(*digit);
        }

        match frac_part {
            Some(frac) => format!("{sign}{grouped}{}{frac}", self.config.decimal_separator),
            None => format!("{sign}{grouped}"),
        }
    }

    pub fn format_date<Tz: TimeZone>(&self, value: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        value.format(&self.config.date_format).to_string()
    }

    pub fn format_datetime<Tz: TimeZone>(&self, value: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        value.format(&self.config.datetime_format).to_string()
    }
}

impl ApplicationComponent for Formatter {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
