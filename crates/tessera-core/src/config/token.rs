//! Token issuance defaults.

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Defaults applied when issuing tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Lifetime of newly issued tokens (e.g., "1h", "30m", "7d").
    #[serde(default = "default_lifetime")]
    pub default_lifetime: String,

    /// Authentication methods reported for validated tokens.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            default_lifetime: default_lifetime(),
            methods: default_methods(),
        }
    }
}

impl TokenConfig {
    /// Parse `default_lifetime` into a duration.
    pub fn lifetime(&self) -> Result<chrono::Duration, ConfigError> {
        parse_duration(&self.default_lifetime)
    }
}

/// Parse a duration string like "24h", "7d", "15m" or "30s".
///
/// A bare number is read as hours.
pub fn parse_duration(s: &str) -> Result<chrono::Duration, ConfigError> {
    let s = s.trim().to_lowercase();
    let invalid = |reason: String| ConfigError::InvalidDuration {
        value: s.clone(),
        reason,
    };

    let (digits, unit): (&str, fn(i64) -> Option<chrono::Duration>) =
        if let Some(days) = s.strip_suffix('d') {
            (days, chrono::Duration::try_days)
        } else if let Some(hours) = s.strip_suffix('h') {
            (hours, chrono::Duration::try_hours)
        } else if let Some(minutes) = s.strip_suffix('m') {
            (minutes, chrono::Duration::try_minutes)
        } else if let Some(seconds) = s.strip_suffix('s') {
            (seconds, chrono::Duration::try_seconds)
        } else {
            (s.as_str(), chrono::Duration::try_hours)
        };

    let amount: i64 = digits.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if amount <= 0 {
        return Err(invalid("must be positive".to_string()));
    }
    unit(amount).ok_or_else(|| invalid("out of range".to_string()))
}

fn default_lifetime() -> String {
    "1h".to_string()
}

fn default_methods() -> Vec<String> {
    vec!["password".to_string(), "token".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s").unwrap(), chrono::Duration::seconds(30));
        assert_eq!(parse_duration("15m").unwrap(), chrono::Duration::minutes(15));
        assert_eq!(parse_duration("24H").unwrap(), chrono::Duration::hours(24));
        assert_eq!(parse_duration("7d").unwrap(), chrono::Duration::days(7));
        assert_eq!(parse_duration("2").unwrap(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("0h").is_err());
        assert!(parse_duration("-5m").is_err());
    }
}
