//! Duration parsing and formatting utilities

use std::time::Duration;

/// Parser for duration strings such as `2s`, `500ms` or `1m30s`
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeParser {
    /// Parse a duration string
    ///
    /// Accepts bare seconds (`2`, `1.5`) or one or more `<number><unit>` pairs
    /// with units `us`, `ms`, `s`, `m`, `h`. Returns `None` when malformed.
    pub fn parse_duration(&self, input: &str) -> Option<Duration> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(seconds) = input.parse::<f64>() {
            return Self::seconds(seconds);
        }

        let is_number = |c: char| c.is_ascii_digit() || c == '.';
        let mut total = 0.0;
        let mut rest = input;
        while !rest.is_empty() {
            let number_end = rest.find(|c: char| !is_number(c))?;
            if number_end == 0 {
                return None;
            }
            let value: f64 = rest[..number_end].parse().ok()?;

            let after = &rest[number_end..];
            let unit_end = after.find(is_number).unwrap_or(after.len());
            let factor = match &after[..unit_end] {
                "us" => 1e-6,
                "ms" => 1e-3,
                "s" => 1.0,
                "m" => 60.0,
                "h" => 3600.0,
                _ => return None,
            };

            total += value * factor;
            rest = &after[unit_end..];
        }

        Self::seconds(total)
    }

    /// Seconds with 4-decimal precision, as the backend expects for GOP
    pub fn format_seconds_4dp(&self, duration: Duration) -> String {
        format!("{:.4}", duration.as_secs_f64())
    }

    fn seconds(value: f64) -> Option<Duration> {
        Duration::try_from_secs_f64(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_seconds() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_duration("2"), Some(Duration::from_secs(2)));
        assert_eq!(parser.parse_duration("1.5"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_with_units() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parser.parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parser.parse_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parser.parse_duration("1h"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_duration(""), None);
        assert_eq!(parser.parse_duration("abc"), None);
        assert_eq!(parser.parse_duration("2x"), None);
        assert_eq!(parser.parse_duration("s"), None);
        assert_eq!(parser.parse_duration("-1"), None);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_duration("1e30"), None);
        assert_eq!(parser.parse_duration("99999999999999999999h"), None);
        assert_eq!(parser.parse_duration("inf"), None);
        assert_eq!(parser.parse_duration("NaN"), None);
    }

    #[test]
    fn test_format_four_decimals() {
        let parser = TimeParser::new();
        assert_eq!(parser.format_seconds_4dp(Duration::from_secs(2)), "2.0000");
        assert_eq!(parser.format_seconds_4dp(Duration::from_millis(1500)), "1.5000");
    }
}
