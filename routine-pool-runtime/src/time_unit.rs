use std::time::Duration;

/// Time unit used when reading intervals from attributes and config files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn to_millis(&self, value: u64) -> u64 {
        match self {
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value.saturating_mul(1000),
            TimeUnit::Minutes => value.saturating_mul(60_000),
            TimeUnit::Hours => value.saturating_mul(3_600_000),
        }
    }

    /// Parse a duration string like "5s", "10m", "2h", "500ms"
    /// Returns (value, TimeUnit) if successful
    ///
    /// Suffixes are lowercase only and must follow the number directly.
    pub fn parse_duration(s: &str) -> Option<(u64, TimeUnit)> {
        let s = s.trim();

        let split_pos = s.find(|c: char| !c.is_ascii_digit())?;
        if split_pos == 0 {
            return None;
        }

        let (num_str, unit_str) = s.split_at(split_pos);
        let value = num_str.parse::<u64>().ok()?;

        let time_unit = match unit_str {
            "ms" => TimeUnit::Milliseconds,
            "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            _ => return None,
        };

        Some((value, time_unit))
    }
}

/// Parse shorthand ("250ms", "2s") or a plain number of milliseconds.
pub fn parse_interval(s: &str) -> Option<Duration> {
    if let Some((value, unit)) = TimeUnit::parse_duration(s) {
        return Some(Duration::from_millis(unit.to_millis(value)));
    }
    s.trim().parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_suffixes() {
        assert_eq!(TimeUnit::parse_duration("500ms"), Some((500, TimeUnit::Milliseconds)));
        assert_eq!(TimeUnit::parse_duration("2s"), Some((2, TimeUnit::Seconds)));
        assert_eq!(TimeUnit::parse_duration(" 3m "), Some((3, TimeUnit::Minutes)));
        assert_eq!(TimeUnit::parse_duration("1h"), Some((1, TimeUnit::Hours)));
        assert_eq!(TimeUnit::parse_duration("2S"), None);
        assert_eq!(TimeUnit::parse_duration("ms"), None);
        assert_eq!(TimeUnit::parse_duration("100"), None);
    }

    #[test]
    fn plain_numbers_are_milliseconds() {
        assert_eq!(parse_interval("33"), Some(Duration::from_millis(33)));
        assert_eq!(parse_interval("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_interval("soon"), None);
    }
}
