//! Named string formats checked by `SchemaNode::format`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

static HEX_COLOR_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("hex color regex is valid")
});

/// String format
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    /// `local@domain.tld`
    Email,
    /// Absolute URL with a host
    Url,
    /// RFC 4122 UUID
    Uuid,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp
    DateTime,
    /// `HH:MM:SS`
    Time,
    /// DNS hostname
    Hostname,
    /// Dotted IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
    /// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
    HexColor,
}

impl StringFormat {
    /// Name used in schemas and messages
    pub fn name(self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Url => "url",
            StringFormat::Uuid => "uuid",
            StringFormat::Date => "date",
            StringFormat::DateTime => "date-time",
            StringFormat::Time => "time",
            StringFormat::Hostname => "hostname",
            StringFormat::Ipv4 => "ipv4",
            StringFormat::Ipv6 => "ipv6",
            StringFormat::HexColor => "hex-color",
        }
    }

    /// Check `s` against the format
    pub fn matches(self, s: &str) -> bool {
        match self {
            StringFormat::Email => EMAIL_RE.is_match(s),
            StringFormat::Url => url::Url::parse(s).is_ok_and(|u| u.has_host()),
            StringFormat::Uuid => uuid::Uuid::parse_str(s).is_ok(),
            StringFormat::Date => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            StringFormat::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            StringFormat::Time => chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok(),
            StringFormat::Hostname => is_hostname(s),
            StringFormat::Ipv4 => s.parse::<std::net::Ipv4Addr>().is_ok(),
            StringFormat::Ipv6 => s.parse::<std::net::Ipv6Addr>().is_ok(),
            StringFormat::HexColor => HEX_COLOR_RE.is_match(s),
        }
    }
}

fn is_hostname(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StringFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(StringFormat::Email),
            "uri" | "url" => Ok(StringFormat::Url),
            "uuid" => Ok(StringFormat::Uuid),
            "date" => Ok(StringFormat::Date),
            "date-time" => Ok(StringFormat::DateTime),
            "time" => Ok(StringFormat::Time),
            "hostname" => Ok(StringFormat::Hostname),
            "ipv4" => Ok(StringFormat::Ipv4),
            "ipv6" => Ok(StringFormat::Ipv6),
            "hex-color" | "color" => Ok(StringFormat::HexColor),
            other => Err(format!("unknown string format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StringFormat::Email, "jane@example.com", true)]
    #[case(StringFormat::Email, "not-an-email", false)]
    #[case(StringFormat::Email, "jane@localhost", false)]
    #[case(StringFormat::Url, "https://jane.design/work", true)]
    #[case(StringFormat::Url, "jane.design", false)]
    #[case(StringFormat::Uuid, "550e8400-e29b-41d4-a716-446655440000", true)]
    #[case(StringFormat::Date, "2025-01-15", true)]
    #[case(StringFormat::Date, "2025-13-01", false)]
    #[case(StringFormat::DateTime, "2025-01-15T10:30:00Z", true)]
    #[case(StringFormat::Time, "10:30:00", true)]
    #[case(StringFormat::Hostname, "jane.design", true)]
    #[case(StringFormat::Hostname, "-bad.example", false)]
    #[case(StringFormat::Ipv4, "192.168.1.1", true)]
    #[case(StringFormat::Ipv4, "999.1.1.1", false)]
    #[case(StringFormat::Ipv6, "::1", true)]
    #[case(StringFormat::HexColor, "#1a2b3c", true)]
    #[case(StringFormat::HexColor, "#fff", true)]
    #[case(StringFormat::HexColor, "1a2b3c", false)]
    fn test_formats(#[case] format: StringFormat, #[case] input: &str, #[case] expected: bool) {
        assert_eq!(format.matches(input), expected, "{format} on {input}");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("uri".parse::<StringFormat>(), Ok(StringFormat::Url));
        assert_eq!("date-time".parse::<StringFormat>(), Ok(StringFormat::DateTime));
        assert!("phone".parse::<StringFormat>().is_err());
    }
}
