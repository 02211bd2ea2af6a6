//! Placeholder syntaxes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static MUSTACHE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{\{([^{}]*)\}\}").expect("mustache regex is valid"));
static DOLLAR_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^{}]*)\}").expect("dollar regex is valid"));
static BRACE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{([^{}]*)\}").expect("brace regex is valid"));
static PERCENT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"%\{([^{}]*)\}").expect("percent regex is valid"));

/// Placeholder delimiter pair; one kind is active per resolution call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// `{{ body }}`
    #[default]
    Mustache,
    /// `${ body }`
    Dollar,
    /// `{ body }`
    Brace,
    /// `%{ body }`
    Percent,
}

impl PatternKind {
    /// Every kind, in declaration order
    pub const ALL: [PatternKind; 4] = [
        PatternKind::Mustache,
        PatternKind::Dollar,
        PatternKind::Brace,
        PatternKind::Percent,
    ];

    /// Regex matching one placeholder; group 1 is the raw body
    pub fn regex(self) -> &'static regex::Regex {
        match self {
            PatternKind::Mustache => &MUSTACHE_RE,
            PatternKind::Dollar => &DOLLAR_RE,
            PatternKind::Brace => &BRACE_RE,
            PatternKind::Percent => &PERCENT_RE,
        }
    }

    /// Opening delimiter
    pub fn open(self) -> &'static str {
        match self {
            PatternKind::Mustache => "{{",
            PatternKind::Dollar => "${",
            PatternKind::Brace => "{",
            PatternKind::Percent => "%{",
        }
    }

    /// Closing delimiter
    pub fn close(self) -> &'static str {
        match self {
            PatternKind::Mustache => "}}",
            PatternKind::Dollar | PatternKind::Brace | PatternKind::Percent => "}",
        }
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Mustache => "mustache",
            PatternKind::Dollar => "dollar",
            PatternKind::Brace => "brace",
            PatternKind::Percent => "percent",
        }
    }

    /// Whether `text` contains at least one placeholder of this kind
    pub fn is_templated(self, text: &str) -> bool {
        self.regex().is_match(text)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown pattern '{s}' (expected mustache, dollar, brace or percent)")
            })
    }
}
