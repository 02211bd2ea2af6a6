//! Pipeline functions for template placeholders

use chrono::{Datelike, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A function rejected its input or arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{function}: {message}")]
pub struct FunctionError {
    /// Function name
    pub function: String,
    /// Why it failed
    pub message: String,
}

impl FunctionError {
    /// Create a function error
    pub fn new(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Result type for template functions
pub type FunctionResult = Result<String, FunctionError>;

/// Literal argument to a pipeline function
///
/// Arguments that round-trip exactly as numbers are numeric; everything
/// else is text.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    /// Integer argument
    Int(i64),
    /// Floating-point argument
    Float(f64),
    /// Text argument
    Text(String),
}

impl TemplateArg {
    /// Classify a raw argument
    pub fn parse(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>()
            && n.to_string() == raw
        {
            return TemplateArg::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>()
            && f.is_finite()
            && f.to_string() == raw
        {
            return TemplateArg::Float(f);
        }
        TemplateArg::Text(raw.to_string())
    }

    /// Integer value, if numeric and whole
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TemplateArg::Int(n) => Some(*n),
            TemplateArg::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Int(n) => write!(f, "{n}"),
            TemplateArg::Float(x) => write!(f, "{x}"),
            TemplateArg::Text(s) => f.write_str(s),
        }
    }
}

/// Signature shared by built-in and user-registered functions
pub type TemplateFunction = Arc<dyn Fn(&str, &[TemplateArg]) -> FunctionResult + Send + Sync>;

/// Registry of pipeline functions
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, TemplateFunction>,
}

impl FunctionRegistry {
    /// Registry with every built-in function
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_case_functions();
        registry.register_text_functions();
        registry.register_generator_functions();
        registry
    }

    /// Registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register (or replace) a function
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&str, &[TemplateArg]) -> FunctionResult + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Look up a function
    pub fn get(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    /// Check if a function exists
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Get all function names, sorted
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    fn register_case_functions(&mut self) {
        self.register("uppercase", |s, _| Ok(s.to_uppercase()));
        self.register("lowercase", |s, _| Ok(s.to_lowercase()));
        self.register("capitalize", |s, _| Ok(capitalize(s)));
        self.register("titlecase", |s, _| Ok(titlecase(s)));
        self.register("camelcase", |s, _| Ok(camelcase(s)));
        self.register("kebabcase", |s, _| Ok(join_words(s, "-")));
        self.register("snakecase", |s, _| Ok(join_words(s, "_")));
        self.register("slugify", |s, _| Ok(slugify(s)));
    }

    fn register_text_functions(&mut self) {
        self.register("trim", |s, _| Ok(s.trim().to_string()));
        self.register("truncate", truncate);
        self.register("default", |s, args| {
            if s.is_empty() {
                Ok(join_args(args))
            } else {
                Ok(s.to_string())
            }
        });
        self.register("replace", replace);
        self.register("prefix", |s, args| Ok(format!("{}{s}", join_args(args))));
        self.register("suffix", |s, args| Ok(format!("{s}{}", join_args(args))));
    }

    fn register_generator_functions(&mut self) {
        self.register("date", date);
        self.register("year", |_, _| Ok(Utc::now().year().to_string()));
        self.register("uuid", |_, _| Ok(uuid::Uuid::new_v4().to_string()));
        self.register("random", random);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.function_names())
            .finish()
    }
}

/// Rejoin arguments split on `:` so text arguments may contain colons
fn join_args(args: &[TemplateArg]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn titlecase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Split on non-alphanumerics and lower-to-upper case boundaries
fn words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if c.is_uppercase() && prev_lower_or_digit && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn camelcase(s: &str) -> String {
    words(s)
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i == 0 { lower } else { capitalize(&lower) }
        })
        .collect()
}

fn join_words(s: &str, separator: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn truncate(s: &str, args: &[TemplateArg]) -> FunctionResult {
    let len = args
        .first()
        .and_then(TemplateArg::as_int)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| FunctionError::new("truncate", "length must be a non-negative integer"))?;
    if s.chars().count() <= len {
        return Ok(s.to_string());
    }
    let suffix = if args.len() > 1 {
        join_args(&args[1..])
    } else {
        "...".to_string()
    };
    let kept: String = s.chars().take(len).collect();
    Ok(format!("{}{suffix}", kept.trim_end()))
}

fn replace(s: &str, args: &[TemplateArg]) -> FunctionResult {
    match args {
        [from, to] => {
            let from = from.to_string();
            if from.is_empty() {
                return Err(FunctionError::new("replace", "search text must not be empty"));
            }
            Ok(s.replace(&from, &to.to_string()))
        }
        _ => Err(FunctionError::new(
            "replace",
            format!("expected 2 arguments (from, to), got {}", args.len()),
        )),
    }
}

fn date(_: &str, args: &[TemplateArg]) -> FunctionResult {
    use std::fmt::Write;

    let format = if args.is_empty() {
        "%Y-%m-%d".to_string()
    } else {
        join_args(args)
    };
    let mut out = String::new();
    write!(out, "{}", Utc::now().format(&format))
        .map_err(|_| FunctionError::new("date", format!("invalid date format '{format}'")))?;
    Ok(out)
}

fn random(_: &str, args: &[TemplateArg]) -> FunctionResult {
    let bound = |index: usize, fallback: i64| -> Result<i64, FunctionError> {
        match args.get(index) {
            None => Ok(fallback),
            Some(arg) => arg
                .as_int()
                .ok_or_else(|| FunctionError::new("random", format!("'{arg}' is not an integer"))),
        }
    };
    let min = bound(0, 0)?;
    let max = bound(1, 100)?;
    if min > max {
        return Err(FunctionError::new(
            "random",
            format!("min {min} is greater than max {max}"),
        ));
    }
    let span = max.abs_diff(min).saturating_add(1);
    let offset = rand::random::<u64>() % span;
    Ok(min.saturating_add_unsigned(offset).to_string())
}
