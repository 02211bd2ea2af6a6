//! Declarative schema tree

use super::formats::StringFormat;
use crate::core::path::{PathSegment, parse_path};
use crate::core::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Custom check over a present value
pub type CustomCheck = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Value kind a node accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// UTF-8 string
    String,
    /// Any number
    Number,
    /// Number without a fractional part
    Integer,
    /// Boolean
    Boolean,
    /// Sequence
    Array,
    /// Keyed document
    Object,
    /// Anything non-null
    Any,
}

impl SchemaKind {
    /// Whether `value` has this kind
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (SchemaKind::Any, _)
            | (SchemaKind::String, Value::String(_))
            | (SchemaKind::Number, Value::Number(_))
            | (SchemaKind::Boolean, Value::Bool(_))
            | (SchemaKind::Array, Value::Array(_))
            | (SchemaKind::Object, Value::Object(_)) => true,
            (SchemaKind::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        }
    }

    /// Lowercase name used in messages
    pub fn name(self) -> &'static str {
        match self {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Integer => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array => "array",
            SchemaKind::Object => "object",
            SchemaKind::Any => "any",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One predicate, checked in declaration order
#[derive(Clone)]
pub enum Predicate {
    /// Minimum string length in characters
    MinLength(usize),
    /// Maximum string length in characters
    MaxLength(usize),
    /// String must match
    Pattern(regex::Regex),
    /// String must have the format
    Format(StringFormat),
    /// Lower numeric bound
    Minimum {
        /// Bound
        value: f64,
        /// Whether the bound itself is rejected
        exclusive: bool,
    },
    /// Upper numeric bound
    Maximum {
        /// Bound
        value: f64,
        /// Whether the bound itself is rejected
        exclusive: bool,
    },
    /// Number must be a multiple of
    MultipleOf(f64),
    /// Value must equal one of these
    OneOf(Vec<Value>),
    /// Minimum sequence length
    MinItems(usize),
    /// Maximum sequence length
    MaxItems(usize),
    /// Sequence elements must be distinct
    UniqueItems,
    /// Named custom check
    Custom {
        /// Name used in the default message
        name: String,
        /// The check
        check: CustomCheck,
    },
}

impl Predicate {
    /// Failure reason, or `None` when the predicate holds or does not apply
    pub(crate) fn check(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (Predicate::MinLength(min), Value::String(s)) if s.chars().count() < *min => {
                Some(format!("must be at least {min} characters"))
            }
            (Predicate::MaxLength(max), Value::String(s)) if s.chars().count() > *max => {
                Some(format!("must be at most {max} characters"))
            }
            (Predicate::Pattern(re), Value::String(s)) if !re.is_match(s) => {
                Some(format!("must match pattern '{}'", re.as_str()))
            }
            (Predicate::Format(format), Value::String(s)) if !format.matches(s) => {
                Some(format!("value must be a valid {format}"))
            }
            (Predicate::Minimum { value: min, exclusive }, Value::Number(n)) => {
                let n = n.as_f64()?;
                if *exclusive && n <= *min {
                    Some(format!("must be greater than {min}"))
                } else if !*exclusive && n < *min {
                    Some(format!("must be at least {min}"))
                } else {
                    None
                }
            }
            (Predicate::Maximum { value: max, exclusive }, Value::Number(n)) => {
                let n = n.as_f64()?;
                if *exclusive && n >= *max {
                    Some(format!("must be less than {max}"))
                } else if !*exclusive && n > *max {
                    Some(format!("must be at most {max}"))
                } else {
                    None
                }
            }
            (Predicate::MultipleOf(divisor), Value::Number(n)) if *divisor != 0.0 => {
                let n = n.as_f64()?;
                let ratio = n / divisor;
                ((ratio - ratio.round()).abs() > 1e-9)
                    .then(|| format!("must be a multiple of {divisor}"))
            }
            (Predicate::OneOf(allowed), value) if !allowed.contains(value) => {
                let rendered: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                Some(format!("must be one of [{}]", rendered.join(", ")))
            }
            (Predicate::MinItems(min), Value::Array(items)) if items.len() < *min => {
                Some(format!("must contain at least {min} items"))
            }
            (Predicate::MaxItems(max), Value::Array(items)) if items.len() > *max => {
                Some(format!("must contain at most {max} items"))
            }
            (Predicate::UniqueItems, Value::Array(items)) => {
                let duplicated = items
                    .iter()
                    .enumerate()
                    .any(|(i, item)| items[..i].contains(item));
                duplicated.then(|| "must contain unique items".to_string())
            }
            (Predicate::Custom { name, check }, value) if !check(value) => {
                Some(format!("failed check '{name}'"))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::MinLength(n) => write!(f, "MinLength({n})"),
            Predicate::MaxLength(n) => write!(f, "MaxLength({n})"),
            Predicate::Pattern(re) => write!(f, "Pattern({:?})", re.as_str()),
            Predicate::Format(format) => write!(f, "Format({format})"),
            Predicate::Minimum { value, exclusive } => {
                write!(f, "Minimum({value}, exclusive={exclusive})")
            }
            Predicate::Maximum { value, exclusive } => {
                write!(f, "Maximum({value}, exclusive={exclusive})")
            }
            Predicate::MultipleOf(d) => write!(f, "MultipleOf({d})"),
            Predicate::OneOf(values) => write!(f, "OneOf({values:?})"),
            Predicate::MinItems(n) => write!(f, "MinItems({n})"),
            Predicate::MaxItems(n) => write!(f, "MaxItems({n})"),
            Predicate::UniqueItems => f.write_str("UniqueItems"),
            Predicate::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

/// Schema for one field, composed into a tree mirroring the document
///
/// ```rust
/// use folio_config::schema::{SchemaNode, StringFormat};
///
/// let schema = SchemaNode::object()
///     .property(
///         "personal",
///         SchemaNode::object()
///             .required()
///             .property("name", SchemaNode::string().required().min_length(1))
///             .property(
///                 "email",
///                 SchemaNode::string()
///                     .format(StringFormat::Email)
///                     .message("value must be a valid email"),
///             ),
///     )
///     .property("features", SchemaNode::object().values(SchemaNode::boolean()));
///
/// assert!(schema.node_at("personal.email").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) kind: SchemaKind,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
    pub(crate) message: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) deprecated: Option<String>,
    pub(crate) strict: bool,
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) properties: BTreeMap<String, SchemaNode>,
    pub(crate) additional: Option<Box<SchemaNode>>,
    pub(crate) items: Option<Box<SchemaNode>>,
}

impl SchemaNode {
    /// Node of the given kind, optional, with no predicates
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            message: None,
            description: None,
            deprecated: None,
            strict: false,
            predicates: Vec::new(),
            properties: BTreeMap::new(),
            additional: None,
            items: None,
        }
    }

    /// String node
    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    /// Number node
    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    /// Integer node
    pub fn integer() -> Self {
        Self::new(SchemaKind::Integer)
    }

    /// Boolean node
    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    /// Object node
    pub fn object() -> Self {
        Self::new(SchemaKind::Object)
    }

    /// Array node whose elements follow `items`
    pub fn array(items: SchemaNode) -> Self {
        let mut node = Self::new(SchemaKind::Array);
        node.items = Some(Box::new(items));
        node
    }

    /// Node accepting any non-null value
    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set whether the field is required
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Substitute `value` when the field is absent
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Message reported for kind and predicate failures on this field
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Human-readable description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Warn whenever the field is present
    pub fn deprecated(mut self, note: impl Into<String>) -> Self {
        self.deprecated = Some(note.into());
        self
    }

    /// Reject undeclared keys instead of warning about them
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Append a predicate
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Minimum length in characters
    pub fn min_length(self, min: usize) -> Self {
        self.predicate(Predicate::MinLength(min))
    }

    /// Maximum length in characters
    pub fn max_length(self, max: usize) -> Self {
        self.predicate(Predicate::MaxLength(max))
    }

    /// Regular expression the string must match
    pub fn pattern(self, pattern: &str) -> ConfigResult<Self> {
        let re = regex::Regex::new(pattern)
            .map_err(|e| ConfigError::parse_error("schema pattern", e.to_string()))?;
        Ok(self.predicate(Predicate::Pattern(re)))
    }

    /// Named string format
    pub fn format(self, format: StringFormat) -> Self {
        self.predicate(Predicate::Format(format))
    }

    /// Inclusive lower bound
    pub fn minimum(self, min: f64) -> Self {
        self.predicate(Predicate::Minimum {
            value: min,
            exclusive: false,
        })
    }

    /// Inclusive upper bound
    pub fn maximum(self, max: f64) -> Self {
        self.predicate(Predicate::Maximum {
            value: max,
            exclusive: false,
        })
    }

    /// Inclusive range
    pub fn range(self, min: f64, max: f64) -> Self {
        self.minimum(min).maximum(max)
    }

    /// Number must be a multiple of `divisor`
    pub fn multiple_of(self, divisor: f64) -> Self {
        self.predicate(Predicate::MultipleOf(divisor))
    }

    /// Allowed values
    pub fn one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicate(Predicate::OneOf(values.into_iter().map(Into::into).collect()))
    }

    /// Minimum number of elements
    pub fn min_items(self, min: usize) -> Self {
        self.predicate(Predicate::MinItems(min))
    }

    /// Maximum number of elements
    pub fn max_items(self, max: usize) -> Self {
        self.predicate(Predicate::MaxItems(max))
    }

    /// Elements must be distinct
    pub fn unique_items(self) -> Self {
        self.predicate(Predicate::UniqueItems)
    }

    /// Named custom check
    pub fn custom<F>(self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicate(Predicate::Custom {
            name: name.into(),
            check: Arc::new(check),
        })
    }

    /// Declare an object field
    pub fn property(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.properties.insert(name.into(), node);
        self
    }

    /// Schema for undeclared object keys
    pub fn values(mut self, node: SchemaNode) -> Self {
        self.additional = Some(Box::new(node));
        self
    }

    /// Schema for array elements
    pub fn items(mut self, node: SchemaNode) -> Self {
        self.items = Some(Box::new(node));
        self
    }

    /// Value kind
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Whether the field is required
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Declared default
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Deprecation note
    pub fn deprecation(&self) -> Option<&str> {
        self.deprecated.as_deref()
    }

    /// Declared object fields
    pub fn properties(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Child node for one path segment
    pub fn child(&self, segment: &PathSegment) -> Option<&SchemaNode> {
        match segment {
            PathSegment::Key(key) => self
                .properties
                .get(key)
                .or(self.additional.as_deref()),
            PathSegment::Index(_) => self.items.as_deref(),
        }
    }

    /// Node describing `path`, if the schema declares one
    pub fn node_at(&self, path: &str) -> Option<&SchemaNode> {
        let segments = parse_path(path).ok()?;
        segments
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_accepts() {
        assert!(SchemaKind::Integer.accepts(&json!(3)));
        assert!(SchemaKind::Integer.accepts(&json!(3.0)));
        assert!(!SchemaKind::Integer.accepts(&json!(3.5)));
        assert!(SchemaKind::Number.accepts(&json!(3.5)));
        assert!(SchemaKind::Any.accepts(&json!([1])));
        assert!(!SchemaKind::String.accepts(&json!(1)));
    }

    #[test]
    fn test_node_at_follows_items_and_values() {
        let schema = SchemaNode::object()
            .property(
                "skills",
                SchemaNode::object().property(
                    "items",
                    SchemaNode::array(SchemaNode::object().property("name", SchemaNode::string())),
                ),
            )
            .property("features", SchemaNode::object().values(SchemaNode::boolean()));

        assert_eq!(
            schema.node_at("skills.items[3].name").map(SchemaNode::kind),
            Some(SchemaKind::String)
        );
        assert_eq!(
            schema.node_at("features.blog").map(SchemaNode::kind),
            Some(SchemaKind::Boolean)
        );
        assert!(schema.node_at("skills.unknown").is_none());
        assert!(schema.node_at("").is_some());
    }

    #[test]
    fn test_predicates() {
        assert_eq!(
            Predicate::MinLength(3).check(&json!("ab")).as_deref(),
            Some("must be at least 3 characters")
        );
        assert!(Predicate::MinLength(3).check(&json!(1)).is_none());
        assert!(Predicate::MultipleOf(0.5).check(&json!(1.5)).is_none());
        assert!(Predicate::MultipleOf(3.0).check(&json!(10)).is_some());
        assert!(Predicate::UniqueItems.check(&json!([1, 2, 1])).is_some());
        assert!(
            Predicate::OneOf(vec![json!("light"), json!("dark")])
                .check(&json!("dark"))
                .is_none()
        );
        let even = Predicate::Custom {
            name: "even".into(),
            check: Arc::new(|v| v.as_i64().is_some_and(|n| n % 2 == 0)),
        };
        assert_eq!(even.check(&json!(3)).as_deref(), Some("failed check 'even'"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = SchemaNode::string().pattern("(unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
