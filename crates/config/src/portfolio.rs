//! Typed portfolio site sections and the schema describing them
//!
//! The typed structs are plain serde views over sections of a committed
//! document; [`schema`] is the hand-authored tree the manager validates
//! against.

use crate::schema::{Predicate, SchemaNode, StringFormat};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static LANGUAGE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-z]{2}(-[A-Z]{2})?$").expect("language tag regex is valid")
});

static HANDLE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^@\w{1,15}$").expect("handle regex is valid"));

/// Who the portfolio belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    /// Display name
    pub name: String,
    /// Professional title
    pub title: String,
    /// Contact address
    pub email: String,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// City or region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Short biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Social profile URLs keyed by network
    #[serde(default)]
    pub social: BTreeMap<String, String>,
}

/// Colour scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Always light
    Light,
    /// Always dark
    Dark,
    /// Follow the visitor's system setting
    #[default]
    System,
}

/// Visual theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Colour scheme
    #[serde(default)]
    pub mode: ThemeMode,
    /// Primary colour, `#rrggbb`
    pub primary_color: String,
    /// Accent colour, `#rrggbb`
    pub accent_color: String,
    /// CSS font stack
    pub font_family: String,
    /// Corner radius in pixels
    pub radius: u8,
}

/// Search engine and social preview metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoConfig {
    /// Page title
    pub title: String,
    /// Meta description
    pub description: String,
    /// Meta keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Open Graph image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    /// Twitter handle including `@`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
}

/// Site-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title
    pub title: String,
    /// Canonical base URL
    pub url: String,
    /// Language tag, e.g. `en` or `en-GB`
    pub language: String,
    /// Footer text
    pub footer: String,
}

/// Schema for a portfolio site configuration
///
/// `personal.name` and `personal.email` are required; everything else has
/// defaults, several of them templated over `personal`.
pub fn schema() -> SchemaNode {
    SchemaNode::object()
        .describe("Portfolio site configuration")
        .property("personal", personal_schema())
        .property("site", site_schema())
        .property("theme", theme_schema())
        .property("seo", seo_schema())
        .property("features", features_schema())
        .property("skills", skills_schema())
}

fn personal_schema() -> SchemaNode {
    SchemaNode::object()
        .required()
        .property("name", SchemaNode::string().required().min_length(1))
        .property("title", SchemaNode::string().with_default("Designer"))
        .property(
            "email",
            SchemaNode::string()
                .required()
                .format(StringFormat::Email)
                .message("must be a valid email address"),
        )
        .property("phone", SchemaNode::string())
        .property("location", SchemaNode::string())
        .property("bio", SchemaNode::string().max_length(500))
        .property("avatar", SchemaNode::string().format(StringFormat::Url))
        .property(
            "social",
            SchemaNode::object()
                .with_default(json!({}))
                .values(SchemaNode::string().format(StringFormat::Url)),
        )
}

fn site_schema() -> SchemaNode {
    SchemaNode::object()
        .with_default(json!({}))
        .property(
            "title",
            SchemaNode::string().with_default("{{personal.name}} | Portfolio"),
        )
        .property(
            "url",
            SchemaNode::string()
                .format(StringFormat::Url)
                .with_default("http://localhost:3000"),
        )
        .property(
            "language",
            SchemaNode::string()
                .with_default("en")
                .predicate(Predicate::Pattern(LANGUAGE_RE.clone())),
        )
        .property(
            "footer",
            SchemaNode::string().with_default("© {{runtime.year}} {{personal.name}}"),
        )
}

fn theme_schema() -> SchemaNode {
    SchemaNode::object()
        .with_default(json!({}))
        .property(
            "mode",
            SchemaNode::string()
                .one_of(["light", "dark", "system"])
                .with_default("system"),
        )
        .property(
            "primary_color",
            SchemaNode::string()
                .format(StringFormat::HexColor)
                .with_default("#1f2937"),
        )
        .property(
            "accent_color",
            SchemaNode::string()
                .format(StringFormat::HexColor)
                .with_default("#f59e0b"),
        )
        .property(
            "font_family",
            SchemaNode::string().with_default("Inter, sans-serif"),
        )
        .property(
            "radius",
            SchemaNode::integer().range(0.0, 32.0).with_default(8),
        )
        .property(
            "dark",
            SchemaNode::boolean().deprecated("use theme.mode = \"dark\""),
        )
}

fn seo_schema() -> SchemaNode {
    SchemaNode::object()
        .with_default(json!({}))
        .property("title", SchemaNode::string().with_default("{{site.title}}"))
        .property(
            "description",
            SchemaNode::string()
                .max_length(160)
                .with_default("{{personal.title}} portfolio of {{personal.name}}"),
        )
        .property(
            "keywords",
            SchemaNode::array(SchemaNode::string().min_length(1))
                .unique_items()
                .with_default(json!([])),
        )
        .property("og_image", SchemaNode::string().format(StringFormat::Url))
        .property(
            "twitter_handle",
            SchemaNode::string()
                .predicate(Predicate::Pattern(HANDLE_RE.clone()))
                .message("must look like @handle"),
        )
}

fn features_schema() -> SchemaNode {
    SchemaNode::object()
        .with_default(json!({}))
        .describe("Feature flags: a boolean or an object with `enabled`")
        .property("blog", SchemaNode::boolean().with_default(false))
        .property("contact_form", SchemaNode::boolean().with_default(true))
        .property("dark_mode_toggle", SchemaNode::boolean().with_default(true))
        .values(SchemaNode::any())
}

fn skills_schema() -> SchemaNode {
    let skill = SchemaNode::object()
        .property("name", SchemaNode::string().required().min_length(1))
        .property("level", SchemaNode::integer().range(1.0, 5.0).with_default(3))
        .property("category", SchemaNode::string());

    SchemaNode::object()
        .with_default(json!({}))
        .property("title", SchemaNode::string().with_default("Skills"))
        .property("items", SchemaNode::array(skill).with_default(json!([])))
}
