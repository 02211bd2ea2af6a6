//! Placeholder resolution

use super::analysis;
use super::context::TemplateContext;
use super::functions::{FunctionError, FunctionRegistry, TemplateArg};
use super::issue::{TemplateIssue, TemplateIssueKind};
use super::pattern::PatternKind;
use crate::core::document::{child_index_path, child_key_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Resolved text plus any placeholders that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Output text; failed placeholders are left verbatim
    pub text: String,
    /// One issue per failed placeholder
    pub issues: Vec<TemplateIssue>,
}

/// Output of [`TemplateEngine::preview`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePreview {
    /// Resolved text
    pub output: String,
    /// Distinct variable paths, first-seen order
    pub variables: Vec<String>,
    /// Static findings followed by resolution failures
    pub issues: Vec<TemplateIssue>,
}

/// Resolves placeholders against a [`TemplateContext`]
///
/// ```rust
/// use folio_config::template::{PatternKind, TemplateContext, TemplateEngine};
/// use serde_json::json;
///
/// let engine = TemplateEngine::new();
/// let ctx = TemplateContext::builder()
///     .config(json!({ "personal": { "name": "Jane" } }))
///     .custom_value("currentYear", 2024)
///     .build();
///
/// assert_eq!(
///     engine.resolve("{{personal.name|uppercase}}, built in {{currentYear}}", &ctx, PatternKind::Mustache),
///     "JANE, built in 2024"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    functions: Arc<FunctionRegistry>,
}

impl TemplateEngine {
    /// Engine with the built-in functions
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a custom function registry
    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self {
            functions: Arc::new(functions),
        }
    }

    /// Registered functions
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Resolve every placeholder in `template`
    ///
    /// Undefined variables become the empty string. A placeholder whose
    /// pipeline fails is logged and left verbatim.
    pub fn resolve(&self, template: &str, ctx: &TemplateContext, pattern: PatternKind) -> String {
        self.resolve_with_report(template, ctx, pattern).text
    }

    /// Resolve and report failed placeholders
    pub fn resolve_with_report(
        &self,
        template: &str,
        ctx: &TemplateContext,
        pattern: PatternKind,
    ) -> Resolution {
        let mut issues = Vec::new();
        let text = pattern
            .regex()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let offset = caps.get(0).map_or(0, |m| m.start());
                let body = caps.get(1).map_or("", |m| m.as_str());
                match self.resolve_placeholder(body, ctx) {
                    Ok(value) => value,
                    Err(e) => {
                        folio_log::warn!(
                            placeholder = %whole,
                            pattern = %pattern,
                            error = %e,
                            "Template placeholder failed, leaving it unresolved"
                        );
                        issues.push(TemplateIssue::new(
                            TemplateIssueKind::FunctionFailed,
                            whole,
                            e.to_string(),
                            offset,
                        ));
                        whole.to_string()
                    }
                }
            })
            .into_owned();
        Resolution { text, issues }
    }

    fn resolve_placeholder(&self, body: &str, ctx: &TemplateContext) -> Result<String, FunctionError> {
        let mut stages = body.split('|');
        let variable = stages.next().unwrap_or_default().trim();
        let mut value = if variable.is_empty() {
            String::new()
        } else {
            ctx.lookup(variable).unwrap_or_default()
        };

        for stage in stages {
            let mut parts = stage.trim().split(':');
            let name = parts.next().unwrap_or_default().trim();
            let args: Vec<TemplateArg> = parts.map(TemplateArg::parse).collect();
            match self.functions.get(name) {
                Some(function) => value = function(&value, &args)?,
                None => folio_log::debug!(function = %name, "Unknown template function, passing value through"),
            }
        }

        Ok(value)
    }

    /// Resolve every string leaf of `value`
    pub fn resolve_value(&self, value: &Value, ctx: &TemplateContext, pattern: PatternKind) -> Value {
        self.resolve_value_with_report(value, ctx, pattern).0
    }

    /// Resolve every string leaf and report failures with their paths
    pub fn resolve_value_with_report(
        &self,
        value: &Value,
        ctx: &TemplateContext,
        pattern: PatternKind,
    ) -> (Value, Vec<TemplateIssue>) {
        let mut issues = Vec::new();
        let resolved = self.resolve_node(value, ctx, pattern, "", &mut issues);
        (resolved, issues)
    }

    fn resolve_node(
        &self,
        value: &Value,
        ctx: &TemplateContext,
        pattern: PatternKind,
        path: &str,
        issues: &mut Vec<TemplateIssue>,
    ) -> Value {
        match value {
            Value::String(s) if pattern.is_templated(s) => {
                let resolution = self.resolve_with_report(s, ctx, pattern);
                issues.extend(resolution.issues.into_iter().map(|i| i.at_path(path)));
                Value::String(resolution.text)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.resolve_node(item, ctx, pattern, &child_index_path(path, i), issues)
                    })
                    .collect(),
            ),
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(key, child)| {
                        let child_path = child_key_path(path, key);
                        (key.clone(), self.resolve_node(child, ctx, pattern, &child_path, issues))
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Placeholders still present in string leaves of `value`
    pub fn unresolved(&self, value: &Value, pattern: PatternKind) -> Vec<TemplateIssue> {
        let mut issues = Vec::new();
        collect_unresolved(value, pattern, "", &mut issues);
        issues
    }

    /// Lint `template` without resolving it
    pub fn validate_template(&self, template: &str, pattern: PatternKind) -> Vec<TemplateIssue> {
        analysis::validate_template(template, pattern, &self.functions)
    }

    /// Distinct variable paths referenced by `template`
    pub fn extract_variables(&self, template: &str, pattern: PatternKind) -> Vec<String> {
        analysis::extract_variables(template, pattern)
    }

    /// Lint, then resolve against a sample context
    pub fn preview(&self, template: &str, ctx: &TemplateContext, pattern: PatternKind) -> TemplatePreview {
        let mut issues = self.validate_template(template, pattern);
        let resolution = self.resolve_with_report(template, ctx, pattern);
        issues.extend(resolution.issues);
        TemplatePreview {
            output: resolution.text,
            variables: self.extract_variables(template, pattern),
            issues,
        }
    }
}

fn collect_unresolved(value: &Value, pattern: PatternKind, path: &str, out: &mut Vec<TemplateIssue>) {
    match value {
        Value::String(s) => {
            for m in pattern.regex().find_iter(s) {
                out.push(
                    TemplateIssue::new(
                        TemplateIssueKind::Unresolved,
                        m.as_str(),
                        "placeholder did not resolve (circular reference?)",
                        m.start(),
                    )
                    .at_path(path),
                );
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_unresolved(item, pattern, &child_index_path(path, i), out);
            }
        }
        Value::Object(obj) => {
            for (key, child) in obj {
                collect_unresolved(child, pattern, &child_key_path(path, key), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn ctx() -> TemplateContext {
        TemplateContext::builder()
            .config(json!({
                "personal": { "name": "Jane", "title": "Architect" },
                "site": { "url": "https://jane.design" }
            }))
            .env_var("NODE_ENV", "production")
            .custom_value("currentYear", 2024)
            .build()
    }

    #[rstest]
    #[case("Built in {{currentYear}}", "Built in 2024")]
    #[case("{{personal.name|uppercase}}", "JANE")]
    #[case("{{ personal.name | lowercase | prefix:@ }}", "@jane")]
    #[case("{{missing.value}}", "")]
    #[case("{{missing.value|default:Untitled}}", "Untitled")]
    #[case("{{personal.name|nosuchfn|uppercase}}", "JANE")]
    #[case("{{env.NODE_ENV}} build", "production build")]
    #[case("no placeholders", "no placeholders")]
    #[case("{{}}", "")]
    fn test_resolve_mustache(#[case] template: &str, #[case] expected: &str) {
        let engine = TemplateEngine::new();
        assert_eq!(engine.resolve(template, &ctx(), PatternKind::Mustache), expected);
    }

    #[rstest]
    #[case(PatternKind::Dollar, "${personal.name} / {{personal.name}}", "Jane / {{personal.name}}")]
    #[case(PatternKind::Brace, "{personal.title|lowercase}", "architect")]
    #[case(PatternKind::Percent, "%{site.url|replace:https:http}", "http://jane.design")]
    fn test_other_patterns(#[case] pattern: PatternKind, #[case] template: &str, #[case] expected: &str) {
        let engine = TemplateEngine::new();
        assert_eq!(engine.resolve(template, &ctx(), pattern), expected);
    }

    #[test]
    fn test_failed_placeholder_left_verbatim() {
        let engine = TemplateEngine::new();
        let resolution = engine.resolve_with_report(
            "{{personal.name}}: {{personal.title|truncate:abc}}",
            &ctx(),
            PatternKind::Mustache,
        );
        assert_eq!(resolution.text, "Jane: {{personal.title|truncate:abc}}");
        assert_eq!(resolution.issues.len(), 1);
        assert_eq!(resolution.issues[0].kind, TemplateIssueKind::FunctionFailed);
        assert_eq!(resolution.issues[0].offset, 19);
    }

    #[test]
    fn test_pure_templates_are_deterministic() {
        let engine = TemplateEngine::new();
        let template = "{{personal.name|slugify}}-{{personal.title|kebabcase|truncate:4}}";
        let first = engine.resolve(template, &ctx(), PatternKind::Mustache);
        let second = engine.resolve(template, &ctx(), PatternKind::Mustache);
        assert_eq!(first, second);
        assert_eq!(first, "jane-arch...");
    }

    #[test]
    fn test_resolve_value_rebuilds_tree() {
        let engine = TemplateEngine::new();
        let doc = json!({
            "seo": { "title": "{{personal.name}} | {{personal.title}}", "keywords": ["{{personal.title|lowercase}}", 3] },
            "broken": "{{personal.name|replace:x}}",
            "flag": true
        });
        let (resolved, issues) = engine.resolve_value_with_report(&doc, &ctx(), PatternKind::Mustache);
        assert_eq!(
            resolved,
            json!({
                "seo": { "title": "Jane | Architect", "keywords": ["architect", 3] },
                "broken": "{{personal.name|replace:x}}",
                "flag": true
            })
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path.as_deref(), Some("broken"));

        let leftovers = engine.unresolved(&resolved, PatternKind::Mustache);
        assert_eq!(leftovers.len(), 1);
        assert_eq!(leftovers[0].path.as_deref(), Some("broken"));
    }

    #[test]
    fn test_custom_function_registry() {
        let mut functions = FunctionRegistry::new();
        functions.register("initials", |s, _| {
            Ok(s.split_whitespace().filter_map(|w| w.chars().next()).collect())
        });
        let engine = TemplateEngine::with_functions(functions);
        let ctx = TemplateContext::builder().custom_value("name", "Jane Q Public").build();
        assert_eq!(engine.resolve("{{name|initials}}", &ctx, PatternKind::Mustache), "JQP");
    }

    #[test]
    fn test_preview_combines_lint_and_output() {
        let engine = TemplateEngine::new();
        let preview = engine.preview(
            "{{personal.name|shout}} {{personal.name}} {{currentYear}}",
            &ctx(),
            PatternKind::Mustache,
        );
        assert_eq!(preview.output, "Jane Jane 2024");
        assert_eq!(preview.variables, vec!["personal.name", "currentYear"]);
        assert_eq!(preview.issues.len(), 1);
        assert_eq!(preview.issues[0].kind, TemplateIssueKind::UnknownFunction);
    }
}
