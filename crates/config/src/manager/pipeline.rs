//! Validate → default-fill → template-resolve

use super::options::ManagerOptions;
use crate::core::{ConfigError, ConfigResult};
use crate::schema::{SchemaValidator, ValidationIssue};
use crate::template::{TemplateContext, TemplateEngine, TemplateIssue};
use serde_json::Value;
use std::sync::Arc;

/// Which part of a candidate document gets re-validated
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scope<'a> {
    /// The whole document
    Full,
    /// Only the subtrees at these paths
    Paths(&'a [String]),
}

/// Output of a successful pipeline run
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    /// Validated and default-filled, placeholders intact
    pub raw: Value,
    /// Fully resolved
    pub resolved: Value,
    /// Non-fatal validation findings (and errors, in permissive mode)
    pub warnings: Vec<ValidationIssue>,
    /// Template problems tolerated in permissive mode
    pub template_issues: Vec<TemplateIssue>,
}

/// The synchronous part of every commit
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub validator: Option<SchemaValidator>,
    pub engine: TemplateEngine,
    pub context: TemplateContext,
    pub options: ManagerOptions,
}

impl Pipeline {
    pub fn run(&self, candidate: &Value, scope: Scope<'_>) -> ConfigResult<Prepared> {
        let (raw, warnings) = self.validate(candidate, scope)?;
        let (resolved, template_issues) = self.resolve(&raw)?;
        Ok(Prepared {
            raw,
            resolved,
            warnings,
            template_issues,
        })
    }

    fn validate(&self, candidate: &Value, scope: Scope<'_>) -> ConfigResult<(Value, Vec<ValidationIssue>)> {
        let Some(validator) = &self.validator else {
            return Ok((candidate.clone(), Vec::new()));
        };

        let (document, errors, mut warnings) = match scope {
            Scope::Full => {
                let result = validator.validate(candidate);
                let errors = result.errors.clone();
                let warnings = result.warnings.clone();
                (result.into_document(), errors, warnings)
            }
            Scope::Paths(paths) => {
                let mut document = candidate.clone();
                let mut errors = Vec::new();
                let mut warnings = Vec::new();
                for path in paths {
                    let result = validator.validate_at(&document, path);
                    errors.extend(result.errors.iter().cloned());
                    warnings.extend(result.warnings.iter().cloned());
                    document = result.into_document();
                }
                (document, errors, warnings)
            }
        };

        for warning in &warnings {
            folio_log::warn!(path = %warning.path, "Configuration warning: {}", warning.message);
        }

        if errors.is_empty() {
            return Ok((document, warnings));
        }
        if !self.options.permissive {
            return Err(ConfigError::schema_violation(errors));
        }

        for error in &errors {
            folio_log::warn!(
                path = %error.path,
                permissive = true,
                "Committing invalid configuration: {}",
                error.message
            );
        }
        warnings.extend(errors);
        Ok((document, warnings))
    }

    /// Resolve placeholders until the document stops changing
    ///
    /// Each pass resolves `document` against the previous pass's output,
    /// so chained references (`seo.title` → `site.title` → `personal.name`)
    /// settle within a few passes.
    fn resolve(&self, document: &Value) -> ConfigResult<(Value, Vec<TemplateIssue>)> {
        let pattern = self.options.pattern;
        let passes = self.options.max_resolution_passes.max(1);

        let mut namespace = Arc::new(document.clone());
        let mut issues = Vec::new();
        for pass in 1..=passes {
            let ctx = self.context.with_config(Arc::clone(&namespace));
            let (output, pass_issues) = self.engine.resolve_value_with_report(document, &ctx, pattern);
            issues = pass_issues;
            let settled = output == *namespace;
            namespace = Arc::new(output);
            if settled {
                folio_log::trace!(passes = pass, "Template resolution settled");
                break;
            }
        }
        let resolved = Arc::try_unwrap(namespace).unwrap_or_else(|shared| (*shared).clone());

        let leftovers: Vec<TemplateIssue> = self
            .engine
            .unresolved(&resolved, pattern)
            .into_iter()
            .filter(|left| !issues.iter().any(|issue| issue.path == left.path))
            .collect();
        issues.extend(leftovers);
        issues.retain(|issue| !issue.is_warning());

        if issues.is_empty() {
            return Ok((resolved, issues));
        }
        if !self.options.permissive {
            return Err(ConfigError::template_resolution(issues));
        }
        for issue in &issues {
            folio_log::warn!(permissive = true, "Committing unresolved placeholder: {issue}");
        }
        Ok((resolved, issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaNode, StringFormat};
    use crate::template::{FunctionError, FunctionRegistry, PatternKind, TemplateIssueKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pipeline(options: ManagerOptions) -> Pipeline {
        let schema = SchemaNode::object()
            .property(
                "personal",
                SchemaNode::object()
                    .required()
                    .property("name", SchemaNode::string().required())
                    .property("email", SchemaNode::string().format(StringFormat::Email)),
            )
            .property(
                "site",
                SchemaNode::object()
                    .with_default(json!({}))
                    .property("title", SchemaNode::string().with_default(json!("{{personal.name}}'s portfolio"))),
            )
            .property(
                "seo",
                SchemaNode::object()
                    .with_default(json!({}))
                    .property("title", SchemaNode::string().with_default(json!("{{site.title|uppercase}}"))),
            );
        let mut functions = FunctionRegistry::new();
        functions.register("fail", |_, _| Err(FunctionError::new("fail", "always fails")));
        Pipeline {
            validator: Some(SchemaValidator::new(schema)),
            engine: TemplateEngine::with_functions(functions),
            context: TemplateContext::builder().custom_value("currentYear", 2024).build(),
            options,
        }
    }

    #[test]
    fn test_chained_references_settle() {
        let prepared = pipeline(ManagerOptions::default())
            .run(&json!({ "personal": { "name": "Jane" } }), Scope::Full)
            .unwrap();
        assert_eq!(prepared.resolved["site"]["title"], json!("Jane's portfolio"));
        assert_eq!(prepared.resolved["seo"]["title"], json!("JANE'S PORTFOLIO"));
        assert_eq!(prepared.raw["seo"]["title"], json!("{{site.title|uppercase}}"));
    }

    #[test]
    fn test_schema_violation_rejected_unless_permissive() {
        let raw = json!({ "personal": { "name": "Jane", "email": "not-an-email" } });
        let err = pipeline(ManagerOptions::default())
            .run(&raw, Scope::Full)
            .unwrap_err();
        assert_eq!(err.validation_errors().len(), 1);
        assert_eq!(err.validation_errors()[0].path, "personal.email");

        let prepared = pipeline(ManagerOptions::permissive()).run(&raw, Scope::Full).unwrap();
        assert_eq!(prepared.warnings.len(), 1);
        assert_eq!(prepared.resolved["site"]["title"], json!("Jane's portfolio"));
    }

    #[test]
    fn test_failed_function_blocks_commit() {
        let raw = json!({
            "personal": { "name": "Jane" },
            "site": { "title": "{{personal.name|fail}}" },
            "seo": { "title": "Jane Doe" }
        });
        let err = pipeline(ManagerOptions::default())
            .run(&raw, Scope::Full)
            .unwrap_err();
        let ConfigError::TemplateResolution { issues } = err else {
            panic!("expected template error");
        };
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, TemplateIssueKind::FunctionFailed);
        assert_eq!(issues[0].path.as_deref(), Some("site.title"));
    }

    #[test]
    fn test_circular_reference_is_reported() {
        let raw = json!({
            "personal": { "name": "Jane" },
            "site": { "title": "{{seo.title}}" },
            "seo": { "title": "{{site.title}}" }
        });
        let mut options = ManagerOptions::default();
        options.max_resolution_passes = 3;
        let err = pipeline(options.clone()).run(&raw, Scope::Full).unwrap_err();
        assert!(matches!(err, ConfigError::TemplateResolution { .. }));

        options.permissive = true;
        let prepared = pipeline(options).run(&raw, Scope::Full).unwrap();
        assert!(
            prepared
                .template_issues
                .iter()
                .all(|i| i.kind == TemplateIssueKind::Unresolved)
        );
    }

    #[test]
    fn test_scoped_validation_checks_only_subtree() {
        let pipeline = pipeline(ManagerOptions::default());
        // personal.email is invalid but only `site` is re-validated
        let raw = json!({ "personal": { "name": "Jane", "email": "nope" }, "site": {} });
        let paths = vec!["site".to_string()];
        let prepared = pipeline.run(&raw, Scope::Paths(&paths)).unwrap();
        assert_eq!(prepared.resolved["site"]["title"], json!("Jane's portfolio"));
    }

    #[test]
    fn test_without_schema_only_templates_apply() {
        let pipeline = Pipeline {
            validator: None,
            engine: TemplateEngine::new(),
            context: TemplateContext::builder().custom_value("currentYear", 2024).build(),
            options: ManagerOptions {
                pattern: PatternKind::Dollar,
                ..ManagerOptions::default()
            },
        };
        let prepared = pipeline
            .run(&json!({ "footer": "Built in ${currentYear}" }), Scope::Full)
            .unwrap();
        assert_eq!(prepared.resolved, json!({ "footer": "Built in 2024" }));
    }
}
