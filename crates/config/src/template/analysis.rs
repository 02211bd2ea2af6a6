//! Static checks over template strings

use super::functions::FunctionRegistry;
use super::issue::{TemplateIssue, TemplateIssueKind};
use super::pattern::PatternKind;

/// Distinct variable paths referenced by `template`, first-seen order
pub fn extract_variables(template: &str, pattern: PatternKind) -> Vec<String> {
    let mut variables: Vec<String> = Vec::new();
    for caps in pattern.regex().captures_iter(template) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        let variable = body.split('|').next().unwrap_or_default().trim();
        if !variable.is_empty() && !variables.iter().any(|v| v == variable) {
            variables.push(variable.to_string());
        }
    }
    variables
}

/// Flag empty, nested and unclosed placeholders and unknown functions
pub fn validate_template(
    template: &str,
    pattern: PatternKind,
    functions: &FunctionRegistry,
) -> Vec<TemplateIssue> {
    let open = pattern.open();
    let close = pattern.close();
    let mut issues = Vec::new();
    let mut pos = 0;

    while let Some(found) = template[pos..].find(open) {
        let start = pos + found;
        let body_start = start + open.len();
        let rest = &template[body_start..];

        let Some(close_at) = rest.find(close) else {
            issues.push(TemplateIssue::new(
                TemplateIssueKind::UnclosedDelimiter,
                &template[start..],
                format!("'{open}' is never closed by '{close}'"),
                start,
            ));
            break;
        };
        let end = body_start + close_at + close.len();
        let placeholder = &template[start..end];

        if rest.find(open).is_some_and(|nested| nested < close_at) {
            issues.push(TemplateIssue::new(
                TemplateIssueKind::NestedDelimiter,
                placeholder,
                format!("'{open}' appears inside another placeholder"),
                start,
            ));
            pos = end;
            continue;
        }

        let body = rest[..close_at].trim();
        check_body(body, placeholder, start, functions, &mut issues);
        pos = end;
    }

    issues
}

fn check_body(
    body: &str,
    placeholder: &str,
    offset: usize,
    functions: &FunctionRegistry,
    issues: &mut Vec<TemplateIssue>,
) {
    if body.is_empty() {
        issues.push(TemplateIssue::new(
            TemplateIssueKind::EmptyPlaceholder,
            placeholder,
            "placeholder is empty",
            offset,
        ));
        return;
    }

    let mut stages = body.split('|');
    if stages.next().unwrap_or_default().trim().is_empty() {
        issues.push(TemplateIssue::new(
            TemplateIssueKind::EmptyPlaceholder,
            placeholder,
            "placeholder names no variable",
            offset,
        ));
    }

    for stage in stages {
        let name = stage.trim().split(':').next().unwrap_or_default().trim();
        if !functions.has_function(name) {
            let message = if name.is_empty() {
                "empty function name in pipeline".to_string()
            } else {
                format!("unknown function '{name}'")
            };
            issues.push(TemplateIssue::new(
                TemplateIssueKind::UnknownFunction,
                placeholder,
                message,
                offset,
            ));
        }
    }
}
