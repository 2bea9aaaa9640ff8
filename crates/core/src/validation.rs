//! Input rules for start requests.
//!
//! Two layers share the same acceptance rules:
//!
//! - [`validate_form`] runs in the client before anything is sent and
//!   reports every offending field.
//! - [`validate_start`] runs in the control service and filters the lists,
//!   rejecting only when nothing usable remains.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Prefix every accepted job link must start with.
pub const DEFAULT_HIRING_SITE_PREFIX: &str = "https://hiring.amazon";

/// Rule name for a missing value.
pub const RULE_REQUIRED: &str = "required";
/// Rule name for a link outside the hiring site.
pub const RULE_INVALID_PREFIX: &str = "invalid_prefix";

/// Trim `raw` and keep it if it is a link on the hiring site.
pub fn accept_link(raw: &str, prefix: &str) -> Option<String> {
    let link = raw.trim();
    (!link.is_empty() && link.starts_with(prefix)).then(|| link.to_string())
}

/// Trim `raw` and keep it if anything is left.
pub fn accept_position(raw: &str) -> Option<String> {
    let position = raw.trim();
    (!position.is_empty()).then(|| position.to_string())
}

/// Accepted links, in input order.
pub fn accepted_links(links: &[String], prefix: &str) -> Vec<String> {
    links.iter().filter_map(|l| accept_link(l, prefix)).collect()
}

/// Accepted positions, in input order.
pub fn accepted_positions(positions: &[String]) -> Vec<String> {
    positions.iter().filter_map(|p| accept_position(p)).collect()
}

// ---------------------------------------------------------------------------
// Service-side validation
// ---------------------------------------------------------------------------

/// A start request that passed [`validate_start`].
///
/// Both lists are non-empty and already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartInput {
    links: Vec<String>,
    positions: Vec<String>,
}

impl StartInput {
    /// The link monitoring targets. Only the first accepted link is used.
    pub fn primary_link(&self) -> &str {
        &self.links[0]
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn positions(&self) -> &[String] {
        &self.positions
    }
}

/// Filter `links` and `positions` and require at least one of each.
pub fn validate_start(
    links: &[String],
    positions: &[String],
    prefix: &str,
) -> Result<StartInput, CoreError> {
    let links = accepted_links(links, prefix);
    let positions = accepted_positions(positions);

    if links.is_empty() || positions.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "At least one link starting with {prefix} and one position are required"
        )));
    }

    Ok(StartInput { links, positions })
}

// ---------------------------------------------------------------------------
// Form validation
// ---------------------------------------------------------------------------

/// A single field-level rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// `links[0]`, `positions[2]`, or the bare group name for group rules.
    pub field: String,
    pub rule_type: String,
    pub message: String,
}

/// Aggregated result of validating a start form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormValidation {
    pub violations: Vec<FieldViolation>,
}

impl FormValidation {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations reported against `field` (exact match).
    pub fn for_field(&self, field: &str) -> impl Iterator<Item = &FieldViolation> {
        let field = field.to_string();
        self.violations.iter().filter(move |v| v.field == field)
    }
}

/// Validate the link and position fields of a start form.
///
/// - A lone blank field is `required`.
/// - With several fields, blank ones are ignored, unless all are blank, in
///   which case the group itself is `required`.
/// - A non-blank link that does not start with `prefix` is
///   `invalid_prefix`.
pub fn validate_form(links: &[String], positions: &[String], prefix: &str) -> FormValidation {
    let mut violations = Vec::new();

    check_required("links", "link", links, &mut violations);
    for (i, link) in links.iter().enumerate() {
        let trimmed = link.trim();
        if !trimmed.is_empty() && !trimmed.starts_with(prefix) {
            violations.push(FieldViolation {
                field: format!("links[{i}]"),
                rule_type: RULE_INVALID_PREFIX.to_string(),
                message: format!("Link must start with {prefix}"),
            });
        }
    }

    check_required("positions", "position", positions, &mut violations);

    FormValidation { violations }
}

fn check_required(
    group: &str,
    noun: &str,
    values: &[String],
    violations: &mut Vec<FieldViolation>,
) {
    let blank = |v: &String| v.trim().is_empty();

    match values {
        [] => violations.push(FieldViolation {
            field: group.to_string(),
            rule_type: RULE_REQUIRED.to_string(),
            message: format!("At least one {noun} is required"),
        }),
        [only] if blank(only) => violations.push(FieldViolation {
            field: format!("{group}[0]"),
            rule_type: RULE_REQUIRED.to_string(),
            message: format!("A {noun} is required"),
        }),
        many if many.iter().all(blank) => violations.push(FieldViolation {
            field: group.to_string(),
            rule_type: RULE_REQUIRED.to_string(),
            message: format!("At least one {noun} is required"),
        }),
        _ => {}
    }
}
