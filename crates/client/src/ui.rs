//! Line-oriented terminal front end.
//!
//! Parses typed commands and keeps the start form (link and position
//! fields). Rendering is left to `main`.

use hirewatch_core::validation::{validate_form, FormValidation};

pub const HELP: &str = "\
Commands:
  link <url>          add a job link field
  position <title>    add a position field
  fields              show the current form
  reset               clear the form
  start               validate the form and start monitoring
  stop                stop monitoring
  status              refresh the running flag
  reconnect           reconnect the log stream now
  log                 print the session log
  clear               clear the session log
  help                show this text
  quit                exit";

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    AddLink(String),
    AddPosition(String),
    ShowFields,
    Reset,
    Start,
    Stop,
    Status,
    Reconnect,
    ShowLog,
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command `{0}`, type `help` for a list")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UiCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "link" => UiCommand::AddLink(argument("link", rest)?),
        "position" => UiCommand::AddPosition(argument("position", rest)?),
        "fields" => UiCommand::ShowFields,
        "reset" => UiCommand::Reset,
        "start" => UiCommand::Start,
        "stop" => UiCommand::Stop,
        "status" => UiCommand::Status,
        "reconnect" => UiCommand::Reconnect,
        "log" => UiCommand::ShowLog,
        "clear" => UiCommand::Clear,
        "help" | "?" => UiCommand::Help,
        "quit" | "exit" => UiCommand::Quit,
        _ => return Err(ParseError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}

fn argument(command: &'static str, rest: &str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument(command))
    } else {
        Ok(rest.to_string())
    }
}

/// The start form: link and position fields as typed.
///
/// Starts with one blank field of each kind, like an empty web form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub links: Vec<String>,
    pub positions: Vec<String>,
}

impl Default for Form {
    fn default() -> Self {
        Self {
            links: vec![String::new()],
            positions: vec![String::new()],
        }
    }
}

impl Form {
    pub fn add_link(&mut self, link: String) {
        fill(&mut self.links, link);
    }

    pub fn add_position(&mut self, position: String) {
        fill(&mut self.positions, position);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self, prefix: &str) -> FormValidation {
        validate_form(&self.links, &self.positions, prefix)
    }

    /// Human-readable listing of the fields.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (label, values) in [("links", &self.links), ("positions", &self.positions)] {
            out.push_str(label);
            out.push(':');
            for (i, value) in values.iter().enumerate() {
                let shown = if value.trim().is_empty() {
                    "<blank>"
                } else {
                    value.as_str()
                };
                out.push_str(&format!("\n  [{i}] {shown}"));
            }
            out.push('\n');
        }
        out
    }
}

/// Replace a lone blank field, otherwise append.
fn fill(fields: &mut Vec<String>, value: String) {
    match fields.as_mut_slice() {
        [only] if only.trim().is_empty() => *only = value,
        _ => fields.push(value),
    }
}

/// `field: message` lines for every violation.
pub fn format_violations(validation: &FormValidation) -> Vec<String> {
    validation
        .violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hirewatch_core::validation::{
        DEFAULT_HIRING_SITE_PREFIX, RULE_INVALID_PREFIX, RULE_REQUIRED,
    };

    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse_command("link  https://hiring.amazon/x ").unwrap(),
            Some(UiCommand::AddLink("https://hiring.amazon/x".into()))
        );
        assert_eq!(
            parse_command("position Warehouse Associate").unwrap(),
            Some(UiCommand::AddPosition("Warehouse Associate".into()))
        );
        assert_eq!(parse_command("START").unwrap(), Some(UiCommand::Start));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn rejects_unknown_and_incomplete_commands() {
        assert_matches!(parse_command("launch"), Err(ParseError::Unknown(w)) if w == "launch");
        assert_matches!(parse_command("link"), Err(ParseError::MissingArgument("link")));
    }

    #[test]
    fn first_value_replaces_blank_field() {
        let mut form = Form::default();
        form.add_link("https://hiring.amazon/a".into());
        form.add_link("https://hiring.amazon/b".into());
        assert_eq!(
            form.links,
            vec!["https://hiring.amazon/a", "https://hiring.amazon/b"]
        );
        assert_eq!(form.positions, vec![""]);

        form.reset();
        assert_eq!(form, Form::default());
    }

    #[test]
    fn blank_form_has_two_required_violations() {
        let validation = Form::default().validate(DEFAULT_HIRING_SITE_PREFIX);

        assert_eq!(validation.violations.len(), 2);
        assert!(validation
            .violations
            .iter()
            .all(|v| v.rule_type == RULE_REQUIRED));
        assert_eq!(
            format_violations(&validation),
            vec!["links[0]: A link is required", "positions[0]: A position is required"]
        );
    }

    #[test]
    fn foreign_link_is_rejected() {
        let mut form = Form::default();
        form.add_link("https://careers.other.com/x".into());
        form.add_position("Engineer".into());

        let validation = form.validate(DEFAULT_HIRING_SITE_PREFIX);
        assert!(!validation.is_valid());
        assert_eq!(validation.violations[0].rule_type, RULE_INVALID_PREFIX);
    }

    #[test]
    fn complete_form_is_valid() {
        let mut form = Form::default();
        form.add_link("https://hiring.amazon/x".into());
        form.add_position("Engineer".into());

        assert!(form.validate(DEFAULT_HIRING_SITE_PREFIX).is_valid());
        assert!(form.describe().contains("[0] Engineer"));
    }
}
