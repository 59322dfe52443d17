//! Logging command formatting and parsing.
//!
//! The agent reads task progress from lines of the form
//! `##vso[area.event key=value;key=value;]message` on standard output.

use std::fmt;

use crate::error::{Error, Result};

const COMMAND_PREFIX: &str = "##vso[";

/// A single logging command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCommand {
    /// Command name, e.g. `task.setvariable`.
    pub command: String,
    /// Properties in emission order. Empty values are not written.
    pub properties: Vec<(String, String)>,
    /// Free-form message following the closing bracket.
    pub message: String,
}

impl TaskCommand {
    /// Creates a command with no properties.
    #[must_use]
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            properties: Vec::new(),
            message: message.into(),
        }
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Returns the value of a property, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parses a logging command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] if the line does not start with
    /// `##vso[`, has no closing bracket, or has an empty command name.
    ///
    /// # Examples
    ///
    /// ```
    /// use task_lib::TaskCommand;
    ///
    /// let cmd = TaskCommand::parse("##vso[task.issue type=warning;]careful").unwrap();
    /// assert_eq!(cmd.command, "task.issue");
    /// assert_eq!(cmd.get("type"), Some("warning"));
    /// assert_eq!(cmd.message, "careful");
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line
            .strip_prefix(COMMAND_PREFIX)
            .ok_or_else(|| Error::InvalidCommand(line.to_string()))?;
        let close = rest
            .find(']')
            .ok_or_else(|| Error::InvalidCommand(line.to_string()))?;
        let (head, message) = (&rest[..close], &rest[close + 1..]);

        let (command, props) = match head.split_once(' ') {
            Some((command, props)) => (command, props),
            None => (head, ""),
        };
        if command.is_empty() {
            return Err(Error::InvalidCommand(line.to_string()));
        }

        let mut properties = Vec::new();
        for prop in props.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = prop.split_once('=').unwrap_or((prop, ""));
            properties.push((key.to_string(), unescape_property(value)));
        }

        Ok(Self {
            command: command.to_string(),
            properties,
            message: unescape_data(message),
        })
    }
}

impl fmt::Display for TaskCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_PREFIX}{}", self.command)?;
        let mut props = self.properties.iter().filter(|(_, v)| !v.is_empty()).peekable();
        if props.peek().is_some() {
            f.write_str(" ")?;
            for (key, value) in props {
                write!(f, "{key}={};", escape_property(value))?;
            }
        }
        write!(f, "]{}", escape_data(&self.message))
    }
}

fn escape_data(s: &str) -> String {
    s.replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(']', "%5D").replace(';', "%3B")
}

fn unescape_data(s: &str) -> String {
    s.replace("%0D", "\r").replace("%0A", "\n")
}

fn unescape_property(s: &str) -> String {
    unescape_data(s).replace("%5D", "]").replace("%3B", ";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_command_without_properties() {
        let cmd = TaskCommand::new("task.debug", "hello");
        assert_eq!(cmd.to_string(), "##vso[task.debug]hello");
    }

    #[test]
    fn formats_properties_in_order() {
        let cmd = TaskCommand::new("task.setvariable", "v")
            .property("variable", "a")
            .property("issecret", "true");
        assert_eq!(
            cmd.to_string(),
            "##vso[task.setvariable variable=a;issecret=true;]v"
        );
    }

    #[test]
    fn skips_empty_property_values() {
        let cmd = TaskCommand::new("task.complete", "done")
            .property("result", "Succeeded")
            .property("empty", "");
        assert_eq!(cmd.to_string(), "##vso[task.complete result=Succeeded;]done");

        let only_empty = TaskCommand::new("task.debug", "x").property("a", "");
        assert_eq!(only_empty.to_string(), "##vso[task.debug]x");
    }

    #[test]
    fn escapes_message_and_properties() {
        let cmd = TaskCommand::new("task.issue", "line1\r\nline2").property("type", "a;b]c\n");
        assert_eq!(
            cmd.to_string(),
            "##vso[task.issue type=a%3Bb%5Dc%0A;]line1%0D%0Aline2"
        );
    }

    #[test]
    fn parse_reverses_formatting() {
        let cmd = TaskCommand::new("task.issue", "multi\nline")
            .property("type", "error")
            .property("sourcepath", "a;b]");
        let parsed = TaskCommand::parse(&cmd.to_string()).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn parse_rejects_plain_output() {
        assert!(TaskCommand::parse("building...").is_err());
        assert!(TaskCommand::parse("##vso[task.debug missing bracket").is_err());
        assert!(TaskCommand::parse("##vso[]msg").is_err());
    }
}
