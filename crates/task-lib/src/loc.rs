//! Localized messages from a task.json resource file.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::task::{Task, lock};

const DEFAULT_CULTURE: &str = "en-US";
const RESJSON_PREFIX: &str = "loc.messages.";

#[derive(Debug, Deserialize)]
struct ResourceFile {
    messages: Option<HashMap<String, String>>,
}

impl Task {
    /// Loads localized messages from a task.json-style resource file.
    ///
    /// When the `system.culture` variable names a culture other than
    /// `en-US`, strings from
    /// `Strings/resources.resjson/<culture>/resources.resjson` next to the
    /// resource file override the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is not valid JSON, or has no
    /// `messages` object.
    pub fn set_resource_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve([path.as_ref()]);
        self.check_path(&path, "resource file path")?;
        self.debug(format!("set resource file to: {}", path.display()));

        let file: ResourceFile = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let mut messages = file
            .messages
            .ok_or_else(|| Error::InvalidResourceFile(path.clone()))?;

        let culture = self
            .get_variable("system.culture")
            .filter(|c| !c.is_empty() && c != DEFAULT_CULTURE);
        if let (Some(culture), Some(dir)) = (culture, path.parent()) {
            let resjson = dir
                .join("Strings")
                .join("resources.resjson")
                .join(&culture)
                .join("resources.resjson");
            if resjson.is_file() {
                self.debug(format!("load culture strings: {}", resjson.display()));
                let strings: HashMap<String, String> =
                    serde_json::from_str(&std::fs::read_to_string(&resjson)?)?;
                for (key, value) in strings {
                    if let Some(name) = key.strip_prefix(RESJSON_PREFIX) {
                        messages.insert(name.to_string(), value);
                    }
                }
            }
        }

        lock(&self.resources).extend(messages);
        Ok(())
    }

    /// Gets a localized string, formatted with `params`.
    ///
    /// Placeholders: `%s` (string), `%d` (number), `%j` (JSON), `%%`.
    /// Parameters without a placeholder are appended, separated by spaces.
    /// An unknown key logs a warning and is returned as-is.
    pub fn loc(&self, key: &str, params: &[&dyn std::fmt::Display]) -> String {
        let template = lock(&self.resources).get(key).cloned();
        let template = match template {
            Some(t) => t,
            None => {
                self.warning(format!("Can't find loc string for key: {key}"));
                key.to_string()
            }
        };
        let params: Vec<String> = params.iter().map(ToString::to_string).collect();
        format_message(&template, &params)
    }
}

pub(crate) fn format_message(template: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = params.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(&(spec @ ('s' | 'd' | 'j'))) => {
                let Some(param) = next.next() else {
                    out.push('%');
                    continue;
                };
                chars.next();
                match spec {
                    's' => out.push_str(param),
                    'd' => match param.trim().parse::<f64>() {
                        Ok(n) => out.push_str(&n.to_string()),
                        Err(_) => out.push_str("NaN"),
                    },
                    _ => out.push_str(&Value::String(param.clone()).to_string()),
                }
            }
            _ => out.push('%'),
        }
    }

    for param in next {
        out.push(' ');
        out.push_str(param);
    }
    out
}
