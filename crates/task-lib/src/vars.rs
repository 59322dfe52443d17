//! Job variables.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;

use serde::{Deserialize, Serialize};

use crate::command::TaskCommand;
use crate::task::{Task, lock};

const SECRET_PREFIX: &str = "SECRET_";
const PUBLIC_VARIABLES: &str = "VSTS_PUBLIC_VARIABLES";
const SECRET_VARIABLES: &str = "VSTS_SECRET_VARIABLES";
const MASK: &str = "********";

/// Snapshot of a variable at the time [`Task::get_variables`] was called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Variable name as defined on the pipeline, when known.
    pub name: String,
    /// Current value.
    pub value: String,
    /// Whether the variable is secret.
    pub secret: bool,
}

#[derive(Debug, Clone)]
struct KnownVariable {
    name: String,
    secret: bool,
}

/// Formats a variable name the way the agent maps it to an environment key.
///
/// ```
/// assert_eq!(task_lib::variable_key("build.sourcesDirectory"), "BUILD_SOURCESDIRECTORY");
/// assert_eq!(task_lib::variable_key("my var"), "MY_VAR");
/// ```
#[must_use]
pub fn variable_key(name: &str) -> String {
    name.replace(['.', ' '], "_").to_uppercase()
}

/// Secret keys in the process environment. Spawned tools would otherwise
/// inherit them.
pub(crate) fn secret_env_keys() -> impl Iterator<Item = OsString> {
    std::env::vars_os()
        .map(|(key, _)| key)
        .filter(|key| key.to_string_lossy().starts_with(SECRET_PREFIX))
}

/// Environment snapshot with secrets split out.
#[derive(Debug, Default)]
pub(crate) struct VariableStore {
    env: HashMap<String, String>,
    secrets: HashMap<String, String>,
    known: BTreeMap<String, KnownVariable>,
    exported: BTreeMap<String, String>,
}

impl VariableStore {
    pub(crate) fn load(vars: impl Iterator<Item = (String, String)>) -> Self {
        let mut store = Self {
            env: vars.collect(),
            ..Self::default()
        };

        for name in store.name_list(SECRET_VARIABLES) {
            let key = variable_key(&name);
            if let Some(value) = store.env.remove(&format!("{SECRET_PREFIX}{key}")) {
                store.secrets.insert(key.clone(), value);
            }
            store.known.insert(key, KnownVariable { name, secret: true });
        }

        // Agents older than 2.104.1 only pass SECRET_ keys.
        let legacy: Vec<String> = store
            .env
            .keys()
            .filter(|k| k.starts_with(SECRET_PREFIX))
            .cloned()
            .collect();
        for env_key in legacy {
            let key = env_key[SECRET_PREFIX.len()..].to_string();
            if let Some(value) = store.env.remove(&env_key) {
                store.secrets.insert(key.clone(), value);
            }
            store.known.entry(key.clone()).or_insert(KnownVariable {
                name: key,
                secret: true,
            });
        }

        for name in store.name_list(PUBLIC_VARIABLES) {
            store.known.insert(
                variable_key(&name),
                KnownVariable {
                    name,
                    secret: false,
                },
            );
        }

        store
    }

    fn name_list(&self, key: &str) -> Vec<String> {
        let Some(raw) = self.env.get(key) else {
            return Vec::new();
        };
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!("ignoring malformed {key}: {e}");
            Vec::new()
        })
    }

    /// Raw environment lookup (inputs, endpoints).
    pub(crate) fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    fn get(&self, key: &str) -> Option<(&str, bool)> {
        match self.known.get(key) {
            Some(known) if known.secret => self.secrets.get(key).map(|v| (v.as_str(), true)),
            _ => self.env.get(key).map(|v| (v.as_str(), false)),
        }
    }

    /// Public variables set at runtime, exported to spawned tools.
    pub(crate) fn exported(&self) -> impl Iterator<Item = (&String, &String)> {
        self.exported.iter()
    }
}

impl Task {
    /// Gets a variable defined on the pipeline or set at runtime.
    ///
    /// Secret values are never echoed to the debug log.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<String> {
        let key = variable_key(name);
        let (value, secret) = {
            let vars = lock(&self.vars);
            match vars.get(&key) {
                Some((v, secret)) => (Some(v.to_string()), secret),
                None => (None, false),
            }
        };
        match (&value, secret) {
            (Some(_), true) => self.debug(format!("{name}={MASK}")),
            (Some(v), false) => self.debug(format!("{name}={v}")),
            (None, _) => self.debug(format!("{name}=undefined")),
        }
        value
    }

    /// Gets a snapshot of every known job variable, sorted by name.
    ///
    /// On agents older than 2.104.1 only public variables set at runtime are
    /// known, and secret variables are named by their environment key.
    #[must_use]
    pub fn get_variables(&self) -> Vec<VariableInfo> {
        let vars = lock(&self.vars);
        let mut infos: Vec<VariableInfo> = vars
            .known
            .iter()
            .map(|(key, known)| VariableInfo {
                name: known.name.clone(),
                value: vars.get(key).map(|(v, _)| v.to_string()).unwrap_or_default(),
                secret: known.secret,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Sets a variable that is also available to subsequent tasks.
    pub fn set_variable(&self, name: &str, value: &str, secret: bool) {
        let key = variable_key(name);
        {
            let mut vars = lock(&self.vars);
            if secret {
                vars.env.remove(&key);
                vars.exported.remove(&key);
                vars.secrets.insert(key.clone(), value.to_string());
            } else {
                vars.secrets.remove(&key);
                vars.env.insert(key.clone(), value.to_string());
                vars.exported.insert(key.clone(), value.to_string());
            }
            vars.known.insert(
                key,
                KnownVariable {
                    name: name.to_string(),
                    secret,
                },
            );
        }

        let shown = if secret { MASK } else { value };
        self.debug(format!("set {name}={shown}"));

        let mut cmd = TaskCommand::new("task.setvariable", value).property("variable", name);
        if secret {
            cmd = cmd.property("issecret", "true");
        }
        self.write_command(&cmd);
    }
}
