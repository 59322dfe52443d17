//! Task inputs.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::task::{Task, lock};

fn input_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

impl Task {
    /// Gets the trimmed value of an input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputRequired`] if `required` and the input is unset
    /// or blank.
    pub fn get_input(&self, name: &str, required: bool) -> Result<Option<String>> {
        let value = lock(&self.vars)
            .env(&input_key(name))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        if required && value.is_none() {
            return Err(Error::InputRequired(name.to_string()));
        }
        self.debug(format!("{name}={}", value.as_deref().unwrap_or("undefined")));
        Ok(value)
    }

    /// Gets an input as a boolean: `true` when its value is `"true"` in any case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputRequired`] if `required` and the input is unset.
    pub fn get_bool_input(&self, name: &str, required: bool) -> Result<bool> {
        Ok(self
            .get_input(name, required)?
            .is_some_and(|v| v.eq_ignore_ascii_case("true")))
    }

    /// Gets an input split on `delim`, with items trimmed and empty items removed.
    ///
    /// Meant for simple lists such as build targets. Tool argument strings
    /// should go through [`ToolRunner::line`](crate::ToolRunner::line), which
    /// honours quoting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputRequired`] if `required` and the input is unset.
    pub fn get_delimited_input(
        &self,
        name: &str,
        delim: &str,
        required: bool,
    ) -> Result<Vec<String>> {
        let Some(value) = self.get_input(name, required)? else {
            return Ok(Vec::new());
        };
        if delim.is_empty() {
            return Ok(vec![value]);
        }
        Ok(value
            .split(delim)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Gets a path input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputRequired`] if `required` and the input is unset,
    /// or [`Error::PathNotFound`] if `check` and the path does not exist.
    pub fn get_path_input(
        &self,
        name: &str,
        required: bool,
        check: bool,
    ) -> Result<Option<PathBuf>> {
        let Some(value) = self.get_input(name, required)? else {
            return Ok(None);
        };
        let path = PathBuf::from(value);
        if check {
            self.check_path(&path, name)?;
        }
        Ok(Some(path))
    }

    /// Returns whether the user supplied a value for a path input.
    ///
    /// Path pickers default to the repository root, so a value equal to the
    /// sources directory counts as not supplied.
    #[must_use]
    pub fn file_path_supplied(&self, name: &str) -> bool {
        let value = self
            .get_path_input(name, false, false)
            .ok()
            .flatten()
            .unwrap_or_default();
        let path = self.resolve([value]);

        let root = self
            .get_variable("build.sourcesDirectory")
            .or_else(|| self.get_variable("system.defaultWorkingDirectory"))
            .unwrap_or_default();
        let root = self.resolve([root]);

        let supplied = path != root;
        self.debug(format!("{name}path supplied :{supplied}"));
        supplied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{captured_task, captured_task_in};

    #[test]
    fn get_input_trims_value() {
        let (task, _) = captured_task(&[("INPUT_CONFIGURATION", "  Release \n")]);
        assert_eq!(
            task.get_input("configuration", false).unwrap().as_deref(),
            Some("Release")
        );
    }

    #[test]
    fn input_names_with_spaces_map_to_underscores() {
        let (task, _) = captured_task(&[("INPUT_BUILD_ARGS", "-v")]);
        assert_eq!(
            task.get_input("build args", true).unwrap().as_deref(),
            Some("-v")
        );
    }

    #[test]
    fn required_input_fails_when_unset() {
        let (task, _) = captured_task(&[("INPUT_BLANK", "   ")]);
        for name in ["missing", "blank"] {
            let err = task.get_input(name, true).unwrap_err();
            assert!(matches!(err, Error::InputRequired(ref n) if n == name));
            assert!(task.get_bool_input(name, true).is_err());
            assert!(task.get_delimited_input(name, ",", true).is_err());
            assert!(task.get_path_input(name, true, false).is_err());
        }
    }

    #[test]
    fn optional_input_is_none_when_unset() {
        let (task, _) = captured_task(&[]);
        assert_eq!(task.get_input("missing", false).unwrap(), None);
        assert!(!task.get_bool_input("missing", false).unwrap());
        assert!(task.get_delimited_input("missing", ",", false).unwrap().is_empty());
        assert_eq!(task.get_path_input("missing", false, true).unwrap(), None);
    }

    #[test]
    fn bool_input_is_case_insensitive() {
        let (task, _) = captured_task(&[
            ("INPUT_A", "TRUE"),
            ("INPUT_B", "True"),
            ("INPUT_C", "yes"),
        ]);
        assert!(task.get_bool_input("a", false).unwrap());
        assert!(task.get_bool_input("b", false).unwrap());
        assert!(!task.get_bool_input("c", false).unwrap());
    }

    #[test]
    fn delimited_input_drops_empty_items() {
        let (task, _) = captured_task(&[("INPUT_TARGETS", "build,, test ,package,")]);
        assert_eq!(
            task.get_delimited_input("targets", ",", false).unwrap(),
            vec!["build", "test", "package"]
        );
    }

    #[test]
    fn path_input_check_requires_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.sln"), "").unwrap();
        let (task, _) = captured_task_in(
            &[("INPUT_SOLUTION", "app.sln"), ("INPUT_OTHER", "nope.sln")],
            dir.path(),
        );

        assert_eq!(
            task.get_path_input("solution", true, true).unwrap(),
            Some(PathBuf::from("app.sln"))
        );
        let err = task.get_path_input("other", true, true).unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn file_path_supplied_compares_against_sources_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let (task, _) = captured_task_in(
            &[
                ("BUILD_SOURCESDIRECTORY", root),
                ("INPUT_ROOTONLY", root),
                ("INPUT_PROJECT", "src/app"),
            ],
            dir.path(),
        );

        assert!(!task.file_path_supplied("rootOnly"));
        assert!(task.file_path_supplied("project"));
        assert!(!task.file_path_supplied("unset"));
    }
}
