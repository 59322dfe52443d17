//! Test result and code coverage publishing commands.

use std::collections::BTreeMap;
use std::path::Path;

use crate::task::Task;

fn join_paths<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn flag(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Optional properties of a published test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRunOptions {
    /// Merge all result files into one run.
    pub merge_results: Option<bool>,
    /// Build platform, such as `x64`.
    pub platform: Option<String>,
    /// Build configuration, such as `Release`.
    pub config: Option<String>,
    /// Title of the test run.
    pub run_title: Option<String>,
    /// Upload the result files as run attachments.
    pub publish_run_attachments: Option<bool>,
}

/// Publishes test result files produced by a test runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPublisher {
    /// Result format, such as `JUnit`, `NUnit`, `VSTest` or `XUnit`.
    pub test_runner: String,
}

impl TestPublisher {
    /// Creates a publisher for results in the `test_runner` format.
    pub fn new(test_runner: impl Into<String>) -> Self {
        Self {
            test_runner: test_runner.into(),
        }
    }

    /// Emits a `results.publish` command for `result_files`.
    pub fn publish<P: AsRef<Path>>(&self, task: &Task, result_files: &[P], options: &TestRunOptions) {
        let properties = [
            ("type", self.test_runner.clone()),
            ("mergeResults", flag(options.merge_results)),
            ("platform", options.platform.clone().unwrap_or_default()),
            ("config", options.config.clone().unwrap_or_default()),
            ("runTitle", options.run_title.clone().unwrap_or_default()),
            ("publishRunAttachments", flag(options.publish_run_attachments)),
            ("resultFiles", join_paths(result_files)),
        ];
        task.command("results.publish", properties, "");
    }
}

/// Publishes a code coverage summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeCoveragePublisher;

impl CodeCoveragePublisher {
    /// Creates a publisher; the summary and tool are given per call.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Emits a `codecoverage.publish` command.
    pub fn publish<P: AsRef<Path>>(
        &self,
        task: &Task,
        code_coverage_tool: &str,
        summary_file: impl AsRef<Path>,
        report_directory: Option<&Path>,
        additional_files: &[P],
    ) {
        let properties = [
            ("codecoveragetool", code_coverage_tool.to_string()),
            ("summaryfile", summary_file.as_ref().display().to_string()),
            (
                "reportdirectory",
                report_directory
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            ),
            ("additionalcodecoveragefiles", join_paths(additional_files)),
        ];
        task.command("codecoverage.publish", properties, "");
    }
}

/// Enables code coverage collection for a build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCoverageEnabler {
    build_tool: String,
    cc_tool: String,
}

impl CodeCoverageEnabler {
    /// `build_tool` is e.g. `Ant`, `Maven` or `Gradle`; `cc_tool` is e.g.
    /// `JaCoCo` or `Cobertura`.
    pub fn new(build_tool: impl Into<String>, cc_tool: impl Into<String>) -> Self {
        Self {
            build_tool: build_tool.into(),
            cc_tool: cc_tool.into(),
        }
    }

    /// Emits a `codecoverage.enable` command carrying `build_props`.
    pub fn enable_code_coverage(&self, task: &Task, build_props: &BTreeMap<String, String>) {
        let mut properties: Vec<(String, String)> = build_props
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "buildtool" | "codecoveragetool"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        properties.push(("buildtool".into(), self.build_tool.clone()));
        properties.push(("codecoveragetool".into(), self.cc_tool.clone()));
        task.command("codecoverage.enable", properties, "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{captured_task, commands};

    #[test]
    fn publishes_test_results() {
        let (task, out) = captured_task(&[]);
        let options = TestRunOptions {
            merge_results: Some(true),
            platform: Some("x64".into()),
            run_title: Some("unit; fast".into()),
            ..TestRunOptions::default()
        };
        TestPublisher::new("JUnit").publish(&task, &["/r/a.xml", "/r/b.xml"], &options);

        assert_eq!(
            out.contents(),
            "##vso[results.publish type=JUnit;mergeResults=true;platform=x64;\
             runTitle=unit%3B fast;resultFiles=/r/a.xml,/r/b.xml;]\n"
        );
    }

    #[test]
    fn publishes_code_coverage() {
        let (task, out) = captured_task(&[]);
        CodeCoveragePublisher::new().publish(
            &task,
            "Cobertura",
            "/r/coverage.xml",
            Some(Path::new("/r/html")),
            &["/r/extra.exec"],
        );
        let cmd = &commands(&out)[0];
        assert_eq!(cmd.command, "codecoverage.publish");
        assert_eq!(cmd.get("codecoveragetool"), Some("Cobertura"));
        assert_eq!(cmd.get("summaryfile"), Some("/r/coverage.xml"));
        assert_eq!(cmd.get("reportdirectory"), Some("/r/html"));
        assert_eq!(cmd.get("additionalcodecoveragefiles"), Some("/r/extra.exec"));
    }

    #[test]
    fn enables_code_coverage_with_build_properties() {
        let (task, out) = captured_task(&[]);
        let props = BTreeMap::from([
            ("buildfile".to_string(), "pom.xml".to_string()),
            ("classfilter".to_string(), "+:com.*".to_string()),
        ]);
        CodeCoverageEnabler::new("Maven", "JaCoCo").enable_code_coverage(&task, &props);

        let cmd = &commands(&out)[0];
        assert_eq!(cmd.command, "codecoverage.enable");
        assert_eq!(cmd.get("buildfile"), Some("pom.xml"));
        assert_eq!(cmd.get("classfilter"), Some("+:com.*"));
        assert_eq!(cmd.get("buildtool"), Some("Maven"));
        assert_eq!(cmd.get("codecoveragetool"), Some("JaCoCo"));
    }
}
