//! Task result reporting.

use std::fmt;

use crate::command::TaskCommand;
use crate::task::{Task, lock};

/// Outcome of a task, ordered from most to least optimistic.
///
/// The derived ordering is what makes results sticky: the greatest
/// result ever reported is the one that stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskResult {
    /// The task completed without problems.
    #[default]
    Succeeded,
    /// The task completed but reported problems worth a look.
    SucceededWithIssues,
    /// The task failed.
    Failed,
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::SucceededWithIssues => write!(f, "SucceededWithIssues"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl Task {
    /// Sets the result of the task. Execution continues.
    ///
    /// If never called the task is `Succeeded`. When called several times
    /// the most pessimistic result wins regardless of call order. For
    /// `Failed`, `message` is also logged as an error issue.
    pub fn set_result(&self, result: TaskResult, message: impl AsRef<str>) {
        let message = message.as_ref();
        self.debug(format!("task result: {result}"));

        if result == TaskResult::Failed && !message.is_empty() {
            self.error(message);
        }

        self.write_command(
            &TaskCommand::new("task.complete", message).property("result", result.to_string()),
        );

        let mut current = lock(&self.result);
        *current = Some(current.map_or(result, |prev| prev.max(result)));
    }

    /// Returns the effective result: the most pessimistic one reported so far.
    #[must_use]
    pub fn result(&self) -> TaskResult {
        lock(&self.result).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{captured_task, commands};

    const ALL: [TaskResult; 3] = [
        TaskResult::Succeeded,
        TaskResult::SucceededWithIssues,
        TaskResult::Failed,
    ];

    #[test]
    fn defaults_to_succeeded() {
        let (task, _) = captured_task(&[]);
        assert_eq!(task.result(), TaskResult::Succeeded);
    }

    #[test]
    fn most_pessimistic_result_wins_in_any_order() {
        for first in ALL {
            for second in ALL {
                for third in ALL {
                    let (task, _) = captured_task(&[]);
                    task.set_result(first, "");
                    task.set_result(second, "");
                    task.set_result(third, "");
                    assert_eq!(task.result(), first.max(second).max(third));
                }
            }
        }
    }

    #[test]
    fn failed_result_logs_error_issue_and_completes() {
        let (task, out) = captured_task(&[]);
        task.set_result(TaskResult::Failed, "compilation failed");

        let cmds = commands(&out);
        let issue = cmds.iter().find(|c| c.command == "task.issue").unwrap();
        assert_eq!(issue.get("type"), Some("error"));
        assert_eq!(issue.message, "compilation failed");

        let complete = cmds.iter().find(|c| c.command == "task.complete").unwrap();
        assert_eq!(complete.get("result"), Some("Failed"));
        assert_eq!(complete.message, "compilation failed");
    }

    #[test]
    fn succeeded_result_does_not_log_issue() {
        let (task, out) = captured_task(&[]);
        task.set_result(TaskResult::Succeeded, "all good");
        assert!(!commands(&out).iter().any(|c| c.command == "task.issue"));
    }
}
