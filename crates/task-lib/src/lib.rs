#![doc = include_str!("../README.md")]
//!
//! ## Modules
//!
//! - [`command`] - Logging command formatting and parsing
//! - [`error`] - Error types
//! - [`glob`] - Glob pattern compilation and brace expansion
//! - [`publish`] - Test result and code coverage publishing
//! - [`result`] - Task result reporting
//! - [`task`] - The task context
//! - [`toolrunner`] - External tool execution
//! - [`vars`] - Job variables
//!
//! Inputs, endpoints, localization, filesystem helpers, traversal and
//! pattern matching are methods on [`Task`].

pub mod command;
mod endpoint;
pub mod error;
mod find;
mod fs;
pub mod glob;
mod input;
mod loc;
mod matching;
pub mod publish;
pub mod result;
pub mod task;
pub mod toolrunner;
pub mod vars;

#[cfg(test)]
mod test_utils;

pub use command::TaskCommand;
pub use endpoint::EndpointAuthorization;
pub use error::{Error, Result};
pub use find::FindOptions;
pub use fs::{CopyOptions, LsOptions, MoveOptions, WriteOptions, os_type};
pub use glob::{MatchOptions, Pattern, match_list};
pub use matching::filter;
pub use publish::{CodeCoverageEnabler, CodeCoveragePublisher, TestPublisher, TestRunOptions};
pub use result::TaskResult;
pub use task::Task;
pub use toolrunner::{Args, ExecOptions, ExecResult, LineListener, ToolRunner};
pub use vars::{VariableInfo, variable_key};
