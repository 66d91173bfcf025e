//! On-joined program execution

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// A program to run when a host is joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTask {
    /// Program path or name
    pub program: String,
    /// Arguments with `${NICK}` already substituted
    pub args: Vec<String>,
}

impl JoinTask {
    /// Build from an `on_joined` template; `None` if the template is empty
    #[must_use]
    pub fn from_template(template: &[String], nick: &str) -> Option<Self> {
        let (program, args) = template.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.iter().map(|a| a.replace("${NICK}", nick)).collect(),
        })
    }
}

/// Runs join tasks without blocking the caller
pub trait TaskExecutor: Send + Sync {
    /// Start `task` in the background
    fn submit(&self, task: JoinTask);
}

/// Spawns join tasks as child processes on the tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl TaskExecutor for ProcessExecutor {
    fn submit(&self, task: JoinTask) {
        tokio::spawn(async move {
            debug!(program = %task.program, args = ?task.args, "running on-joined program");
            let status = Command::new(&task.program)
                .args(&task.args)
                .stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await;
            match status {
                Ok(status) if status.success() => {}
                Ok(status) => warn!(program = %task.program, %status, "on-joined program failed"),
                Err(e) => warn!(program = %task.program, error = %e, "could not run on-joined program"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_substitution() {
        let template = vec![
            "notify-send".to_string(),
            "Joined by ${NICK}".to_string(),
            "${NICK}${NICK}".to_string(),
        ];
        let task = JoinTask::from_template(&template, "reimu").unwrap();
        assert_eq!(task.program, "notify-send");
        assert_eq!(task.args, ["Joined by reimu", "reimureimu"]);

        assert_eq!(JoinTask::from_template(&[], "reimu"), None);
    }

    #[tokio::test]
    async fn test_missing_program_does_not_panic() {
        ProcessExecutor.submit(JoinTask {
            program: "/nonexistent/parvati-on-joined".to_string(),
            args: Vec::new(),
        });
        tokio::task::yield_now().await;
    }
}
