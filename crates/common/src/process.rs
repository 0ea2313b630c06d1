//! External processes with a deadline.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

/// Why an external process produced no output.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to start: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Run `command` to completion. The child is killed once `timeout` elapses.
pub async fn output_with_timeout(mut command: Command, timeout: Duration) -> Result<Output, CommandError> {
    command.kill_on_drop(true);
    match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CommandError::TimedOut(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo ready"]);
        let output = output_with_timeout(command, Duration::from_secs(10)).await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ready");
    }

    #[tokio::test]
    async fn test_hung_process_times_out() {
        let mut command = Command::new("sleep");
        command.arg("30");
        let started = Instant::now();
        let err = output_with_timeout(command, Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, CommandError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let command = Command::new("reelforge-definitely-missing-binary");
        let err = output_with_timeout(command, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn(_)));
    }
}
