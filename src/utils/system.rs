// file: src/utils/system.rs
// version: 1.0.0
// guid: f33408ff-9ad7-4179-9244-8fcd568fde59

//! System utility functions

use crate::Result;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

/// Commands needed on every platform: decompressor, raw copy, and the
/// configuration-management runner used after the Pi comes up.
pub const BASE_REQUIRED_COMMANDS: &[&str] = &["xz", "dd", "ansible-playbook"];

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Return every command from the list that is not resolvable
    pub fn missing_commands<'a, I>(commands: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        commands
            .into_iter()
            .filter(|cmd| !Self::command_exists(cmd))
            .map(str::to_string)
            .collect()
    }

    /// Fail with every missing command named
    pub fn check_prerequisites<'a, I>(commands: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let missing = Self::missing_commands(commands);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::error::PrepperError::MissingCommands(missing))
        }
    }

    /// Check if running as root
    pub fn is_root() -> bool {
        #[cfg(unix)]
        {
            unsafe { libc::geteuid() == 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Real user and group ids of this process
    pub fn user_ids() -> (u32, u32) {
        #[cfg(unix)]
        {
            unsafe { (libc::getuid(), libc::getgid()) }
        }
        #[cfg(not(unix))]
        {
            (0, 0)
        }
    }

    /// Build a command that runs through sudo unless we are already root
    pub fn privileged(program: &str) -> Command {
        if Self::is_root() {
            Command::new(program)
        } else {
            let mut cmd = Command::new("sudo");
            cmd.arg(program);
            cmd
        }
    }

    /// Run a program and return its stdout; non-zero exit is an error
    pub async fn run(program: &str, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Self::output(cmd, &describe(program, args)).await
    }

    /// Run a prepared command capturing output; non-zero exit is an error
    pub async fn output(mut cmd: Command, description: &str) -> Result<String> {
        debug!("Executing: {}", description);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| crate::error::PrepperError::ProcessError {
                command: description.to_string(),
                exit_code: None,
                stderr: format!("Failed to execute command: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let exit_code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Command failed with exit code {:?}", exit_code);
            if !stderr.trim().is_empty() {
                error!("STDERR: {}", stderr.trim());
            }

            return Err(crate::error::PrepperError::ProcessError {
                command: description.to_string(),
                exit_code,
                stderr: if stderr.trim().is_empty() {
                    stdout
                } else {
                    stderr.to_string()
                },
            });
        }

        Ok(stdout)
    }

    /// Run a prepared command with the terminal attached, for tools that draw progress
    pub async fn run_attached(mut cmd: Command, description: &str) -> Result<()> {
        debug!("Executing (attached): {}", description);

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| crate::error::PrepperError::ProcessError {
                command: description.to_string(),
                exit_code: None,
                stderr: format!("Failed to execute command: {}", e),
            })?;

        if !status.success() {
            return Err(crate::error::PrepperError::ProcessError {
                command: description.to_string(),
                exit_code: status.code(),
                stderr: "see output above".to_string(),
            });
        }

        Ok(())
    }
}

/// Render a program and its arguments for logs and error messages
pub fn describe(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
