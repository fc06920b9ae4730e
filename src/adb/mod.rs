// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Device command gateway: every device-side operation goes through the external
//! `adb` executable. Each call composes one command line, runs it to completion
//! and hands back the captured stdout or a typed failure.

pub mod process_list;

use log::{debug, info};
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Captured result of one bridge invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit code, `None` when the child was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the bridge executable with an already split argument list.
///
/// The real implementation spawns a child process; tests swap in a scripted runner.
pub trait CommandRunner {
    fn run(&self, args: &[String]) -> io::Result<CommandOutput>;
}

/// Spawns the bridge executable and waits for it to exit.
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(&self.program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Why a single bridge invocation did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum CommandFailure {
    #[error("could not run the device bridge: {0}")]
    Spawn(#[source] io::Error),
    #[error("device bridge exited with {}", exit_detail(.status, .stderr))]
    Exit {
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn exit_detail(status: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        describe_status(*status)
    } else {
        format!("{}: {}", describe_status(*status), stderr)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("file transfer `{command}` failed")]
    Transfer {
        command: String,
        #[source]
        cause: CommandFailure,
    },
    #[error("shell command `{command}` failed")]
    Shell {
        command: String,
        #[source]
        cause: CommandFailure,
    },
    #[error("port forward `{command}` failed")]
    Forward {
        command: String,
        #[source]
        cause: CommandFailure,
    },
}

/// Settings handed to the gateway by the caller instead of living in globals.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bridge executable, resolved on `PATH` when it is a bare name.
    pub program: PathBuf,
    /// Echo every command line and its captured output at `info` instead of `debug`.
    pub verbose: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("adb"),
            verbose: false,
        }
    }
}

pub struct Gateway<R: CommandRunner> {
    runner: R,
    verbose: bool,
}

impl Gateway<ProcessRunner> {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_runner(ProcessRunner::new(config.program), config.verbose)
    }
}

impl<R: CommandRunner> Gateway<R> {
    pub fn with_runner(runner: R, verbose: bool) -> Self {
        Self { runner, verbose }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Copy a local file onto the device.
    pub fn push(&self, device: Option<&str>, local: &str, remote: &str) -> Result<(), GatewayError> {
        let command = with_device(device, &format!("push {} {}", local, remote));
        self.invoke(&command)
            .map(|_| ())
            .map_err(|cause| GatewayError::Transfer { command, cause })
    }

    /// Forward a host TCP port to a device TCP port. Success only means adb
    /// accepted the request; nothing checks that anything is listening.
    pub fn forward_port(
        &self,
        device: Option<&str>,
        local_port: u16,
        remote_port: u16,
    ) -> Result<(), GatewayError> {
        let command = with_device(
            device,
            &format!("forward tcp:{} tcp:{}", local_port, remote_port),
        );
        self.invoke(&command)
            .map(|_| ())
            .map_err(|cause| GatewayError::Forward { command, cause })
    }

    /// Run `command` in a device shell, under the sandbox of `run_as` when one is
    /// given. Returns stdout as captured, untrimmed.
    pub fn run_shell(
        &self,
        device: Option<&str>,
        run_as: Option<&str>,
        command: &str,
    ) -> Result<String, GatewayError> {
        let command = with_device(device, &shell_command(run_as, command));
        self.invoke(&command)
            .map_err(|cause| GatewayError::Shell { command, cause })
    }

    fn invoke(&self, command_line: &str) -> Result<String, CommandFailure> {
        // Arguments are split on whitespace only; embedded spaces are not quoted.
        let args: Vec<String> = command_line.split_whitespace().map(String::from).collect();
        self.trace(format_args!("adb {}", args.join(" ")));

        let output = self.runner.run(&args).map_err(CommandFailure::Spawn)?;
        self.trace(format_args!(
            "adb completed ({}): {}",
            describe_status(output.status),
            output.stdout.trim_end()
        ));

        if output.success {
            Ok(output.stdout)
        } else {
            Err(CommandFailure::Exit {
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}

fn with_device(device: Option<&str>, command: &str) -> String {
    match device.filter(|d| !d.is_empty()) {
        Some(device) => format!("-s {} {}", device, command),
        None => command.to_string(),
    }
}

fn shell_command(run_as: Option<&str>, command: &str) -> String {
    match run_as.filter(|id| !id.is_empty()) {
        Some(id) => format!("shell run-as {} {}", id, command),
        None => format!("shell {}", command),
    }
}
