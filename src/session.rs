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

//! Session orchestration: the fixed sequence of device steps that ends with
//! `lldb-server` listening inside the application's sandbox and VSCode holding
//! a matching attach configuration.
//!
//! ```text
//! 1 stop previous server   (best effort, never aborts)
//! 2 deploy                 -> Deploy
//! 3 wait-for-debugger flag -> Configure
//! 4 port forward           -> Forward
//! 5 start app              -> Launch
//! 6 find app pid           -> PidNotFound
//! 7 write launch.json      -> ConfigWrite
//! 8 start lldb-server      -> ServerStart
//! ```
//!
//! The first failing step stops the run. Nothing already done on the device is undone.

use crate::adb::process_list::{find_pid, ProcessLookupError, ProcessPattern};
use crate::adb::{CommandRunner, Gateway, GatewayError};
use crate::vscode::{self, AttachConfig, ConfigWriteError, MarkerPair};
use log::{info, warn};
use std::fmt;
use std::path::PathBuf;

pub const DEBUG_SERVER_NAME: &str = "lldb-server";
/// World-writable staging directory used before copying into the app sandbox.
pub const DEVICE_STAGING_DIR: &str = "/data/local/tmp";
const WAIT_FOR_DEBUGGER_PROP: &str = "debug.debuggerd.wait_for_debugger";

/// Everything one run needs, validated by the caller and never changed afterwards.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// adb serial; `None` targets the only attached device.
    pub device: Option<String>,
    pub package: String,
    pub activity: String,
    /// Host path of the `lldb-server` binary to deploy.
    pub debug_server: PathBuf,
    /// Host path of the native library the debugger loads symbols from.
    pub symbol_file: PathBuf,
    pub port: u16,
    pub wait_for_debugger: bool,
    pub config_name: String,
    pub launch_file: PathBuf,
    pub markers: MarkerPair,
}

impl SessionParams {
    fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Where the server lives inside the application's private data directory.
    pub fn server_path(&self) -> String {
        format!("/data/data/{}/{}", self.package, DEBUG_SERVER_NAME)
    }
}

/// The ordered steps of a session. Only `StopPreviousServer` is allowed to fail silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    StopPreviousServer,
    Deploy,
    Configure,
    Forward,
    Launch,
    FindPid,
    WriteConfig,
    StartServer,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::StopPreviousServer => "stop previous debug server",
            Step::Deploy => "deploy debug server",
            Step::Configure => "set wait-for-debugger",
            Step::Forward => "forward debug port",
            Step::Launch => "start application",
            Step::FindPid => "find application pid",
            Step::WriteConfig => "write VSCode launch configuration",
            Step::StartServer => "start debug server",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PidError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Lookup(#[from] ProcessLookupError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to push lldb-server to the device")]
    Deploy(#[source] GatewayError),
    #[error("failed to set the device to wait for debugger")]
    Configure(#[source] GatewayError),
    #[error("failed to forward the device port")]
    Forward(#[source] GatewayError),
    #[error("failed to start the app")]
    Launch(#[source] GatewayError),
    #[error("failed to get the app's PID")]
    PidNotFound(#[source] PidError),
    #[error("failed to write the VSCode launch configuration")]
    ConfigWrite(#[source] ConfigWriteError),
    #[error("failed to start lldb-server on the device")]
    ServerStart(#[source] GatewayError),
}

impl SessionError {
    pub fn step(&self) -> Step {
        match self {
            SessionError::Deploy(_) => Step::Deploy,
            SessionError::Configure(_) => Step::Configure,
            SessionError::Forward(_) => Step::Forward,
            SessionError::Launch(_) => Step::Launch,
            SessionError::PidNotFound(_) => Step::FindPid,
            SessionError::ConfigWrite(_) => Step::WriteConfig,
            SessionError::ServerStart(_) => Step::StartServer,
        }
    }

    /// Process exit status for this failure, one per ordered step.
    pub fn exit_code(&self) -> i32 {
        match self.step() {
            Step::StopPreviousServer => 0,
            Step::Deploy => 1,
            Step::Configure => 2,
            Step::Forward => 3,
            Step::Launch => 4,
            Step::FindPid => 5,
            Step::WriteConfig => 6,
            Step::StartServer => 7,
        }
    }
}

pub struct Session<'a, R: CommandRunner> {
    gateway: &'a Gateway<R>,
    params: &'a SessionParams,
}

impl<'a, R: CommandRunner> Session<'a, R> {
    pub fn new(gateway: &'a Gateway<R>, params: &'a SessionParams) -> Self {
        Self { gateway, params }
    }

    /// Run every step in order. Returns the discovered pid once the server has
    /// been started and exited cleanly.
    pub fn run(&self) -> Result<u32, SessionError> {
        self.stop_previous_server();

        self.deploy_server().map_err(SessionError::Deploy)?;
        self.set_wait_for_debugger().map_err(SessionError::Configure)?;
        self.forward_port().map_err(SessionError::Forward)?;
        self.start_app().map_err(SessionError::Launch)?;
        let pid = self.find_app_pid().map_err(SessionError::PidNotFound)?;
        self.write_launch_config(pid)
            .map_err(SessionError::ConfigWrite)?;

        info!(
            "Success! Now run the \"{}\" run configuration in VSCode to begin debugging!",
            self.params.config_name
        );
        self.start_server().map_err(SessionError::ServerStart)?;
        Ok(pid)
    }

    /// Kill a leftover server so the copy and the port bind do not collide with it.
    /// A missing server is the common case, so every failure here is only logged.
    pub fn stop_previous_server(&self) {
        if let Err(e) = self.try_stop_previous_server() {
            warn!("{}: {} (continuing)", Step::StopPreviousServer, describe(&e));
        }
    }

    fn try_stop_previous_server(&self) -> Result<(), PidError> {
        let listing = self.gateway.run_shell(self.params.device(), None, "ps -A")?;
        let pid = match find_pid(&listing, ProcessPattern::Executable(DEBUG_SERVER_NAME)) {
            Ok(pid) => pid,
            Err(ProcessLookupError::NoMatch { .. }) => {
                info!("No running {} found", DEBUG_SERVER_NAME);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        info!("Stopping previous {} (pid {})", DEBUG_SERVER_NAME, pid);
        self.gateway.run_shell(
            self.params.device(),
            Some(self.params.package.as_str()),
            &format!("kill -9 {}", pid),
        )?;
        Ok(())
    }

    pub fn deploy_server(&self) -> Result<(), GatewayError> {
        let staged = format!("{}/{}", DEVICE_STAGING_DIR, DEBUG_SERVER_NAME);
        info!("Pushing {} to {}", self.params.debug_server.display(), staged);
        self.gateway.push(
            self.params.device(),
            &self.params.debug_server.to_string_lossy(),
            &staged,
        )?;
        self.gateway.run_shell(
            self.params.device(),
            Some(self.params.package.as_str()),
            &format!("cp {} /data/data/{}/", staged, self.params.package),
        )?;
        Ok(())
    }

    pub fn set_wait_for_debugger(&self) -> Result<(), GatewayError> {
        self.gateway.run_shell(
            self.params.device(),
            None,
            &format!(
                "setprop {} {}",
                WAIT_FOR_DEBUGGER_PROP, self.params.wait_for_debugger
            ),
        )?;
        Ok(())
    }

    pub fn forward_port(&self) -> Result<(), GatewayError> {
        info!("Forwarding tcp:{}", self.params.port);
        self.gateway
            .forward_port(self.params.device(), self.params.port, self.params.port)
    }

    pub fn start_app(&self) -> Result<(), GatewayError> {
        info!("Starting {}/{}", self.params.package, self.params.activity);
        self.gateway.run_shell(
            self.params.device(),
            None,
            &format!("am start -n {}/{}", self.params.package, self.params.activity),
        )?;
        Ok(())
    }

    pub fn find_app_pid(&self) -> Result<u32, PidError> {
        let listing = self.gateway.run_shell(self.params.device(), None, "ps -A")?;
        let pid = find_pid(&listing, ProcessPattern::Exact(&self.params.package))?;
        info!("{} is running as pid {}", self.params.package, pid);
        Ok(pid)
    }

    pub fn write_launch_config(&self, pid: u32) -> Result<(), ConfigWriteError> {
        let symbol_file = self.params.symbol_file.to_string_lossy();
        let lines = vscode::generate_attach_config(&AttachConfig {
            name: &self.params.config_name,
            device: self.params.device(),
            port: self.params.port,
            pid,
            symbol_file: &symbol_file,
        });
        vscode::update_launch_file(&self.params.launch_file, &lines, &self.params.markers)?;
        info!(
            "Updated \"{}\" in {}",
            self.params.config_name,
            self.params.launch_file.display()
        );
        Ok(())
    }

    /// Blocks until the server exits.
    pub fn start_server(&self) -> Result<(), GatewayError> {
        self.gateway.run_shell(
            self.params.device(),
            Some(self.params.package.as_str()),
            &format!(
                "{} platform --server --listen \"*:{}\"",
                self.params.server_path(),
                self.params.port
            ),
        )?;
        Ok(())
    }
}

/// Render an error with its whole source chain on one line.
pub fn describe(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
