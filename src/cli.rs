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

//! Command line surface. Parses and validates arguments into `SessionParams`
//! and a `GatewayConfig`; nothing here talks to the device.

use crate::adb::GatewayConfig;
use crate::session::{SessionParams, DEBUG_SERVER_NAME};
use crate::vscode::MarkerPair;
use anyhow::{bail, Result};
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

/// Set up VSCode debugging for a native (JNI) Android project.
///
/// adb must be installed and on PATH (or given with --adb).
#[derive(Parser, Debug)]
#[command(name = "jni-debug", version)]
pub struct Cli {
    /// The adb device id to connect to (check `adb devices -l`)
    #[arg(long)]
    pub device: Option<String>,

    /// Path to the target architecture lldb-server
    #[arg(long = "lldb")]
    pub lldb: PathBuf,

    /// The name of the package for the app
    #[arg(long = "package")]
    pub package: String,

    /// The name of the activity to run
    #[arg(long)]
    pub activity: String,

    /// The location of the native library to debug
    #[arg(long = "debug")]
    pub debug: PathBuf,

    /// The location of the VSCode launch.json
    #[arg(long = "vscode")]
    pub vscode: PathBuf,

    /// The name to use for the VSCode run configuration
    #[arg(long, default_value = "Go Mobile Debugging")]
    pub config: String,

    /// The port number to listen on
    #[arg(long, default_value_t = 23456)]
    pub port: u16,

    /// Pause app execution and wait for the debugger
    #[arg(long, default_value_t = false)]
    pub wait: bool,

    /// Use verbose logging
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// adb executable to run
    #[arg(long, default_value = "adb")]
    pub adb: PathBuf,

    /// Line marking the start of the generated block in launch.json
    #[arg(long, default_value = MarkerPair::DEFAULT_BEGIN)]
    pub begin_marker: String,

    /// Line marking the end of the generated block in launch.json
    #[arg(long, default_value = MarkerPair::DEFAULT_END)]
    pub end_marker: String,
}

impl Cli {
    /// Check the arguments and build the immutable session parameters.
    pub fn session_params(&self) -> Result<SessionParams> {
        check_debug_server(&self.lldb)?;
        check_package(&self.package)?;
        if self.activity.trim().is_empty() {
            bail!("No activity was provided");
        }
        if self.debug.as_os_str().is_empty() {
            bail!("No debug target was provided");
        }
        if self.vscode.as_os_str().is_empty() {
            bail!("The location of launch.json was not provided");
        }
        if self.begin_marker.trim().is_empty() || self.end_marker.trim().is_empty() {
            bail!("Marker lines must not be blank");
        }

        Ok(SessionParams {
            device: self.device.clone().filter(|d| !d.is_empty()),
            package: self.package.clone(),
            activity: self.activity.clone(),
            debug_server: self.lldb.clone(),
            symbol_file: self.debug.clone(),
            port: self.port,
            wait_for_debugger: self.wait,
            config_name: self.config.clone(),
            launch_file: self.vscode.clone(),
            markers: MarkerPair::new(self.begin_marker.trim(), self.end_marker.trim()),
        })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            program: self.adb.clone(),
            verbose: self.verbose,
        }
    }
}

fn check_debug_server(path: &std::path::Path) -> Result<()> {
    let named_right = path
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(DEBUG_SERVER_NAME))
        .unwrap_or(false);
    if !named_right || !path.is_file() {
        bail!("No LLDB was found at {}", path.display());
    }
    Ok(())
}

/// The package id is pasted into whitespace-split shell commands, so only plain
/// dotted Java identifiers are accepted.
fn check_package(package: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$")?;
    if !re.is_match(package) {
        bail!("'{}' is not a valid application package name", package);
    }
    Ok(())
}
