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

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use jni_debug_helper::cli::Cli;
use jni_debug_helper::session::{describe, Session};
use jni_debug_helper::Gateway;
use log::error;
use std::process::ExitCode;

/// Exit status for bad arguments (sysexits EX_USAGE), clear of the per-step codes.
const EXIT_USAGE: u8 = 64;

fn init_logger(verbose: bool) -> Result<LoggerHandle> {
    let level = if verbose { "debug" } else { "info" };
    // RUST_LOG wins over the command line when it is set
    Logger::try_with_env_or_str(level)
        .context("invalid log specification")?
        .log_to_stderr()
        .format(flexi_logger::colored_default_format)
        .start()
        .context("failed to start logger")
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let _logger = match init_logger(cli.verbose) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let params = match cli.session_params() {
        Ok(params) => params,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let gateway = Gateway::new(cli.gateway_config());
    match Session::new(&gateway, &params).run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} step failed: {}", e.step(), describe(&e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
