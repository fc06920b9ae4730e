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

//! VSCode `launch.json` support: the generated lldb attach stanza and the
//! read-splice-write update of the file on disk.

pub mod splice;

pub use splice::{splice, MarkerPair, SpliceError};

use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Values that end up in the generated attach stanza.
#[derive(Debug, Clone)]
pub struct AttachConfig<'a> {
    pub name: &'a str,
    /// Device serial; `None` lets lldb use the default adb device.
    pub device: Option<&'a str>,
    pub port: u16,
    pub pid: u32,
    /// Host-side copy of the native library, used for symbols.
    pub symbol_file: &'a str,
}

/// Build the attach stanza as literal lines.
///
/// Key order and quoting are fixed so the output matches hand-maintained files;
/// values are inserted as-is, without JSON escaping.
pub fn generate_attach_config(cfg: &AttachConfig<'_>) -> Vec<String> {
    // lldb's remote-android platform treats "localhost" as "whatever adb picks".
    let host = cfg.device.filter(|d| !d.is_empty()).unwrap_or("localhost");
    vec![
        "{".to_string(),
        format!("    \"name\": \"{}\",", cfg.name),
        "    \"type\": \"lldb\",".to_string(),
        "    \"request\": \"custom\",".to_string(),
        format!(
            "    \"initCommands\": [\"platform select remote-android\", \"file {}\"],",
            cfg.symbol_file
        ),
        format!(
            "    \"processCreateCommands\": [\"platform connect connect://{}:{}\", \"attach {}\"]",
            host, cfg.port, cfg.pid
        ),
        "}".to_string(),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigWriteError {
    #[error("failed to read launch file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to update launch file {}", .path.display())]
    Splice {
        path: PathBuf,
        #[source]
        source: SpliceError,
    },
    #[error("failed to write launch file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read `path`, replace its marked region with `generated` and write it back.
/// The file is left untouched unless the splice succeeds.
pub fn update_launch_file(
    path: &Path,
    generated: &[String],
    markers: &MarkerPair,
) -> Result<(), ConfigWriteError> {
    let original = fs::read_to_string(path).map_err(|source| ConfigWriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let updated = splice(&original, generated, markers).map_err(|source| {
        ConfigWriteError::Splice {
            path: path.to_path_buf(),
            source,
        }
    })?;

    fs::write(path, updated).map_err(|source| ConfigWriteError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} generated lines to {}", generated.len(), path.display());
    Ok(())
}
