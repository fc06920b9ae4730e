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

//! Parsing of device `ps -A` output into typed process entries.
//!
//! Toybox prints a header row followed by one row per process, e.g.
//!
//! ```text
//! USER           PID  PPID     VSZ    RSS WCHAN            ADDR S NAME
//! u0_a123       4242   612 1234567  89012 0                   0 S com.example.app
//! ```
//!
//! The PID column is located from the header; NAME is always the last column.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// How a process row is matched against what we are looking for.
#[derive(Debug, Clone, Copy)]
pub enum ProcessPattern<'a> {
    /// NAME equals the given string, e.g. an application package.
    Exact(&'a str),
    /// NAME is the given executable, with or without a leading directory.
    Executable(&'a str),
}

impl ProcessPattern<'_> {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ProcessPattern::Exact(wanted) => name == *wanted,
            ProcessPattern::Executable(wanted) => {
                name == *wanted || name.rsplit('/').next() == Some(*wanted)
            }
        }
    }

    fn describe(&self) -> &str {
        match self {
            ProcessPattern::Exact(s) | ProcessPattern::Executable(s) => s,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProcessLookupError {
    #[error("no running process matches '{pattern}'")]
    NoMatch { pattern: String },
    #[error("malformed process listing at line {line_no}: '{line}'")]
    Malformed { line_no: usize, line: String },
}

/// Parse a bare process id, ignoring surrounding whitespace.
pub fn parse_pid(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok()
}

/// Parse a full `ps -A` listing. Blank lines are skipped.
pub fn parse_listing(listing: &str) -> Result<Vec<ProcessEntry>, ProcessLookupError> {
    let mut rows = listing
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_no, header) = match rows.next() {
        Some(row) => row,
        None => return Ok(Vec::new()),
    };
    let pid_column = header
        .split_whitespace()
        .position(|col| col == "PID")
        .ok_or_else(|| ProcessLookupError::Malformed {
            line_no: header_no + 1,
            line: header.to_string(),
        })?;

    let mut entries = Vec::new();
    for (idx, line) in rows {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let malformed = || ProcessLookupError::Malformed {
            line_no: idx + 1,
            line: line.to_string(),
        };
        if fields.len() <= pid_column {
            return Err(malformed());
        }
        let pid = parse_pid(fields[pid_column]).ok_or_else(malformed)?;
        let name = fields[fields.len() - 1].to_string();
        entries.push(ProcessEntry { pid, name });
    }
    Ok(entries)
}

/// First process in listing order whose name matches `pattern`.
pub fn find_pid(listing: &str, pattern: ProcessPattern<'_>) -> Result<u32, ProcessLookupError> {
    parse_listing(listing)?
        .into_iter()
        .find(|entry| pattern.matches(&entry.name))
        .map(|entry| entry.pid)
        .ok_or_else(|| ProcessLookupError::NoMatch {
            pattern: pattern.describe().to_string(),
        })
}
