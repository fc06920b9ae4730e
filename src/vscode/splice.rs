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

//! Marker-delimited block replacement for hand-edited text files.
//!
//! Everything outside the begin/end marker pair is copied through line for line.
//! The region between the markers is thrown away and replaced by the generated
//! lines, each indented like the begin marker. Reapplying with new lines always
//! leaves exactly one generated block behind.

/// Begin/end sentinel lines, compared against trimmed file lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub begin: String,
    pub end: String,
}

impl MarkerPair {
    pub const DEFAULT_BEGIN: &'static str = "// #lldbclient-generated-begin";
    pub const DEFAULT_END: &'static str = "// #lldbclient-generated-end";

    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }
}

impl Default for MarkerPair {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BEGIN, Self::DEFAULT_END)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpliceError {
    #[error("did not find begin marker line '{marker}' in the launch file")]
    MarkerNotFound { marker: String },
    #[error("unterminated begin marker at line {line} in the launch file; add end marker line '{end_marker}'")]
    UnterminatedMarker { line: usize, end_marker: String },
}

/// Replace the marked region of `original` with `generated`.
///
/// On error nothing is produced, so the caller still holds the untouched original.
pub fn splice(
    original: &str,
    generated: &[String],
    markers: &MarkerPair,
) -> Result<String, SpliceError> {
    let mut output: Vec<String> = Vec::new();
    let mut found_begin = false;
    // 0-based index of the begin marker while inside the suppressed region
    let mut open_at: Option<usize> = None;

    for (line_no, line) in original.split('\n').enumerate() {
        if open_at.is_some() {
            if line.trim() != markers.end {
                continue;
            }
            open_at = None;
        }

        output.push(line.to_string());

        if line.trim() == markers.begin {
            found_begin = true;
            open_at = Some(line_no);
            let indent = leading_whitespace(line);
            output.extend(generated.iter().map(|new_line| format!("{}{}", indent, new_line)));
        }
    }

    if !found_begin {
        return Err(SpliceError::MarkerNotFound {
            marker: markers.begin.clone(),
        });
    }
    if let Some(begin_idx) = open_at {
        return Err(SpliceError::UnterminatedMarker {
            line: begin_idx + 1,
            end_marker: markers.end.clone(),
        });
    }

    Ok(output.join("\n"))
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
