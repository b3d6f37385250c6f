//! Wraps buffer-producing `Lower` calls with the to-native conversion.
//!
//! Only use sites are wrapped. Inside a lowering-method definition the same
//! expression is the conversion being defined, so wrapping there would be
//! circular.
//!
//! The call pattern stops at the first `)`, so an argument list holding a
//! nested call is not supported. Generated argument lists are plain
//! identifiers, which keeps that limitation out of reach.

use crate::config::{Helpers, Lowering};
use crate::rewrite::scan::{scan_line, ScanMode, ScanState};
use crate::rewrite::{PatchError, Rewrite, Stage, StageReport};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct LoweringWrapper {
    /// `<prefix>\w*<receiver>.<method>(<args without ')'>)`
    call: Regex,
    definition_prefix: String,
    definition_marker: String,
    wrapper_open: String,
}

impl LoweringWrapper {
    pub fn new(lowering: &Lowering, helpers: &Helpers) -> Result<Self, PatchError> {
        let prefixes = alternation(&lowering.converter_prefixes);
        let receivers = alternation(&lowering.receivers);
        let source = format!(
            r"\b(?:{prefixes})\w*(?:{receivers})\.{method}\([^)]*\)",
            method = regex::escape(&lowering.method),
        );
        let call = Regex::new(&source).map_err(|source| PatchError::InvalidPattern {
            stage: Stage::Lowering,
            source,
        })?;

        Ok(Self {
            call,
            definition_prefix: lowering.definition_prefix.clone(),
            definition_marker: lowering.definition_marker(),
            wrapper_open: format!("{}(", helpers.to_native),
        })
    }

    fn opens_definition(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.starts_with(&self.definition_prefix) && trimmed.contains(&self.definition_marker)
    }

    /// Wrap every matching call on one line that is not wrapped yet.
    fn wrap_line(&self, line: &str) -> (String, usize) {
        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        let mut wrapped = 0;

        for m in self.call.find_iter(line) {
            out.push_str(&line[last..m.start()]);
            if line[..m.start()].ends_with(&self.wrapper_open) {
                out.push_str(m.as_str());
            } else {
                out.push_str(&self.wrapper_open);
                out.push_str(m.as_str());
                out.push(')');
                wrapped += 1;
            }
            last = m.end();
        }
        out.push_str(&line[last..]);

        (out, wrapped)
    }
}

fn alternation(items: &[String]) -> String {
    items
        .iter()
        .map(|item| regex::escape(item))
        .collect::<Vec<_>>()
        .join("|")
}

impl Rewrite for LoweringWrapper {
    fn stage(&self) -> Stage {
        Stage::Lowering
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        let mut state = ScanState::new();
        let mut lines = Vec::new();

        for (idx, line) in text.split('\n').enumerate() {
            let starts_in = state.mode;
            let scan = scan_line(line, starts_in);
            state.mode = scan.next;

            if !state.inside_region && starts_in == ScanMode::Code && self.opens_definition(line)
            {
                state.inside_region = true;
                state.brace_depth = 0;
            }

            if state.inside_region {
                let depth = state.shift_braces(scan.braces).ok_or(
                    PatchError::NegativeBraceDepth {
                        stage: Stage::Lowering,
                        line: idx + 1,
                    },
                )?;
                if depth == 0 {
                    state.inside_region = false;
                }
                lines.push(line.to_string());
                continue;
            }

            // Continuation of a block comment or raw string.
            if starts_in != ScanMode::Code {
                lines.push(line.to_string());
                continue;
            }

            let (line, wrapped) = self.wrap_line(line);
            report.rewrites += wrapped;
            lines.push(line);
        }

        Ok(lines.join("\n"))
    }
}
