//! Wraps native-call returns inside buffer-returning function literals with
//! the from-native conversion.

use crate::config::{Helpers, Returns};
use crate::rewrite::scan::{
    find_close, find_close_from, net_braces, scan_line, splice, Balance, PendingWrap, ScanMode,
    ScanState,
};
use crate::rewrite::{PatchError, Rewrite, Stage, StageReport};

#[derive(Debug, Clone)]
pub struct ReturnWrapper {
    signatures: Vec<String>,
    native_prefix: String,
    from_native: String,
    wrapper_open: String,
}

impl ReturnWrapper {
    pub fn new(returns: &Returns, helpers: &Helpers) -> Self {
        Self {
            signatures: returns.signatures.clone(),
            native_prefix: returns.native_prefix.clone(),
            from_native: helpers.from_native.clone(),
            wrapper_open: format!("{}(", helpers.from_native),
        }
    }

    /// Byte offset of the first recognized signature on `line`.
    fn signature_at(&self, line: &str) -> Option<usize> {
        self.signatures.iter().filter_map(|sig| line.find(sig)).min()
    }

    /// Rewrite `return <native call>` on one line.
    ///
    /// Returns `None` when the line is not an unwrapped native-call return.
    /// When the call does not close on this line, a pending wrap is left in
    /// `state` for the following lines to finish.
    fn wrap_return(
        &self,
        line: &str,
        line_no: usize,
        state: &mut ScanState,
    ) -> Result<Option<String>, PatchError> {
        let Some(expr) = line.trim_start().strip_prefix("return ") else {
            return Ok(None);
        };
        if !expr.starts_with(&self.native_prefix) || line.contains(&self.from_native) {
            return Ok(None);
        }
        let head = &line[..line.len() - expr.len()];

        let wrapped = match find_close(expr, 0) {
            Balance::Closed(at) => format!(
                "{head}{}{}){}",
                self.wrapper_open,
                &expr[..at],
                &expr[at..]
            ),
            Balance::Flat => {
                // Close before a trailing comment or line ending, not after it.
                let code = expr.find("//").map_or(expr, |at| &expr[..at]);
                let end = code.trim_end().len();
                format!(
                    "{head}{}{}){}",
                    self.wrapper_open,
                    &expr[..end],
                    &expr[end..]
                )
            }
            Balance::Open(paren_depth) => {
                state.pending_wrap = Some(PendingWrap {
                    paren_depth,
                    opened_at_line: line_no,
                });
                format!("{head}{}{expr}", self.wrapper_open)
            }
            Balance::Underflow(_) => {
                return Err(PatchError::NegativeParenDepth {
                    stage: Stage::Returns,
                    line: line_no,
                })
            }
        };

        Ok(Some(wrapped))
    }
}

/// Finish a pending wrap on `line`, splicing `)` after the call's final `)`.
///
/// `mode` is the lexical mode the line starts in. Returns the line unchanged
/// and the wrap still pending when the call runs past this line too.
pub fn close_pending(
    line: &str,
    pending: PendingWrap,
    mode: ScanMode,
    line_no: usize,
) -> Result<(String, Option<PendingWrap>), PatchError> {
    match find_close_from(line, pending.paren_depth, mode) {
        Balance::Closed(at) => Ok((splice(line, at, ")"), None)),
        Balance::Open(paren_depth) => Ok((
            line.to_string(),
            Some(PendingWrap {
                paren_depth,
                ..pending
            }),
        )),
        Balance::Flat => Ok((line.to_string(), None)),
        Balance::Underflow(_) => Err(PatchError::NegativeParenDepth {
            stage: Stage::Returns,
            line: line_no,
        }),
    }
}

impl Rewrite for ReturnWrapper {
    fn stage(&self) -> Stage {
        Stage::Returns
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        let mut state = ScanState::new();
        let mut lines = Vec::new();

        for (idx, raw) in text.split('\n').enumerate() {
            let line_no = idx + 1;
            let starts_in = state.mode;
            let mut line = raw.to_string();

            if let Some(pending) = state.pending_wrap.take() {
                let (closed, still_pending) = close_pending(&line, pending, starts_in, line_no)?;
                line = closed;
                state.pending_wrap = still_pending;
            }

            let scan = scan_line(&line, starts_in);
            state.mode = scan.next;

            match self.signature_at(&line) {
                Some(at) if starts_in == ScanMode::Code => {
                    state.brace_depth = usize::try_from(net_braces(&line[at..])).unwrap_or(0);
                    state.inside_region = state.brace_depth > 0;
                }
                _ if state.inside_region => {
                    let depth = state.shift_braces(scan.braces).ok_or(
                        PatchError::NegativeBraceDepth {
                            stage: Stage::Returns,
                            line: line_no,
                        },
                    )?;
                    if depth == 0 {
                        state.inside_region = false;
                    }
                }
                _ => {}
            }

            if state.inside_region && state.pending_wrap.is_none() && starts_in == ScanMode::Code {
                if let Some(wrapped) = self.wrap_return(&line, line_no, &mut state)? {
                    line = wrapped;
                    report.rewrites += 1;
                }
            }

            lines.push(line);
        }

        if let Some(pending) = state.pending_wrap {
            return Err(PatchError::UnterminatedWrap {
                stage: Stage::Returns,
                line: pending.opened_at_line,
            });
        }

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_builtin;

    fn wrapper() -> ReturnWrapper {
        let profile = load_builtin().unwrap();
        ReturnWrapper::new(&profile.returns, &profile.helpers)
    }

    fn run(text: &str) -> Result<(String, StageReport), PatchError> {
        let mut report = StageReport::new(Stage::Returns);
        let out = wrapper().rewrite(text, &mut report)?;
        Ok((out, report))
    }

    #[test]
    fn test_single_line_return() {
        let text = "\
func Foo(foo RustBuffer) RustBufferI {
\treturn rustCall(func(status *C.RustCallStatus) RustBuffer {
\t\treturn C.native_call(foo, status)
\t})
}";
        let (out, report) = run(text).unwrap();
        assert!(out.contains("\t\treturn rustBufferFromC(C.native_call(foo, status))\n"));
        assert_eq!(report.rewrites, 1);
    }

    #[test]
    fn test_multi_line_return() {
        let text = "\
\treturn rustCallWithError(FfiConverterTypeError{}, func(_uniffiStatus *C.RustCallStatus) RustBufferI {
\t\treturn C.uniffi_rustpushgo_fn_method_client_get_handles(
\t\t\t_pointer,
\t\t\trustBufferToC(FfiConverterStringINSTANCE.Lower(name)),
\t\t\t_uniffiStatus)
\t})";
        let (out, report) = run(text).unwrap();
        let expected = "\
\treturn rustCallWithError(FfiConverterTypeError{}, func(_uniffiStatus *C.RustCallStatus) RustBufferI {
\t\treturn rustBufferFromC(C.uniffi_rustpushgo_fn_method_client_get_handles(
\t\t\t_pointer,
\t\t\trustBufferToC(FfiConverterStringINSTANCE.Lower(name)),
\t\t\t_uniffiStatus))
\t})";
        assert_eq!(out, expected);
        assert_eq!(report.rewrites, 1);
    }

    #[test]
    fn test_returns_outside_literal_are_untouched() {
        let text = "\
func Other() C.int32_t {
\treturn C.uniffi_fn_other()
}
rustCall(func(_uniffiStatus *C.RustCallStatus) bool {
\treturn C.uniffi_fn_bool(_uniffiStatus)
})";
        let (out, report) = run(text).unwrap();
        assert_eq!(out, text);
        assert_eq!(report.rewrites, 0);
    }

    #[test]
    fn test_scope_ends_with_literal() {
        let text = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\tif x {
\t\treturn C.first(status)
\t}
\treturn C.second(status)
})
\treturn C.after(status)";
        let (out, report) = run(text).unwrap();
        assert!(out.contains("\t\treturn rustBufferFromC(C.first(status))\n"));
        assert!(out.contains("\treturn rustBufferFromC(C.second(status))\n"));
        assert!(out.ends_with("\treturn C.after(status)"));
        assert_eq!(report.rewrites, 2);
    }

    #[test]
    fn test_already_wrapped_return_is_left_alone() {
        let text = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\treturn rustBufferFromC(C.ffi_rustpushgo_rustbuffer_from_bytes(foreign, status))
})";
        let (out, report) = run(text).unwrap();
        assert_eq!(out, text);
        assert_eq!(report.rewrites, 0);
    }

    #[test]
    fn test_close_pending_splices_after_call() {
        let pending = PendingWrap {
            paren_depth: 1,
            opened_at_line: 1,
        };

        let (line, rest) = close_pending("\t\t\tname,", pending, ScanMode::Code, 2).unwrap();
        assert_eq!(line, "\t\t\tname,");
        assert_eq!(rest, Some(pending));

        let (line, rest) = close_pending("\t\t\t_uniffiStatus) // done (really)", pending, ScanMode::Code, 3).unwrap();
        assert_eq!(line, "\t\t\t_uniffiStatus)) // done (really)");
        assert_eq!(rest, None);
    }

    #[test]
    fn test_unterminated_wrap_is_an_error() {
        let text = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\treturn C.never_closed(
\t\tstatus,";
        let err = run(text).unwrap_err();
        assert!(matches!(
            err,
            PatchError::UnterminatedWrap {
                stage: Stage::Returns,
                line: 2
            }
        ));
    }

    #[test]
    fn test_unbalanced_return_is_an_error() {
        let text = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\treturn C.value) + 1
})";
        assert!(matches!(
            run(text),
            Err(PatchError::NegativeParenDepth { line: 2, .. })
        ));
    }

    #[test]
    fn test_parens_in_multi_line_comment_do_not_close_wrap() {
        let text = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\treturn C.native_call(
\t\t/* note (
\t\t   ) */ foo,
\t\tstatus)
})";
        let (out, report) = run(text).unwrap();
        let expected = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\treturn rustBufferFromC(C.native_call(
\t\t/* note (
\t\t   ) */ foo,
\t\tstatus))
})";
        assert_eq!(out, expected);
        assert_eq!(report.rewrites, 1);
    }

    #[test]
    fn test_brace_in_multi_line_comment_keeps_literal_open() {
        let text = "\
rustCall(func(status *C.RustCallStatus) RustBuffer {
\t/*
\t}
\t*/
\treturn C.native_call(status)
})";
        let (out, report) = run(text).unwrap();
        assert!(out.contains("\treturn rustBufferFromC(C.native_call(status))\n})"));
        assert_eq!(report.rewrites, 1);
    }

    #[test]
    fn test_flat_return_keeps_line_ending_and_comment() {
        let text = "rustCall(func(status *C.RustCallStatus) RustBuffer {\r\n\treturn C.someValue\r\n})\r\n";
        let (out, _) = run(text).unwrap();
        assert!(out.contains("\treturn rustBufferFromC(C.someValue)\r\n})\r\n"));

        let text = "rustCall(func(status *C.RustCallStatus) RustBuffer {\n\treturn C.someValue // cached\n})";
        let (out, _) = run(text).unwrap();
        assert!(out.contains("\treturn rustBufferFromC(C.someValue) // cached\n"));
    }
}
