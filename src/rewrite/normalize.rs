use crate::config::Helpers;
use crate::rewrite::scan::{find_close, line_of, mode_at, Balance, ScanMode};
use crate::rewrite::{PatchError, Rewrite, Stage, StageReport};

/// Collapses `w(w(x))` to `w(x)` for both conversion helpers until nothing
/// doubled remains.
///
/// The outer wrapper's opening and its matching `)` are removed together, so
/// the parentheses stay balanced. Every collapse shortens the text, so the
/// loop terminates.
#[derive(Debug, Clone)]
pub struct Normalizer {
    wrappers: Vec<String>,
}

impl Normalizer {
    pub fn new(helpers: &Helpers) -> Self {
        Self {
            wrappers: vec![
                format!("{}(", helpers.to_native),
                format!("{}(", helpers.from_native),
            ],
        }
    }
}

/// Start of the first doubled `wrapper` that is a call in code position.
///
/// Longer identifiers ending in the wrapper name, comments and literals
/// do not count.
fn find_doubled(text: &str, wrapper: &str) -> Option<usize> {
    let doubled = wrapper.repeat(2);
    text.match_indices(&doubled)
        .map(|(start, _)| start)
        .find(|&start| {
            let standalone = text[..start]
                .chars()
                .next_back()
                .map_or(true, |ch| !(ch.is_alphanumeric() || ch == '_'));
            standalone && mode_at(text, start) == ScanMode::Code
        })
}

/// Remove one doubled `wrapper`, if any.
///
/// Returns `Ok(None)` when `text` holds no doubled wrapper.
fn collapse_once(text: &str, wrapper: &str) -> Result<Option<String>, PatchError> {
    let Some(start) = find_doubled(text, wrapper) else {
        return Ok(None);
    };

    // Offset of the outer wrapper's `(`.
    let open = start + wrapper.len() - 1;
    match find_close(&text[open..], 0) {
        Balance::Closed(at) => {
            let close = open + at - 1;
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..start]);
            out.push_str(&text[open + 1..close]);
            out.push_str(&text[close + 1..]);
            Ok(Some(out))
        }
        _ => Err(PatchError::UnterminatedWrap {
            stage: Stage::Normalize,
            line: line_of(text, start),
        }),
    }
}

impl Rewrite for Normalizer {
    fn stage(&self) -> Stage {
        Stage::Normalize
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        let mut text = text.to_string();

        loop {
            let mut collapsed = false;
            for wrapper in &self.wrappers {
                while let Some(shorter) = collapse_once(&text, wrapper)? {
                    text = shorter;
                    report.rewrites += 1;
                    collapsed = true;
                }
            }
            if !collapsed {
                return Ok(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_builtin;
    use crate::rewrite::scan::is_balanced;

    fn normalizer() -> Normalizer {
        Normalizer::new(&load_builtin().unwrap().helpers)
    }

    fn run(text: &str) -> (String, usize) {
        let mut report = StageReport::new(Stage::Normalize);
        let out = normalizer().rewrite(text, &mut report).unwrap();
        (out, report.rewrites)
    }

    #[test]
    fn test_collapses_double_wrap_balanced() {
        let (out, count) = run("f(rustBufferToC(rustBufferToC(FfiConverterStringINSTANCE.Lower(v))), x)");
        assert_eq!(out, "f(rustBufferToC(FfiConverterStringINSTANCE.Lower(v)), x)");
        assert_eq!(count, 1);
        assert!(is_balanced(&out));
    }

    #[test]
    fn test_collapses_to_fixed_point() {
        let (out, count) = run(
            "return rustBufferFromC(rustBufferFromC(rustBufferFromC(C.f(\n\ta,\n\tb))))\nrustBufferToC(rustBufferToC(x))",
        );
        assert_eq!(out, "return rustBufferFromC(C.f(\n\ta,\n\tb))\nrustBufferToC(x)");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_single_wraps_untouched() {
        let text = "rustBufferToC(rustBufferFromC(x))";
        let (out, count) = run(text);
        assert_eq!(out, text);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unclosed_double_wrap_is_an_error() {
        let mut report = StageReport::new(Stage::Normalize);
        let err = normalizer()
            .rewrite("a\nrustBufferToC(rustBufferToC(x)", &mut report)
            .unwrap_err();
        assert!(matches!(
            err,
            PatchError::UnterminatedWrap {
                stage: Stage::Normalize,
                line: 2
            }
        ));
    }

    #[test]
    fn test_longer_identifier_is_not_collapsed() {
        let (out, count) = run("myrustBufferToC(rustBufferToC(v))");
        assert_eq!(out, "myrustBufferToC(rustBufferToC(v))");
        assert_eq!(count, 0);

        let (out, count) = run("myrustBufferToC(rustBufferToC(v))\nf(rustBufferToC(rustBufferToC(w)))");
        assert_eq!(out, "myrustBufferToC(rustBufferToC(v))\nf(rustBufferToC(w))");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_comments_and_literals_are_not_collapsed() {
        let text = "// rustBufferToC(rustBufferToC(x)\ns := \"rustBufferFromC(rustBufferFromC(\"\n/* rustBufferToC(rustBufferToC(\n*/";
        let (out, count) = run(text);
        assert_eq!(out, text);
        assert_eq!(count, 0);
    }
}
