use crate::config::{Alias, Helpers};
use crate::rewrite::{replace_singleton, PatchError, Rewrite, Stage, StageReport};

/// Replaces the transparent buffer alias with an explicit struct of the same
/// layout plus the two conversion helpers.
#[derive(Debug, Clone)]
pub struct AliasMaterializer {
    declaration: String,
    replacement: String,
    applied_marker: String,
}

impl AliasMaterializer {
    pub fn new(alias: &Alias, helpers: &Helpers) -> Self {
        Self {
            declaration: alias.declaration.clone(),
            replacement: render(alias, helpers),
            applied_marker: format!("type {} struct {{", helpers.buffer_type),
        }
    }
}

/// Struct definition plus conversions.
///
/// Both conversions reinterpret the bits through `unsafe.Pointer`; the two
/// types share one memory layout, so no field is copied.
fn render(alias: &Alias, helpers: &Helpers) -> String {
    let width = alias
        .fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0);

    let mut out = format!("type {} struct {{\n", helpers.buffer_type);
    for field in &alias.fields {
        out.push_str(&format!("\t{:<width$} {}\n", field.name, field.ty));
    }
    out.push_str("}\n\n");

    out.push_str(&format!(
        "func {to}(rb {buf}) {native} {{\n\treturn *(*{native})(unsafe.Pointer(&rb))\n}}\n\n",
        to = helpers.to_native,
        buf = helpers.buffer_type,
        native = helpers.native_type,
    ));
    out.push_str(&format!(
        "func {from}(crb {native}) {buf} {{\n\treturn *(*{buf})(unsafe.Pointer(&crb))\n}}",
        from = helpers.from_native,
        buf = helpers.buffer_type,
        native = helpers.native_type,
    ));
    out
}

impl Rewrite for AliasMaterializer {
    fn stage(&self) -> Stage {
        Stage::Alias
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        replace_singleton(
            Stage::Alias,
            text,
            &self.declaration,
            &self.replacement,
            &self.applied_marker,
            report,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_builtin;

    fn materializer() -> AliasMaterializer {
        let profile = load_builtin().unwrap();
        AliasMaterializer::new(&profile.alias, &profile.helpers)
    }

    #[test]
    fn test_materializes_struct_and_conversions() {
        let text = "import \"C\"\n\ntype RustBuffer = C.RustBuffer\n\ntype RustBufferI interface {\n}\n";
        let mut report = StageReport::new(Stage::Alias);
        let out = materializer().rewrite(text, &mut report).unwrap();

        let expected = "type RustBuffer struct {\n\
                        \tcapacity C.int32_t\n\
                        \tlen      C.int32_t\n\
                        \tdata     *C.uint8_t\n\
                        }\n\
                        \n\
                        func rustBufferToC(rb RustBuffer) C.RustBuffer {\n\
                        \treturn *(*C.RustBuffer)(unsafe.Pointer(&rb))\n\
                        }\n\
                        \n\
                        func rustBufferFromC(crb C.RustBuffer) RustBuffer {\n\
                        \treturn *(*RustBuffer)(unsafe.Pointer(&crb))\n\
                        }\n\
                        \n\
                        type RustBufferI interface {";
        assert!(out.contains(expected), "unexpected output:\n{out}");
        assert!(!out.contains("type RustBuffer = C.RustBuffer"));
        assert_eq!(report.rewrites, 1);
    }

    #[test]
    fn test_already_materialized() {
        let mut first = StageReport::new(Stage::Alias);
        let once = materializer()
            .rewrite("type RustBuffer = C.RustBuffer\n", &mut first)
            .unwrap();

        let mut second = StageReport::new(Stage::Alias);
        let twice = materializer().rewrite(&once, &mut second).unwrap();
        assert_eq!(once, twice);
        assert_eq!(second.already_applied, 1);
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let text = "type RustBuffer = C.RustBuffer\ntype RustBuffer = C.RustBuffer\n";
        let mut report = StageReport::new(Stage::Alias);
        assert!(matches!(
            materializer().rewrite(text, &mut report),
            Err(PatchError::AmbiguousMatch { stage: Stage::Alias, count: 2 })
        ));
    }
}
