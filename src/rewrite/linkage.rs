use crate::config::Linkage;
use crate::rewrite::{replace_singleton, PatchError, Rewrite, Stage, StageReport};

/// Inserts native linkage directives between the include line and the
/// import line of the cgo preamble.
#[derive(Debug, Clone)]
pub struct LinkageInjector {
    anchor: String,
    replacement: String,
    applied_marker: String,
}

impl LinkageInjector {
    pub fn new(linkage: &Linkage) -> Self {
        let mut replacement = format!("{}\n", linkage.include);
        for directive in &linkage.directives {
            replacement.push_str(directive);
            replacement.push('\n');
        }
        replacement.push_str(&linkage.import);

        let applied_marker = match linkage.directives.first() {
            Some(first) => format!("{}\n{}", linkage.include, first),
            None => linkage.anchor(),
        };

        Self {
            anchor: linkage.anchor(),
            replacement,
            applied_marker,
        }
    }
}

impl Rewrite for LinkageInjector {
    fn stage(&self) -> Stage {
        Stage::Linkage
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        replace_singleton(
            Stage::Linkage,
            text,
            &self.anchor,
            &self.replacement,
            &self.applied_marker,
            report,
        )
    }
}
