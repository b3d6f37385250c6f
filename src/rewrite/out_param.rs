use crate::config::{Helpers, OutParam};
use crate::rewrite::{PatchError, Rewrite, Stage, StageReport};
use regex::Regex;

/// Wraps converter results stored through a native out-parameter, e.g.
/// `*outBuf = FfiConverterXINSTANCE.drop(v)`, with the to-native conversion.
#[derive(Debug, Clone)]
pub struct OutParamWrapper {
    assignment: Regex,
    to_native: String,
}

impl OutParamWrapper {
    pub fn new(out_param: &OutParam, helpers: &Helpers) -> Result<Self, PatchError> {
        let source = format!(
            r"{assignee}\s*=\s*({prefix}\w+{receiver}\.{method}\([^)]*\))",
            assignee = regex::escape(&out_param.assignee),
            prefix = regex::escape(&out_param.converter_prefix),
            receiver = regex::escape(&out_param.receiver),
            method = regex::escape(&out_param.method),
        );
        let assignment = Regex::new(&source).map_err(|source| PatchError::InvalidPattern {
            stage: Stage::OutParam,
            source,
        })?;

        Ok(Self {
            assignment,
            to_native: helpers.to_native.clone(),
        })
    }
}

impl Rewrite for OutParamWrapper {
    fn stage(&self) -> Stage {
        Stage::OutParam
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.assignment.captures_iter(text) {
            let Some(value) = caps.get(1) else {
                continue;
            };
            out.push_str(&text[last..value.start()]);
            out.push_str(&self.to_native);
            out.push('(');
            out.push_str(value.as_str());
            out.push(')');
            last = value.end();
            report.rewrites += 1;
        }
        out.push_str(&text[last..]);

        Ok(out)
    }
}
