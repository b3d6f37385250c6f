//! The rewrite pipeline.
//!
//! Stages run strictly in order over one in-memory copy of the generated
//! file. Each stage consumes the complete text and hands a complete text to
//! the next one; no stage looks at anything but the text itself.
//!
//! Re-running the pipeline on its own output is a no-op. Every stage either
//! recognizes its work as already done or matches nothing, and the
//! normalizer collapses any wrapper that still ends up doubled.

pub mod alias;
pub mod call_sites;
pub mod errors;
pub mod linkage;
pub mod lowering;
pub mod normalize;
pub mod out_param;
pub mod report;
pub mod returns;
pub mod scan;

pub use alias::AliasMaterializer;
pub use call_sites::CallSiteRewriter;
pub use errors::PatchError;
pub use linkage::LinkageInjector;
pub use lowering::LoweringWrapper;
pub use normalize::Normalizer;
pub use out_param::OutParamWrapper;
pub use report::{Drift, LineDelta, NearMiss, PatchReport, StageReport};
pub use returns::ReturnWrapper;

use crate::config::{load_builtin, Profile};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Linkage,
    Alias,
    CallSites,
    Lowering,
    Returns,
    OutParam,
    Normalize,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Linkage => "linkage",
            Stage::Alias => "alias",
            Stage::CallSites => "call-sites",
            Stage::Lowering => "lowering",
            Stage::Returns => "returns",
            Stage::OutParam => "out-param",
            Stage::Normalize => "normalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One transformation of the whole text.
pub trait Rewrite {
    fn stage(&self) -> Stage;

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError>;
}

/// Patched text plus what each stage did to get there.
#[derive(Debug, Clone)]
#[must_use = "Patched holds the rewritten text"]
pub struct Patched {
    pub text: String,
    pub report: PatchReport,
}

/// The ordered stage pipeline built from a [`Profile`].
pub struct Patcher {
    stages: Vec<Box<dyn Rewrite>>,
}

impl Patcher {
    pub fn new(profile: &Profile) -> Result<Self, PatchError> {
        let mut stages: Vec<Box<dyn Rewrite>> = vec![
            Box::new(LinkageInjector::new(&profile.linkage)),
            Box::new(AliasMaterializer::new(&profile.alias, &profile.helpers)),
            Box::new(CallSiteRewriter::new(&profile.call_sites)),
            Box::new(LoweringWrapper::new(&profile.lowering, &profile.helpers)?),
            Box::new(ReturnWrapper::new(&profile.returns, &profile.helpers)),
        ];
        if let Some(out_param) = &profile.out_param {
            stages.push(Box::new(OutParamWrapper::new(out_param, &profile.helpers)?));
        }
        stages.push(Box::new(Normalizer::new(&profile.helpers)));

        Ok(Self { stages })
    }

    /// Pipeline for the built-in `rustpushgo` profile.
    pub fn builtin() -> Result<Self, PatchError> {
        Self::new(&load_builtin()?)
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().map(|s| s.stage())
    }

    pub fn patch(&self, text: &str) -> Result<Patched, PatchError> {
        let mut current = text.to_string();
        let mut report = PatchReport::default();

        for stage in &self.stages {
            let mut stage_report = StageReport::new(stage.stage());
            current = stage.rewrite(&current, &mut stage_report)?;
            report.stages.push(stage_report);
        }

        Ok(Patched {
            text: current,
            report,
        })
    }
}

/// Replace the single occurrence of `search`, treating its absence as a no-op.
///
/// More than one occurrence breaks the one-anchor-per-file assumption and is
/// rejected before anything is rewritten. When `search` is absent, finding
/// `applied_marker` counts as already applied, and finding neither is drift.
pub(crate) fn replace_singleton(
    stage: Stage,
    text: &str,
    search: &str,
    replacement: &str,
    applied_marker: &str,
    report: &mut StageReport,
) -> Result<String, PatchError> {
    match text.matches(search).count() {
        0 => {
            if text.contains(applied_marker) {
                report.already_applied += 1;
            } else {
                report.drift.push(Drift::detect(stage, search, text));
            }
            Ok(text.to_string())
        }
        1 => {
            report.rewrites += 1;
            Ok(text.replacen(search, replacement, 1))
        }
        count => Err(PatchError::AmbiguousMatch { stage, count }),
    }
}
