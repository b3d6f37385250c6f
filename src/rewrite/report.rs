//! Per-stage outcome reporting and shape-drift detection.

use crate::rewrite::Stage;
use similar::{ChangeTag, TextDiff};
use std::fmt;

/// Lines scoring below this similarity are not offered as near misses.
const NEAR_MISS_THRESHOLD: f64 = 0.6;

/// What one stage did to the text.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "StageReport should be checked for drift"]
pub struct StageReport {
    pub stage: Stage,
    /// Locations rewritten on this run
    pub rewrites: usize,
    /// Anchors or catalogue entries found already in their patched form
    pub already_applied: usize,
    /// Expected shapes that matched nothing at all
    pub drift: Vec<Drift>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            rewrites: 0,
            already_applied: 0,
            drift: Vec::new(),
        }
    }
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    pub stages: Vec<StageReport>,
}

impl PatchReport {
    pub fn rewrites(&self) -> usize {
        self.stages.iter().map(|s| s.rewrites).sum()
    }

    pub fn drift(&self) -> impl Iterator<Item = &Drift> {
        self.stages.iter().flat_map(|s| s.drift.iter())
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// A literal pattern the generator no longer emits, neither raw nor patched.
///
/// Drift never changes the output. It tells the operator that the generated
/// code shape moved and the profile needs a look.
#[derive(Debug, Clone, PartialEq)]
pub struct Drift {
    pub stage: Stage,
    pub pattern: String,
    pub nearest: Option<NearMiss>,
}

/// The input line most similar to a drifted pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub similarity: f64,
}

impl Drift {
    /// Record that `pattern` matched nothing in `text`, with the closest line as a hint.
    pub fn detect(stage: Stage, pattern: &str, text: &str) -> Self {
        let probe = pattern
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");

        let nearest = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| NearMiss {
                line: idx + 1,
                text: line.trim().to_string(),
                similarity: strsim::normalized_levenshtein(probe, line.trim()),
            })
            .filter(|m| m.similarity >= NEAR_MISS_THRESHOLD)
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity));

        Self {
            stage,
            pattern: pattern.to_string(),
            nearest,
        }
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.pattern.lines().next().unwrap_or("");
        write!(f, "{}: no match for `{}`", self.stage, first)?;
        if let Some(near) = &self.nearest {
            write!(f, " (closest: line {} `{}`)", near.line, near.text)?;
        }
        Ok(())
    }
}

/// Inserted and deleted line counts between two texts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineDelta {
    pub inserted: usize,
    pub deleted: usize,
}

impl LineDelta {
    pub fn between(before: &str, after: &str) -> Self {
        let diff = TextDiff::from_lines(before, after);
        let mut delta = LineDelta::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => delta.inserted += 1,
                ChangeTag::Delete => delta.deleted += 1,
                ChangeTag::Equal => {}
            }
        }
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

impl fmt::Display for LineDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} -{} lines", self.inserted, self.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_finds_near_miss() {
        let text = "package x\n\nC.ffi_rustpushgo_rustbuffer_free(buf, status)\n";
        let drift = Drift::detect(
            Stage::CallSites,
            "C.ffi_rustpushgo_rustbuffer_free(cb, status)",
            text,
        );
        let near = drift.nearest.as_ref().expect("near miss");
        assert_eq!(near.line, 3);
        assert!(drift.to_string().contains("closest: line 3"));
    }

    #[test]
    fn test_drift_without_near_miss() {
        let drift = Drift::detect(Stage::Alias, "type RustBuffer = C.RustBuffer", "package x\n");
        assert!(drift.nearest.is_none());
        assert_eq!(
            drift.to_string(),
            "alias: no match for `type RustBuffer = C.RustBuffer`"
        );
    }

    #[test]
    fn test_line_delta() {
        let delta = LineDelta::between("a\nb\nc\n", "a\nB\nc\nd\n");
        assert_eq!(
            delta,
            LineDelta {
                inserted: 2,
                deleted: 1
            }
        );
        assert_eq!(delta.to_string(), "+2 -1 lines");
        assert!(LineDelta::between("same\n", "same\n").is_empty());
    }

    #[test]
    fn test_patch_report_totals() {
        let mut lowering = StageReport::new(Stage::Lowering);
        lowering.rewrites = 3;
        let mut returns = StageReport::new(Stage::Returns);
        returns.rewrites = 2;
        let report = PatchReport {
            stages: vec![lowering, returns],
        };
        assert_eq!(report.rewrites(), 5);
        assert_eq!(report.stage(Stage::Returns).map(|s| s.rewrites), Some(2));
        assert_eq!(report.drift().count(), 0);
    }
}
