use crate::config::CallSite;
use crate::rewrite::{Drift, PatchError, Rewrite, Stage, StageReport};

/// Literal substitutions for call sites that cross the buffer boundary.
///
/// Every entry replaces all of its occurrences. Entries are disjoint, so
/// their order does not matter.
#[derive(Debug, Clone)]
pub struct CallSiteRewriter {
    sites: Vec<CallSite>,
}

impl CallSiteRewriter {
    pub fn new(sites: &[CallSite]) -> Self {
        Self {
            sites: sites.to_vec(),
        }
    }
}

impl Rewrite for CallSiteRewriter {
    fn stage(&self) -> Stage {
        Stage::CallSites
    }

    fn rewrite(&self, text: &str, report: &mut StageReport) -> Result<String, PatchError> {
        let mut text = text.to_string();

        for site in &self.sites {
            let count = text.matches(site.search.as_str()).count();
            if count > 0 {
                text = text.replace(&site.search, &site.replace);
                report.rewrites += count;
            } else if text.contains(&site.replace) {
                report.already_applied += 1;
            } else {
                report
                    .drift
                    .push(Drift::detect(Stage::CallSites, &site.search, &text));
            }
        }

        Ok(text)
    }
}
