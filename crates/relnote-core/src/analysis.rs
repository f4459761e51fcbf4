use crate::breaking::{self, BreakingAnalysis};
use crate::config_changes::{self, ConfigAnalysis};
use crate::e2e::{self, E2eAnalysis};
use crate::formatter;
use crate::types::Classification;
use serde::{Deserialize, Serialize};

/// The three independent analyzer outputs for one release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAnalysis {
    pub breaking: BreakingAnalysis,
    pub config: ConfigAnalysis,
    pub e2e: E2eAnalysis,
}

impl ReleaseAnalysis {
    pub fn of(text: Option<&str>) -> Self {
        let analysis = Self {
            breaking: breaking::analyze(text),
            config: config_changes::analyze(text),
            e2e: e2e::analyze(text),
        };
        tracing::debug!(
            breaking = analysis.breaking.has_breaking_changes,
            config = analysis.config.has_config_changes,
            e2e = analysis.e2e.has_e2e_tests,
            "release notes analyzed"
        );
        analysis
    }

    pub fn classification(&self) -> Classification {
        formatter::classify(
            self.breaking.has_breaking_changes,
            self.config.has_config_changes,
            self.e2e.has_e2e_tests,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzers_run_independently() {
        let text = "\
## Breaking Changes
- Dropped Python 3.8

```env
LOG_LEVEL=debug
```

E2E passed: https://github.com/o/r/actions/runs/9";
        let a = ReleaseAnalysis::of(Some(text));
        assert!(a.breaking.has_breaking_changes);
        assert!(a.config.has_config_changes);
        assert!(a.e2e.has_e2e_tests);
        assert_eq!(a.classification(), Classification::Breaking);
    }

    #[test]
    fn nothing_found_is_normal() {
        let a = ReleaseAnalysis::of(Some("Small fixes."));
        assert_eq!(a.classification(), Classification::Normal);
    }
}
