// verification_strategy.rs
// Purpose: Concrete verification guidance per task type, scaled by the current risk level

use serde::{Deserialize, Serialize};

use crate::trust_calibrator::{RiskLevel, TaskType, TrustProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStrategy {
    pub task_type: TaskType,
    pub risk_level: RiskLevel,
    pub primary_checks: Vec<String>,
    pub secondary_checks: Vec<String>,
    pub red_flags: Vec<String>,
    pub estimated_minutes: u32,
    pub suggested_tools: Vec<String>,
}

struct StrategyTemplate {
    primary: &'static [&'static str],
    secondary: &'static [&'static str],
    red_flags: &'static [&'static str],
    base_minutes: u32,
    tools: &'static [&'static str],
}

fn template(task_type: TaskType) -> StrategyTemplate {
    match task_type {
        TaskType::Coding => StrategyTemplate {
            primary: &["Compile and run the code", "Test edge cases and error paths"],
            secondary: &["Check API usage against the library docs", "Review for security issues"],
            red_flags: &["Calls to functions that do not exist", "Deprecated APIs", "Silently swallowed errors"],
            base_minutes: 10,
            tools: &["compiler or interpreter", "unit tests", "official documentation"],
        },
        TaskType::Writing => StrategyTemplate {
            primary: &["Read the full text once", "Check that it says what you mean"],
            secondary: &["Check tone for the audience", "Verify any quoted facts"],
            red_flags: &["Generic filler phrasing", "Claims you cannot source"],
            base_minutes: 5,
            tools: &["style guide", "a second reader"],
        },
        TaskType::Research => StrategyTemplate {
            primary: &["Open every cited source", "Confirm each citation says what is claimed"],
            secondary: &["Look for a contradicting source", "Check publication dates"],
            red_flags: &["Citations that cannot be found", "Suspiciously precise statistics", "No dissenting view"],
            base_minutes: 15,
            tools: &["scholarly search engine", "library database"],
        },
        TaskType::Analysis => StrategyTemplate {
            primary: &["Re-derive the key numbers", "Check the assumptions"],
            secondary: &["Try an alternative explanation", "Check sample sizes"],
            red_flags: &["Correlation presented as causation", "Unstated assumptions"],
            base_minutes: 12,
            tools: &["spreadsheet", "the raw data"],
        },
        TaskType::Math => StrategyTemplate {
            primary: &["Recompute each step by hand", "Plug the answer back into the problem"],
            secondary: &["Estimate the expected magnitude", "Check units"],
            red_flags: &["Skipped steps", "Answer with wrong units or magnitude"],
            base_minutes: 8,
            tools: &["calculator", "computer algebra system"],
        },
        TaskType::Creative => StrategyTemplate {
            primary: &["Check it matches your intent"],
            secondary: &["Check for unintentional similarity to existing work"],
            red_flags: &["Close paraphrase of known works"],
            base_minutes: 3,
            tools: &["plagiarism checker"],
        },
        TaskType::Factual => StrategyTemplate {
            primary: &["Confirm the fact in an authoritative source", "Check the date the fact applies to"],
            secondary: &["Cross-check with a second independent source"],
            red_flags: &["Exact figures without a source", "Outdated information", "Confident answers to obscure questions"],
            base_minutes: 5,
            tools: &["encyclopedia", "official statistics", "search engine"],
        },
        TaskType::General => StrategyTemplate {
            primary: &["Check the key claim against one other source"],
            secondary: &["Ask a clarifying follow-up question"],
            red_flags: &["Answers that are vague where detail matters"],
            base_minutes: 5,
            tools: &["search engine"],
        },
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl VerificationStrategy {
    /// Guidance for `task_type`; estimated time grows ×1.5 at medium and ×2 at high risk.
    pub fn for_task(task_type: TaskType, risk_level: RiskLevel) -> Self {
        let t = template(task_type);
        let estimated_minutes = match risk_level {
            RiskLevel::Low => t.base_minutes,
            RiskLevel::Medium => (t.base_minutes * 3).div_ceil(2),
            RiskLevel::High => t.base_minutes * 2,
        };
        // Low risk needs only the primary checks.
        let secondary_checks = match risk_level {
            RiskLevel::Low => Vec::new(),
            RiskLevel::Medium | RiskLevel::High => owned(t.secondary),
        };

        Self {
            task_type,
            risk_level,
            primary_checks: owned(t.primary),
            secondary_checks,
            red_flags: owned(t.red_flags),
            estimated_minutes,
            suggested_tools: owned(t.tools),
        }
    }

    pub fn for_profile(profile: &TrustProfile) -> Self {
        Self::for_task(profile.task_type, profile.risk_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_scales_with_risk() {
        let low = VerificationStrategy::for_task(TaskType::Research, RiskLevel::Low);
        let medium = VerificationStrategy::for_task(TaskType::Research, RiskLevel::Medium);
        let high = VerificationStrategy::for_task(TaskType::Research, RiskLevel::High);
        assert_eq!(low.estimated_minutes, 15);
        assert_eq!(medium.estimated_minutes, 23);
        assert_eq!(high.estimated_minutes, 30);
    }

    #[test]
    fn low_risk_skips_secondary_checks() {
        let low = VerificationStrategy::for_task(TaskType::Coding, RiskLevel::Low);
        assert!(low.secondary_checks.is_empty());
        assert!(!low.primary_checks.is_empty());

        let high = VerificationStrategy::for_task(TaskType::Coding, RiskLevel::High);
        assert!(!high.secondary_checks.is_empty());
    }

    #[test]
    fn every_task_type_has_guidance() {
        for task in TaskType::ALL {
            let strategy = VerificationStrategy::for_task(task, RiskLevel::Medium);
            assert!(!strategy.primary_checks.is_empty(), "{task}");
            assert!(!strategy.red_flags.is_empty(), "{task}");
            assert!(!strategy.suggested_tools.is_empty(), "{task}");
            assert!(strategy.estimated_minutes > 0);
        }
    }
}
