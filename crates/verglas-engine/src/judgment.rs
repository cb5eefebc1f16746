//! Judgment rule engine.
//!
//! A pure, total function from a run's [`DistributionSummary`] to a
//! PASS / WARNING / FAIL verdict. Rules are evaluated in fixed priority
//! order and every summary maps to exactly one rule — there is no
//! fall-through to an undefined judgment. The fired rule's identifier is
//! part of the result for audit.

use serde::{Deserialize, Serialize};

use crate::config::JudgmentConfig;
use crate::montecarlo::DistributionSummary;

/// The engineering judgment for a layout under a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Warning,
    Fail,
}

/// Rule identifiers, in evaluation order.
pub mod rules {
    /// FAIL: empirical probability of failure at or above the limit.
    pub const PF_LIMIT: &str = "Pf>=0.20";
    /// FAIL: mean safety factor below the failure threshold.
    pub const MEAN_SF_BELOW_MIN: &str = "mean-SF<1.0";
    /// WARNING: mean is safe but the 95% upper confidence limit of the
    /// risk metric crosses the failure threshold.
    pub const UCL_VIOLATION: &str = "UCL95-violation";
    /// PASS: mean safety factor at or above the pass target.
    pub const PASS_TARGET: &str = "SF>=1.5";
    /// WARNING: mean safety factor in the band between failure and pass
    /// thresholds with no confidence-limit violation.
    pub const DEFAULT_BAND: &str = "default-band";
}

/// One run's verdict plus the statistics and rule that justified it.
/// Serialize-only: the rule identifier borrows from the static rule table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgmentResult {
    pub verdict: Verdict,
    /// Identifier of the rule that fired.
    pub rule: &'static str,
    /// The summary the rules were applied to.
    pub summary: DistributionSummary,
    /// Human-readable justification.
    pub reasoning: String,
}

/// Apply the decision rules to a run summary.
pub fn judge(summary: &DistributionSummary, config: &JudgmentConfig) -> JudgmentResult {
    let pf = summary.failure_probability;
    let mean_sf = summary.mean_sf;

    let (verdict, rule, reasoning) = if pf >= config.fail_pf {
        (
            Verdict::Fail,
            rules::PF_LIMIT,
            format!(
                "failure probability {:.1}% at or above limit {:.0}%",
                pf * 100.0,
                config.fail_pf * 100.0
            ),
        )
    } else if mean_sf < config.fail_sf {
        (
            Verdict::Fail,
            rules::MEAN_SF_BELOW_MIN,
            format!(
                "mean safety factor {:.2} below minimum {:.1}",
                mean_sf, config.fail_sf
            ),
        )
    } else if summary.ucl95_risk > config.risk_limit {
        (
            Verdict::Warning,
            rules::UCL_VIOLATION,
            format!(
                "mean safety factor {:.2} is safe but the 95% confidence bound on risk ({:.3}) crosses the failure threshold",
                mean_sf, summary.ucl95_risk
            ),
        )
    } else if mean_sf >= config.pass_sf {
        (
            Verdict::Pass,
            rules::PASS_TARGET,
            format!(
                "mean safety factor {:.2} at or above target {:.1}, failure probability {:.1}%",
                mean_sf,
                config.pass_sf,
                pf * 100.0
            ),
        )
    } else {
        (
            Verdict::Warning,
            rules::DEFAULT_BAND,
            format!(
                "mean safety factor {:.2} in [{:.1}, {:.1}) band; adequate but below the pass target",
                mean_sf, config.fail_sf, config.pass_sf
            ),
        )
    };

    JudgmentResult {
        verdict,
        rule,
        summary: summary.clone(),
        reasoning,
    }
}
