// ⚖️ Verdicts - named checks and their worst-case roll-up
//
// Policy: PASS/FAIL checks → ACCEPT only when every check passes.
// Risk:   PASS/WARN/FAIL checks → any FAIL = REJECT, else any WARN = WARN, else OK.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CHECK STATUSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyCheckStatus {
    Pass,
    Fail,
}

impl PolicyCheckStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            PolicyCheckStatus::Pass
        } else {
            PolicyCheckStatus::Fail
        }
    }
}

/// Declaration order is severity order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCheckStatus {
    Pass,
    Warn,
    Fail,
}

// ============================================================================
// ROLL-UP STATUSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    Accept,
    Reject,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Accept => "ACCEPT",
            PolicyStatus::Reject => "REJECT",
        }
    }
}

/// Ordered by severity: OK < WARN < REJECT
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskStatus {
    Ok,
    Warn,
    Reject,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Ok => "OK",
            RiskStatus::Warn => "WARN",
            RiskStatus::Reject => "REJECT",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CHECK
// ============================================================================

/// One named check: machine code, status, explanation.
/// Serialized as a `reason_codes` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check<S> {
    pub code: String,
    pub status: S,
    pub explain: String,
}

impl<S> Check<S> {
    pub fn new(code: &str, status: S, explain: impl Into<String>) -> Self {
        Check {
            code: code.to_string(),
            status,
            explain: explain.into(),
        }
    }
}

// ============================================================================
// VERDICTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub policy_status: PolicyStatus,
    pub checks: Vec<Check<PolicyCheckStatus>>,
}

impl PolicyVerdict {
    pub fn from_checks(checks: Vec<Check<PolicyCheckStatus>>) -> Self {
        let all_pass = checks.iter().all(|c| c.status == PolicyCheckStatus::Pass);
        PolicyVerdict {
            policy_status: if all_pass {
                PolicyStatus::Accept
            } else {
                PolicyStatus::Reject
            },
            checks,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.policy_status == PolicyStatus::Accept
    }

    pub fn check(&self, code: &str) -> Option<&Check<PolicyCheckStatus>> {
        self.checks.iter().find(|c| c.code == code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub risk_status: RiskStatus,
    pub checks: Vec<Check<RiskCheckStatus>>,

    /// Largest single category's share of projected savings (4 dp)
    pub largest_savings_share: f64,
}

impl RiskVerdict {
    pub fn from_checks(checks: Vec<Check<RiskCheckStatus>>, largest_savings_share: f64) -> Self {
        let worst = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(RiskCheckStatus::Pass);

        let risk_status = match worst {
            RiskCheckStatus::Fail => RiskStatus::Reject,
            RiskCheckStatus::Warn => RiskStatus::Warn,
            RiskCheckStatus::Pass => RiskStatus::Ok,
        };

        RiskVerdict {
            risk_status,
            checks,
            largest_savings_share,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_rollup_requires_all_pass() {
        let verdict = PolicyVerdict::from_checks(vec![
            Check::new("A", PolicyCheckStatus::Pass, "ok"),
            Check::new("B", PolicyCheckStatus::Fail, "bad"),
        ]);
        assert_eq!(verdict.policy_status, PolicyStatus::Reject);
        assert!(verdict.check("B").is_some());

        let verdict = PolicyVerdict::from_checks(vec![Check::new("A", PolicyCheckStatus::Pass, "ok")]);
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_risk_rollup_precedence() {
        let warn_and_fail = RiskVerdict::from_checks(
            vec![
                Check::new("A", RiskCheckStatus::Warn, ""),
                Check::new("B", RiskCheckStatus::Fail, ""),
            ],
            0.0,
        );
        assert_eq!(warn_and_fail.risk_status, RiskStatus::Reject);

        let warn_only = RiskVerdict::from_checks(
            vec![
                Check::new("A", RiskCheckStatus::Pass, ""),
                Check::new("B", RiskCheckStatus::Warn, ""),
            ],
            0.0,
        );
        assert_eq!(warn_only.risk_status, RiskStatus::Warn);

        let clean = RiskVerdict::from_checks(vec![Check::new("A", RiskCheckStatus::Pass, "")], 0.0);
        assert_eq!(clean.risk_status, RiskStatus::Ok);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&RiskStatus::Ok).unwrap(), "\"OK\"");
        assert_eq!(serde_json::to_string(&PolicyCheckStatus::Fail).unwrap(), "\"FAIL\"");
        assert!(RiskStatus::Ok < RiskStatus::Warn && RiskStatus::Warn < RiskStatus::Reject);
    }
}
