//! Handling-path policy.

use std::fmt;

use nopass_firewall::{RiskAssessment, RiskLevel};
use serde::{Deserialize, Serialize};

/// How much scrutiny the output review applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlingPath {
    Fast,
    Slow,
}

impl HandlingPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }
}

impl fmt::Display for HandlingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slow when the risk is HIGH or a self-check was requested, else fast.
pub fn decide_path(assessment: &RiskAssessment) -> HandlingPath {
    if assessment.risk_level == RiskLevel::High || assessment.self_check_required {
        HandlingPath::Slow
    } else {
        HandlingPath::Fast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_path_exhaustive() {
        let cases = [
            (RiskLevel::Low, false, HandlingPath::Fast),
            (RiskLevel::Medium, false, HandlingPath::Fast),
            (RiskLevel::High, false, HandlingPath::Slow),
            (RiskLevel::Low, true, HandlingPath::Slow),
            (RiskLevel::Medium, true, HandlingPath::Slow),
            (RiskLevel::High, true, HandlingPath::Slow),
        ];
        for (level, self_check, expected) in cases {
            let assessment = RiskAssessment::new(level).with_self_check(self_check);
            assert_eq!(
                decide_path(&assessment),
                expected,
                "level={} self_check={}",
                level,
                self_check
            );
        }
    }

    #[test]
    fn test_path_wire_format() {
        assert_eq!(serde_json::to_string(&HandlingPath::Slow).unwrap(), "\"slow\"");
        assert_eq!(HandlingPath::Fast.to_string(), "fast");
    }
}
