//! Per-perspective findings, the raw input to consensus.

use serde::{Deserialize, Serialize};

/// Ordinal risk level. Ordering is significant: `Critical` is the maximum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Multiplier from summed impact to estimated lines of change.
    pub fn loc_multiplier(self) -> f64 {
        match self {
            Self::Critical => 200.0,
            Self::High => 150.0,
            Self::Medium => 100.0,
            Self::Low => 50.0,
        }
    }

    /// Additive priority penalty.
    pub fn priority_penalty(self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Medium => -0.05,
            Self::High => -0.10,
            Self::Critical => -0.15,
        }
    }

    /// Discount applied to impact when computing risk-adjusted impact.
    pub fn impact_discount(self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 0.8,
            Self::High => 0.6,
            Self::Critical => 0.4,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImpact {
    reliability: f64,
    security: f64,
    devex: f64,
    performance: f64,
}

/// Expected impact across four independent dimensions, each in [-1, 1].
///
/// Values are clamped on construction and on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawImpact")]
pub struct ImpactVector {
    pub reliability: f64,
    pub security: f64,
    pub devex: f64,
    pub performance: f64,
}

impl From<RawImpact> for ImpactVector {
    fn from(raw: RawImpact) -> Self {
        Self::new(raw.reliability, raw.security, raw.devex, raw.performance)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

impl ImpactVector {
    pub fn new(reliability: f64, security: f64, devex: f64, performance: f64) -> Self {
        Self {
            reliability: clamp_unit(reliability),
            security: clamp_unit(security),
            devex: clamp_unit(devex),
            performance: clamp_unit(performance),
        }
    }

    /// Sum of absolute values across all dimensions.
    pub fn magnitude(&self) -> f64 {
        self.reliability.abs() + self.security.abs() + self.devex.abs() + self.performance.abs()
    }

    /// Per-dimension mean. Empty input yields the zero vector.
    pub fn mean<'a>(impacts: impl IntoIterator<Item = &'a ImpactVector>) -> Self {
        let mut sum = ImpactVector::default();
        let mut count = 0usize;
        for impact in impacts {
            sum.reliability += impact.reliability;
            sum.security += impact.security;
            sum.devex += impact.devex;
            sum.performance += impact.performance;
            count += 1;
        }
        if count == 0 {
            return sum;
        }
        let n = count as f64;
        Self::new(
            sum.reliability / n,
            sum.security / n,
            sum.devex / n,
            sum.performance / n,
        )
    }
}

/// Risk attached to a finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub level: RiskLevel,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Url,
    Quote,
    SpecReference,
}

/// Evidence quality grade, A best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceQuality {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: EvidenceType,
    pub value: String,
    pub quality: EvidenceQuality,
}

/// A single claim produced under one perspective. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub claim: String,
    pub recommendation: String,
    #[serde(default)]
    pub expected_impact: ImpactVector,
    #[serde(default)]
    pub risk: Risk,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl Finding {
    pub fn new(claim: &str, recommendation: &str) -> Self {
        Self {
            claim: claim.to_string(),
            recommendation: recommendation.to_string(),
            expected_impact: ImpactVector::default(),
            risk: Risk::default(),
            evidence: Vec::new(),
        }
    }

    pub fn with_impact(mut self, impact: ImpactVector) -> Self {
        self.expected_impact = impact;
        self
    }

    pub fn with_risk(mut self, level: RiskLevel) -> Self {
        self.risk.level = level;
        self
    }

    pub fn with_evidence(mut self, kind: EvidenceType, value: &str, quality: EvidenceQuality) -> Self {
        self.evidence.push(Evidence {
            kind,
            value: value.to_string(),
            quality,
        });
        self
    }

    /// Text used for similarity comparisons.
    pub fn similarity_text(&self) -> String {
        format!("{} {}", self.claim, self.recommendation)
    }
}

/// All findings produced under one perspective, with that perspective's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingBatch {
    pub perspective: String,
    pub confidence: f64,
    pub findings: Vec<Finding>,
}

impl FindingBatch {
    pub fn new(perspective: &str, confidence: f64, findings: Vec<Finding>) -> Self {
        Self {
            perspective: perspective.to_string(),
            confidence,
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_clamped_on_construction() {
        let impact = ImpactVector::new(2.0, -3.0, 0.5, f64::NAN);
        assert_eq!(impact.reliability, 1.0);
        assert_eq!(impact.security, -1.0);
        assert_eq!(impact.devex, 0.5);
        assert_eq!(impact.performance, 0.0);
    }

    #[test]
    fn test_impact_clamped_on_deserialize() {
        let impact: ImpactVector =
            serde_json::from_str(r#"{"reliability": 4.0, "security": -0.2}"#).unwrap();
        assert_eq!(impact.reliability, 1.0);
        assert!((impact.security + 0.2).abs() < 1e-9);
        assert_eq!(impact.devex, 0.0);
    }

    #[test]
    fn test_impact_mean_and_magnitude() {
        let a = ImpactVector::new(0.4, 0.2, 0.0, -0.2);
        let b = ImpactVector::new(0.2, 0.6, 0.0, 0.2);
        let mean = ImpactVector::mean([&a, &b]);
        assert!((mean.reliability - 0.3).abs() < 1e-9);
        assert!((mean.security - 0.4).abs() < 1e-9);
        assert!(mean.performance.abs() < 1e-9);
        assert!((a.magnitude() - 0.8).abs() < 1e-9);
        assert_eq!(ImpactVector::mean([]), ImpactVector::default());
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert_eq!(RiskLevel::High.to_string(), "high");
    }

    #[test]
    fn test_evidence_type_field_name() {
        let finding = Finding::new("c", "r").with_evidence(
            EvidenceType::SpecReference,
            "RFC 6749",
            EvidenceQuality::A,
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["evidence"][0]["type"], "spec_reference");
        assert_eq!(json["evidence"][0]["quality"], "A");
    }
}
