//! Greedy single-link clustering of findings.
//!
//! For each finding in input order that is not yet assigned, open a cluster
//! seeded with it, then absorb every later unassigned finding whose
//! perspective is not yet represented in the cluster and whose text
//! similarity to the seed exceeds the threshold. O(n²) comparisons; runs
//! see tens of findings, not thousands.

use std::collections::HashSet;

use tracing::{debug, info};

use super::{ConsensusFinding, ConsensusResult};
use crate::config::GovernanceConfig;
use crate::model::{Evidence, Finding, FindingBatch, ImpactVector, RiskLevel};
use crate::similarity::text_similarity;

/// A finding tagged with the perspective and confidence of its batch.
struct Member<'a> {
    perspective: &'a str,
    confidence: f64,
    finding: &'a Finding,
}

/// Cluster `batches` into consensus findings for `target_id`.
pub fn compute_consensus(
    batches: &[FindingBatch],
    target_id: &str,
    threshold: f64,
) -> ConsensusResult {
    let mut perspectives: Vec<String> = Vec::new();
    for batch in batches {
        if !perspectives.contains(&batch.perspective) {
            perspectives.push(batch.perspective.clone());
        }
    }

    let members: Vec<Member<'_>> = batches
        .iter()
        .flat_map(|batch| {
            batch.findings.iter().map(move |finding| Member {
                perspective: batch.perspective.as_str(),
                confidence: batch.confidence,
                finding,
            })
        })
        .collect();

    if members.is_empty() {
        let mut result = ConsensusResult::empty(target_id);
        result.perspectives = perspectives;
        return result;
    }

    let texts: Vec<String> = members.iter().map(|m| m.finding.similarity_text()).collect();
    let mut assigned = vec![false; members.len()];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for seed in 0..members.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut cluster = vec![seed];
        let mut represented: HashSet<&str> = HashSet::from([members[seed].perspective]);

        for candidate in (seed + 1)..members.len() {
            if assigned[candidate] || represented.contains(members[candidate].perspective) {
                continue;
            }
            let similarity = text_similarity(&texts[seed], &texts[candidate]);
            if similarity > threshold {
                debug!(seed, candidate, similarity, "Merging finding into cluster");
                assigned[candidate] = true;
                represented.insert(members[candidate].perspective);
                cluster.push(candidate);
            }
        }
        clusters.push(cluster);
    }

    let total = perspectives.len();
    let findings: Vec<ConsensusFinding> = clusters
        .iter()
        .map(|cluster| build_finding(&members, cluster, total))
        .collect();

    let overall_agreement =
        findings.iter().map(|f| f.agreement_score).sum::<f64>() / findings.len() as f64;

    info!(
        target_id,
        findings = members.len(),
        clusters = findings.len(),
        overall_agreement,
        "Consensus computed"
    );

    ConsensusResult {
        target_id: target_id.to_string(),
        findings,
        overall_agreement,
        perspectives,
    }
}

fn build_finding(members: &[Member<'_>], cluster: &[usize], total_perspectives: usize) -> ConsensusFinding {
    // Highest confidence wins the text; ties go to the earliest member.
    let mut best = &members[cluster[0]];
    for &idx in &cluster[1..] {
        if members[idx].confidence > best.confidence {
            best = &members[idx];
        }
    }

    let supporting_perspectives: Vec<String> = cluster
        .iter()
        .map(|&idx| members[idx].perspective.to_string())
        .collect();

    let combined_confidence =
        cluster.iter().map(|&idx| members[idx].confidence).sum::<f64>() / cluster.len() as f64;

    let merged_impact =
        ImpactVector::mean(cluster.iter().map(|&idx| &members[idx].finding.expected_impact));

    let risk_level = cluster
        .iter()
        .map(|&idx| members[idx].finding.risk.level)
        .max()
        .unwrap_or(RiskLevel::Low);

    let mut merged_evidence: Vec<Evidence> = Vec::new();
    for &idx in cluster {
        for evidence in &members[idx].finding.evidence {
            let duplicate = merged_evidence
                .iter()
                .any(|e| e.kind == evidence.kind && e.value == evidence.value);
            if !duplicate {
                merged_evidence.push(evidence.clone());
            }
        }
    }

    let agreement_score = if total_perspectives == 0 {
        0.0
    } else {
        supporting_perspectives.len() as f64 / total_perspectives as f64
    };

    ConsensusFinding {
        claim: best.finding.claim.clone(),
        recommendation: best.finding.recommendation.clone(),
        supporting_perspectives,
        agreement_score,
        combined_confidence,
        merged_impact,
        merged_evidence,
        risk_level,
    }
}

/// Consensus with the threshold taken from configuration.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    threshold: f64,
}

impl ConsensusEngine {
    pub fn new(config: &GovernanceConfig) -> Self {
        Self {
            threshold: config.consensus_similarity_threshold,
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn compute(&self, batches: &[FindingBatch], target_id: &str) -> ConsensusResult {
        compute_consensus(batches, target_id, self.threshold)
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(&GovernanceConfig::default())
    }
}
