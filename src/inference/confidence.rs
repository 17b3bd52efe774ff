use crate::types::{round2, EngineConfig, TraceMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvidenceLevel {
    None,
    RsidInferred,
    DirectStar,
}

pub fn estimate_confidence(evidence: EvidenceLevel, method: TraceMethod, config: &EngineConfig) -> f64 {
    let mut confidence = match evidence {
        EvidenceLevel::None => config.base_confidence,
        EvidenceLevel::RsidInferred => config.allele_evidence_confidence,
        EvidenceLevel::DirectStar => config.direct_star_confidence,
    };

    if method == TraceMethod::ActivityScoreModel {
        confidence -= config.score_model_penalty;
    }

    if config.clamp_confidence {
        confidence = confidence.clamp(0.0, 1.0);
    }

    round2(confidence)
}
