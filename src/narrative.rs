use crate::types::{Narrative, Phenotype, VariantRecord};

const DEFAULT_MECHANISM: &str = "Variant impacts gene function.";
const DEFAULT_EVIDENCE: &str = "CPIC";
const DEFAULT_CITATION: &str = "CPIC guideline";

/// Everything a narrative generator gets to see about one drug analysis.
#[derive(Debug, Clone)]
pub struct NarrativeRequest<'a> {
    pub patient_id: &'a str,
    pub drug: &'a str,
    pub primary_gene: &'a str,
    pub phenotype: Phenotype,
    pub detected_variants: &'a [VariantRecord],
    pub recommendation: &'a str,
}

impl NarrativeRequest<'_> {
    /// Comma-separated rsIDs of the detected variants.
    pub fn variant_summary(&self) -> String {
        self.detected_variants
            .iter()
            .map(|v| v.rsid.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Produces the explanatory block of a drug result.
///
/// Implementations may call out to external services. A failure is not fatal:
/// the analyzer substitutes the template narrative and records it in the
/// quality metrics.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, request: &NarrativeRequest<'_>) -> anyhow::Result<Narrative>;
}

/// Deterministic narrative built from the recommendation text alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl NarrativeGenerator for TemplateNarrator {
    fn generate(&self, request: &NarrativeRequest<'_>) -> anyhow::Result<Narrative> {
        Ok(template_narrative(request.recommendation))
    }
}

pub fn template_narrative(recommendation: &str) -> Narrative {
    Narrative {
        summary: recommendation.to_string(),
        mechanism: Some(DEFAULT_MECHANISM.to_string()),
        evidence: Some(DEFAULT_EVIDENCE.to_string()),
        citations: vec![DEFAULT_CITATION.to_string()],
    }
}

/// Narrative used when there is no gene variant or phenotype to explain.
pub fn no_evidence_narrative(recommendation: &str) -> Narrative {
    Narrative {
        summary: recommendation.to_string(),
        mechanism: Some("No variant-level evidence available.".to_string()),
        evidence: Some("None".to_string()),
        citations: Vec::new(),
    }
}

/// Fills fields a generator left empty with the template defaults.
pub fn complete_narrative(mut narrative: Narrative, recommendation: &str) -> Narrative {
    if narrative.summary.trim().is_empty() {
        narrative.summary = recommendation.to_string();
    }
    if narrative.mechanism.is_none() {
        narrative.mechanism = Some(DEFAULT_MECHANISM.to_string());
    }
    if narrative.evidence.is_none() {
        narrative.evidence = Some(DEFAULT_EVIDENCE.to_string());
    }
    if narrative.citations.is_empty() {
        narrative.citations.push(DEFAULT_CITATION.to_string());
    }
    narrative
}
