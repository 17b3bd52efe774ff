use crate::error::EngineError;
use crate::inference::{
    autofill_star_alleles, build_pharmacogenomic_profile, check_diplotype_consistency,
    ensure_complete,
};
use crate::narrative::{
    complete_narrative, no_evidence_narrative, template_narrative, NarrativeGenerator,
    NarrativeRequest, TemplateNarrator,
};
use crate::risk::{assess_drug_risk, drug_interpretation, get_clinical_recommendation};
use crate::rules::RuleTables;
use crate::types::*;
use rayon::prelude::*;

/// Runs the full per-drug analysis against one set of rule tables.
///
/// Holds only read-only state, so one analyzer can serve concurrent requests.
pub struct PgxAnalyzer {
    tables: RuleTables,
    config: EngineConfig,
    narrator: Box<dyn NarrativeGenerator>,
}

impl PgxAnalyzer {
    pub fn new(tables: RuleTables, config: EngineConfig) -> Self {
        Self {
            tables,
            config,
            narrator: Box::new(TemplateNarrator),
        }
    }

    pub fn with_narrator(mut self, narrator: Box<dyn NarrativeGenerator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-gene profile for the variant list, checked for completeness.
    pub fn profile(&self, variants: &[VariantRecord]) -> Result<PgxProfile, EngineError> {
        let profile = build_pharmacogenomic_profile(variants, &self.tables, &self.config);
        ensure_complete(&profile, &self.tables)?;
        Ok(profile)
    }

    pub fn analyze_drug(
        &self,
        patient_id: &str,
        drug: &str,
        variants: &[VariantRecord],
    ) -> Result<AnalysisResult, EngineError> {
        let profile = self.profile(variants)?;
        Ok(self.analyze_with_profile(patient_id, drug, variants, &profile))
    }

    /// Analyzes each drug independently against one shared profile.
    /// Results come back in the order the drugs were given.
    pub fn analyze_drugs(
        &self,
        patient_id: &str,
        drugs: &[String],
        variants: &[VariantRecord],
    ) -> Result<Vec<AnalysisResult>, EngineError> {
        let profile = self.profile(variants)?;

        Ok(drugs
            .par_iter()
            .map(|drug| self.analyze_with_profile(patient_id, drug, variants, &profile))
            .collect())
    }

    /// Assembles one drug's result. The variant list is only read; star
    /// auto-fill runs on a local copy of the primary gene's variants.
    pub fn analyze_with_profile(
        &self,
        patient_id: &str,
        drug: &str,
        variants: &[VariantRecord],
        profile: &PgxProfile,
    ) -> AnalysisResult {
        let drug = drug.trim().to_uppercase();

        let risk = assess_drug_risk(&drug, profile, &self.tables, &self.config);
        let primary_gene = risk.primary_gene.as_deref();
        let gene_profile = primary_gene.and_then(|gene| profile.get(gene));
        let phenotype = gene_profile.and_then(|p| p.phenotype);

        let mut detected_variants: Vec<VariantRecord> = match primary_gene {
            Some(gene) => variants.iter().filter(|v| v.gene == gene).cloned().collect(),
            None => Vec::new(),
        };
        let filled = autofill_star_alleles(&mut detected_variants, &self.tables);
        if filled > 0 {
            log::debug!("{}: filled {} star labels from rsIDs", drug, filled);
        }

        let diplotype_consistent = gene_profile
            .map(|p| check_diplotype_consistency(&p.diplotype, &detected_variants))
            .unwrap_or(true);

        let recommendation =
            get_clinical_recommendation(&drug, primary_gene, phenotype, &self.tables);

        let (narrative, narrative_success) = match (primary_gene, phenotype) {
            (Some(gene), Some(phenotype)) if !detected_variants.is_empty() => {
                let request = NarrativeRequest {
                    patient_id,
                    drug: &drug,
                    primary_gene: gene,
                    phenotype,
                    detected_variants: &detected_variants,
                    recommendation: &recommendation.text,
                };
                match self.narrator.generate(&request) {
                    Ok(narrative) => (complete_narrative(narrative, &recommendation.text), true),
                    Err(e) => {
                        log::warn!("Narrative generation failed for {}: {:#}", drug, e);
                        (template_narrative(&recommendation.text), false)
                    }
                }
            }
            _ => (no_evidence_narrative(&recommendation.text), true),
        };

        let drug_level_interpretation =
            drug_interpretation(&drug, risk.risk_label, primary_gene, phenotype);

        let quality_metrics = QualityMetrics {
            vcf_parsing_success: true,
            variant_count: variants.len(),
            gene_match_success: primary_gene.is_some(),
            diplotype_consistent,
            narrative_success,
        };

        let pharmacogenomic_profile = ProfileSummary {
            primary_gene: risk.primary_gene.clone(),
            diplotype: gene_profile.map(|p| p.diplotype.clone()),
            phenotype,
            activity_score: gene_profile.map(|p| p.activity_score),
            decision_trace: gene_profile.map(|p| p.decision_trace.clone()),
            clinical_interpretation: gene_profile.map(|p| p.clinical_interpretation.clone()),
            gene_confidence: gene_profile.map(|p| p.confidence),
            detected_variants,
        };

        log::info!(
            "{}: {} ({}, confidence {})",
            drug,
            risk.risk_label,
            primary_gene.unwrap_or("no gene"),
            risk.confidence_score
        );

        AnalysisResult {
            patient_id: patient_id.to_string(),
            drug,
            risk_assessment: risk.assessment(),
            pharmacogenomic_profile,
            drug_level_interpretation,
            clinical_recommendation: recommendation,
            narrative,
            quality_metrics,
        }
    }
}

/// Tallies a batch of results.
pub fn summarize(results: &[AnalysisResult]) -> RunStats {
    results
        .par_iter()
        .fold(RunStats::default, |mut stats, result| {
            stats.record(result);
            stats
        })
        .reduce(RunStats::default, |mut total, stats| {
            total.merge(&stats);
            total
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNarrator;

    impl NarrativeGenerator for FailingNarrator {
        fn generate(&self, _request: &NarrativeRequest<'_>) -> anyhow::Result<Narrative> {
            anyhow::bail!("service unavailable")
        }
    }

    fn create_test_analyzer() -> PgxAnalyzer {
        PgxAnalyzer::new(RuleTables::bundled().unwrap(), EngineConfig::default())
    }

    fn create_test_variants() -> Vec<VariantRecord> {
        vec![
            VariantRecord::new("CYP2D6", "rs3892097", Genotype::new("T", "T")).with_ref("C"),
            VariantRecord::new("CYP2C19", "rs12248560", Genotype::new("C", "T")).with_ref("C"),
            VariantRecord::new("VKORC1", "rs9923231", Genotype::new("C", "T")).with_ref("C"),
        ]
    }

    #[test]
    fn test_analyze_codeine_poor_metabolizer() {
        let analyzer = create_test_analyzer();
        let variants = create_test_variants();

        let result = analyzer.analyze_drug("PATIENT_001", "codeine", &variants).unwrap();

        assert_eq!(result.drug, "CODEINE");
        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Ineffective);
        assert_eq!(result.risk_assessment.severity, Severity::High);
        // Rule 0.9, rsID-inferred lookup call 0.85
        assert_eq!(result.risk_assessment.confidence_score, 0.88);

        let profile = &result.pharmacogenomic_profile;
        assert_eq!(profile.primary_gene.as_deref(), Some("CYP2D6"));
        assert_eq!(profile.diplotype.as_deref(), Some("*4/*4"));
        assert_eq!(profile.phenotype, Some(Phenotype::PM));
        assert_eq!(profile.detected_variants.len(), 1);
        assert_eq!(profile.detected_variants[0].star.as_deref(), Some("*4"));

        assert!(result.quality_metrics.gene_match_success);
        assert!(result.quality_metrics.narrative_success);
        assert_eq!(result.quality_metrics.variant_count, 3);
        assert_eq!(result.narrative.citations, vec!["CPIC guideline"]);
    }

    #[test]
    fn test_caller_variants_untouched() {
        let analyzer = create_test_analyzer();
        let variants = create_test_variants();
        let before = variants.clone();

        analyzer.analyze_drug("PATIENT_001", "CODEINE", &variants).unwrap();

        assert_eq!(variants, before);
    }

    #[test]
    fn test_homozygous_call_from_genotype_is_consistent() {
        let analyzer = create_test_analyzer();
        let variants = create_test_variants();

        // T/T against ref C gives two copies of *4 without an alt_count
        let result = analyzer.analyze_drug("PATIENT_001", "CODEINE", &variants).unwrap();
        assert_eq!(result.pharmacogenomic_profile.diplotype.as_deref(), Some("*4/*4"));
        assert!(result.quality_metrics.diplotype_consistent);

        let variants = vec![
            VariantRecord::new("CYP2D6", "rs3892097", Genotype::new("T", "T")).with_alt_count(2),
        ];
        let result = analyzer.analyze_drug("PATIENT_001", "CODEINE", &variants).unwrap();
        assert!(result.quality_metrics.diplotype_consistent);
    }

    #[test]
    fn test_wildtype_gene_uses_no_evidence_narrative() {
        let analyzer = create_test_analyzer();

        let result = analyzer.analyze_drug("PATIENT_001", "WARFARIN", &[]).unwrap();

        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Safe);
        assert_eq!(
            result.pharmacogenomic_profile.decision_trace.as_ref().map(|t| t.method),
            Some(TraceMethod::WildtypeDefault)
        );
        assert!(result.pharmacogenomic_profile.detected_variants.is_empty());
        assert_eq!(result.narrative.evidence.as_deref(), Some("None"));
        assert_eq!(result.narrative.summary, result.clinical_recommendation.text);
        assert!(result.quality_metrics.diplotype_consistent);
    }

    #[test]
    fn test_unknown_drug() {
        let analyzer = create_test_analyzer();

        let result = analyzer
            .analyze_drug("PATIENT_001", "aspirin", &create_test_variants())
            .unwrap();

        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Unknown);
        assert_eq!(result.risk_assessment.confidence_score, 0.0);
        assert_eq!(result.pharmacogenomic_profile.primary_gene, None);
        assert!(!result.quality_metrics.gene_match_success);
        assert_eq!(
            result.drug_level_interpretation,
            "No pharmacogenomic gene associations detected for this medication."
        );
    }

    #[test]
    fn test_narrator_failure_falls_back() {
        let analyzer = create_test_analyzer().with_narrator(Box::new(FailingNarrator));

        let result = analyzer
            .analyze_drug("PATIENT_001", "CLOPIDOGREL", &create_test_variants())
            .unwrap();

        assert!(!result.quality_metrics.narrative_success);
        assert_eq!(result.narrative.summary, result.clinical_recommendation.text);
        assert_eq!(result.narrative.evidence.as_deref(), Some("CPIC"));
    }

    #[test]
    fn test_analyze_drugs_preserves_order() {
        let analyzer = create_test_analyzer();
        let drugs: Vec<String> = ["WARFARIN", "CODEINE", "ASPIRIN", "CLOPIDOGREL"]
            .iter()
            .map(|d| d.to_string())
            .collect();

        let results = analyzer
            .analyze_drugs("PATIENT_001", &drugs, &create_test_variants())
            .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.drug.as_str()).collect();
        assert_eq!(names, vec!["WARFARIN", "CODEINE", "ASPIRIN", "CLOPIDOGREL"]);

        let stats = summarize(&results);
        assert_eq!(stats.drugs_evaluated, 4);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.gene_matched, 3);
    }
}
