pub mod activity;
pub mod confidence;
pub mod consistency;
pub mod diplotype;
pub mod phenotype;
pub mod star;

pub use activity::*;
pub use confidence::*;
pub use consistency::*;
pub use diplotype::*;
pub use phenotype::*;
pub use star::*;

use crate::error::EngineError;
use crate::rules::RuleTables;
use crate::types::*;

pub fn build_gene_profile(
    gene: &str,
    observations: &[AlleleObservation],
    tables: &RuleTables,
    config: &EngineConfig,
) -> GeneProfile {
    let observed = expand_observations(observations);
    let call = call_diplotype(&observed);

    let evidence = if observed.is_empty() {
        EvidenceLevel::None
    } else if observations
        .iter()
        .any(|o| o.source == StarSource::Reported && o.multiplicity > 0)
    {
        EvidenceLevel::DirectStar
    } else {
        EvidenceLevel::RsidInferred
    };

    let (phenotype, activity_score, decision_trace) = if call.wildtype_default {
        let activity_score = config.wildtype_activity_score;
        let trace = DecisionTrace {
            method: TraceMethod::WildtypeDefault,
            reason: Some("No variants detected".to_string()),
            observed_alleles: observed,
            alleles: call.alleles.to_vec(),
            allele_details: Vec::new(),
            activity_score,
            phenotype_rule: format!(
                "{} → {} (wildtype assumption)",
                call.diplotype,
                Phenotype::NM.full_name()
            ),
        };
        (Phenotype::NM, activity_score, trace)
    } else {
        let (activity_score, allele_details) =
            calculate_activity_score(gene, &call.alleles, tables);
        let phenotype_call = classify_phenotype(gene, &call.diplotype, activity_score, tables);
        let trace = DecisionTrace {
            method: phenotype_call.method,
            reason: None,
            observed_alleles: observed,
            alleles: call.alleles.to_vec(),
            allele_details,
            activity_score,
            phenotype_rule: phenotype_call.rule,
        };
        (phenotype_call.phenotype, activity_score, trace)
    };

    let confidence = estimate_confidence(evidence, decision_trace.method, config);

    log::debug!(
        "{}: {} {} (score {}, {}, confidence {})",
        gene,
        call.diplotype,
        phenotype,
        activity_score,
        decision_trace.method.as_str(),
        confidence
    );

    GeneProfile {
        gene: gene.to_string(),
        diplotype: call.diplotype,
        phenotype: Some(phenotype),
        activity_score,
        clinical_interpretation: clinical_interpretation(gene, Some(phenotype), activity_score),
        decision_trace,
        confidence,
    }
}

pub fn build_pharmacogenomic_profile(
    variants: &[VariantRecord],
    tables: &RuleTables,
    config: &EngineConfig,
) -> PgxProfile {
    let mut observations = collect_observations(variants, tables);

    tables
        .tracked_genes()
        .iter()
        .map(|gene| {
            let gene_observations = observations.remove(gene).unwrap_or_default();
            let profile = build_gene_profile(gene, &gene_observations, tables, config);
            (gene.clone(), profile)
        })
        .collect()
}

pub fn ensure_complete(profile: &PgxProfile, tables: &RuleTables) -> Result<(), EngineError> {
    match tables
        .tracked_genes()
        .iter()
        .find(|gene| !profile.contains_key(gene.as_str()))
    {
        Some(gene) => Err(EngineError::MissingGeneProfile(gene.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> RuleTables {
        RuleTables::bundled().unwrap()
    }

    fn observation(gene: &str, star: &str, multiplicity: u8, source: StarSource) -> AlleleObservation {
        AlleleObservation {
            gene: gene.to_string(),
            star: star.to_string(),
            multiplicity,
            source,
        }
    }

    #[test]
    fn test_empty_observations_wildtype_for_every_gene() {
        let tables = tables();
        let config = EngineConfig::default();

        for gene in tables.tracked_genes() {
            let profile = build_gene_profile(gene, &[], &tables, &config);
            assert_eq!(profile.diplotype, "*1/*1");
            assert_eq!(profile.phenotype, Some(Phenotype::NM));
            assert_eq!(profile.activity_score, 2.0);
            assert_eq!(profile.decision_trace.method, TraceMethod::WildtypeDefault);
            assert_eq!(profile.confidence, 0.65);
        }
    }

    #[test]
    fn test_cyp2d6_homozygous_star4() {
        let tables = tables();
        let obs = vec![observation("CYP2D6", "*4", 2, StarSource::Reported)];

        let profile = build_gene_profile("CYP2D6", &obs, &tables, &EngineConfig::default());

        assert_eq!(profile.diplotype, "*4/*4");
        assert_eq!(profile.phenotype, Some(Phenotype::PM));
        assert_eq!(profile.activity_score, 0.0);
        assert_eq!(profile.decision_trace.method, TraceMethod::DiplotypeLookup);
        assert_eq!(profile.confidence, 0.95);
    }

    #[test]
    fn test_cyp2c9_heterozygous_star3_uses_score_model() {
        let tables = tables();
        let obs = vec![observation("CYP2C9", "*3", 1, StarSource::RsidInferred)];

        let profile = build_gene_profile("CYP2C9", &obs, &tables, &EngineConfig::default());

        assert_eq!(profile.diplotype, "*1/*3");
        assert_eq!(profile.phenotype, Some(Phenotype::IM));
        assert_eq!(profile.activity_score, 1.0);
        assert_eq!(profile.decision_trace.method, TraceMethod::ActivityScoreModel);
        assert_eq!(profile.confidence, 0.75);
        assert_eq!(profile.decision_trace.allele_details.len(), 2);
    }

    #[test]
    fn test_zero_copy_star_is_not_evidence() {
        let tables = tables();
        let obs = vec![observation("TPMT", "*3A", 0, StarSource::Reported)];

        let profile = build_gene_profile("TPMT", &obs, &tables, &EngineConfig::default());

        assert_eq!(profile.diplotype, "*1/*1");
        assert_eq!(profile.confidence, 0.65);
    }

    #[test]
    fn test_skipped_table_entry_falls_back_to_score_model() {
        let tables = RuleTables::from_sources(&crate::rules::RuleSources {
            diplotype_map: r#"{ "TPMT": { "*1/*1": "NM", "*1/*3A": "Indeterminate" } }"#,
            ..crate::rules::RuleSources::bundled()
        })
        .unwrap();
        let obs = vec![observation("TPMT", "*3A", 1, StarSource::Reported)];

        let profile = build_gene_profile("TPMT", &obs, &tables, &EngineConfig::default());

        assert_eq!(profile.diplotype, "*1/*3A");
        assert_eq!(profile.decision_trace.method, TraceMethod::ActivityScoreModel);
        assert_eq!(profile.activity_score, 1.0);
        assert_eq!(profile.phenotype, Some(Phenotype::IM));
        assert_eq!(profile.confidence, 0.85);
    }

    #[test]
    fn test_profile_covers_tracked_genes() {
        let tables = tables();
        let profile = build_pharmacogenomic_profile(&[], &tables, &EngineConfig::default());

        assert_eq!(profile.len(), tables.tracked_genes().len());
        assert!(ensure_complete(&profile, &tables).is_ok());

        let mut partial = profile.clone();
        partial.remove("DPYD");
        assert!(matches!(
            ensure_complete(&partial, &tables),
            Err(EngineError::MissingGeneProfile(gene)) if gene == "DPYD"
        ));
    }
}
