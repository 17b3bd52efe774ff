use crate::rules::{PhenotypeRiskRules, RuleTables};
use crate::types::{round2, EngineConfig, Phenotype, PgxProfile, RiskBlock, RiskRule};

const NORMAL_FUNCTION_KEY: &str = "NormalFunction";
const LOW_FUNCTION_KEY: &str = "LowFunction";

/// The first of the drug's configured genes (in table order) that appears in
/// the profile is the primary gene; other genes are not consulted.
pub fn assess_drug_risk(
    drug: &str,
    profile: &PgxProfile,
    tables: &RuleTables,
    config: &EngineConfig,
) -> RiskBlock {
    let drug = drug.trim().to_uppercase();

    let Some(drug_rules) = tables.drug_risk_rules(&drug) else {
        log::warn!("No risk rules configured for {}", drug);
        return RiskBlock::unknown(None);
    };

    let primary = drug_rules
        .iter()
        .find_map(|(gene, rules)| profile.get(gene).map(|p| (gene, rules, p)));

    let (primary_gene, rule, gene_confidence) = match primary {
        Some((gene, rules, gene_profile)) => {
            let Some(phenotype) = gene_profile.phenotype else {
                return RiskBlock::unknown(Some(gene.to_string()));
            };
            (
                Some(gene.to_string()),
                select_rule(rules, phenotype),
                gene_profile.confidence,
            )
        }
        None => (None, RiskRule::unknown(), config.default_gene_confidence),
    };

    let confidence_score = round2((rule.confidence + gene_confidence) / 2.0);

    RiskBlock {
        primary_gene,
        risk_label: rule.risk_label,
        severity: rule.severity,
        confidence_score,
    }
}

fn select_rule(rules: &PhenotypeRiskRules, phenotype: Phenotype) -> RiskRule {
    if let Some(rule) = rules.get(phenotype.as_str()) {
        return rule.clone();
    }

    let fallback_key = match phenotype {
        Phenotype::NM => Some(NORMAL_FUNCTION_KEY),
        p if p.is_reduced_function() => Some(LOW_FUNCTION_KEY),
        _ => None,
    };

    fallback_key
        .and_then(|key| rules.get(key))
        .cloned()
        .unwrap_or_else(RiskRule::unknown)
}
