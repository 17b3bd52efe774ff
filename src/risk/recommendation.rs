use crate::rules::RuleTables;
use crate::types::{Phenotype, Recommendation};

pub const NO_EVIDENCE_TEXT: &str = "No pharmacogenomic evidence detected to determine recommendation.";
pub const NO_MATCH_TEXT: &str =
    "No specific CPIC recommendation for this genotype/phenotype combination.";

/// When the gene has no block of its own and the drug has exactly one gene
/// block, that block is consulted instead.
pub fn get_clinical_recommendation(
    drug: &str,
    primary_gene: Option<&str>,
    phenotype: Option<Phenotype>,
    tables: &RuleTables,
) -> Recommendation {
    let drug = drug.trim().to_uppercase();

    let Some(gene_blocks) = tables.drug_recommendations(&drug) else {
        return Recommendation {
            text: NO_EVIDENCE_TEXT.to_string(),
        };
    };

    let block = match primary_gene.and_then(|gene| gene_blocks.get(gene)) {
        Some(block) => Some(block),
        None if gene_blocks.len() == 1 => gene_blocks.iter().next().map(|(_, block)| block),
        None => None,
    };

    let text = block
        .zip(phenotype)
        .and_then(|(block, phenotype)| block.get(phenotype.as_str()))
        .filter(|text| !text.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| NO_MATCH_TEXT.to_string());

    Recommendation { text }
}
