use crate::rules::RuleTables;
use crate::types::VariantRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarSource {
    Reported,
    RsidInferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleObservation {
    pub gene: String,
    pub star: String,
    pub multiplicity: u8,
    pub source: StarSource,
}

// Unlabelled variants only count when their rsID maps to the same gene
pub fn observe_variant(variant: &VariantRecord, tables: &RuleTables) -> Option<AlleleObservation> {
    if !tables.is_tracked(&variant.gene) {
        return None;
    }

    let (star, source) = match variant.reported_star() {
        Some(star) => (star.to_string(), StarSource::Reported),
        None => {
            let mapping = tables.rsid_mapping(&variant.rsid)?;
            if !mapping.applies_to(&variant.gene) {
                log::debug!(
                    "{} maps to another gene, ignoring for {}",
                    variant.rsid,
                    variant.gene
                );
                return None;
            }
            (mapping.allele().to_string(), StarSource::RsidInferred)
        }
    };

    Some(AlleleObservation {
        gene: variant.gene.clone(),
        star,
        multiplicity: variant.effective_alt_count(),
        source,
    })
}

pub fn collect_observations(
    variants: &[VariantRecord],
    tables: &RuleTables,
) -> HashMap<String, Vec<AlleleObservation>> {
    let mut by_gene: HashMap<String, Vec<AlleleObservation>> = tables
        .tracked_genes()
        .iter()
        .map(|gene| (gene.clone(), Vec::new()))
        .collect();

    for observation in variants.iter().filter_map(|v| observe_variant(v, tables)) {
        by_gene
            .entry(observation.gene.clone())
            .or_default()
            .push(observation);
    }

    by_gene
}

pub fn expand_observations(observations: &[AlleleObservation]) -> Vec<String> {
    observations
        .iter()
        .flat_map(|o| std::iter::repeat(o.star.clone()).take(o.multiplicity as usize))
        .collect()
}

pub fn infer_star_alleles(
    variants: &[VariantRecord],
    tables: &RuleTables,
) -> HashMap<String, Vec<String>> {
    collect_observations(variants, tables)
        .into_iter()
        .map(|(gene, observations)| (gene, expand_observations(&observations)))
        .collect()
}

/// Writes rsID-inferred star labels onto unlabelled variants.
///
/// Only `star` is touched. Callers must pass a request-local copy of the
/// variant list. Returns the number of records filled.
pub fn autofill_star_alleles(variants: &mut [VariantRecord], tables: &RuleTables) -> usize {
    let mut filled = 0;

    for variant in variants.iter_mut() {
        if variant.reported_star().is_some() || !tables.is_tracked(&variant.gene) {
            continue;
        }

        if let Some(mapping) = tables.rsid_mapping(&variant.rsid) {
            if mapping.applies_to(&variant.gene) {
                variant.star = Some(mapping.allele().to_string());
                filled += 1;
            }
        }
    }

    filled
}
