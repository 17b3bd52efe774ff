use crate::inference::diplotype::WILDTYPE;
use crate::types::VariantRecord;
use std::collections::HashMap;

/// Checks that the detected variants carry enough copies of each non-wildtype
/// allele named in the diplotype. Run after star auto-fill.
///
/// Copies are counted the same way star inference counts them. `*1` is
/// implied by the absence of variants and never counted.
pub fn check_diplotype_consistency(diplotype: &str, detected: &[VariantRecord]) -> bool {
    let mut expected: HashMap<&str, u32> = HashMap::new();
    for allele in diplotype.split('/').map(str::trim) {
        if allele.is_empty() || allele == WILDTYPE {
            continue;
        }
        *expected.entry(allele).or_insert(0) += 1;
    }

    let mut observed: HashMap<&str, u32> = HashMap::new();
    for variant in detected {
        if let Some(star) = variant.reported_star() {
            *observed.entry(star).or_insert(0) += u32::from(variant.effective_alt_count());
        }
    }

    let consistent = expected
        .iter()
        .all(|(allele, count)| observed.get(allele).copied().unwrap_or(0) >= *count);

    if !consistent {
        log::warn!(
            "Diplotype {} is not fully supported by detected variants (expected {:?}, observed {:?})",
            diplotype,
            expected,
            observed
        );
    }

    consistent
}
