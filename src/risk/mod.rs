pub mod evaluator;
pub mod interpretation;
pub mod recommendation;

pub use evaluator::*;
pub use interpretation::*;
pub use recommendation::*;

use crate::error::EngineError;

pub const SUPPORTED_DRUGS: [&str; 6] = [
    "CODEINE",
    "WARFARIN",
    "CLOPIDOGREL",
    "SIMVASTATIN",
    "AZATHIOPRINE",
    "FLUOROURACIL",
];

const DRUG_CORRECTIONS: [(&str, &str); 1] = [("CODOINE", "CODEINE")];

pub fn canonical_drug_name(drug: &str) -> String {
    let drug = drug.trim().to_uppercase();
    DRUG_CORRECTIONS
        .iter()
        .find(|(typo, _)| *typo == drug)
        .map(|(_, fixed)| fixed.to_string())
        .unwrap_or(drug)
}

pub fn normalize_drug_name(drug: &str) -> Result<String, EngineError> {
    let drug = canonical_drug_name(drug);
    if SUPPORTED_DRUGS.contains(&drug.as_str()) {
        Ok(drug)
    } else {
        Err(EngineError::UnsupportedDrug(drug))
    }
}

// Without `strict`, unsupported names pass through and evaluate to Unknown
pub fn parse_drug_list(drugs: &str, strict: bool) -> Result<Vec<String>, EngineError> {
    let drugs = drugs
        .split(',')
        .filter(|d| !d.trim().is_empty())
        .map(|d| {
            if strict {
                normalize_drug_name(d)
            } else {
                Ok(canonical_drug_name(d))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if drugs.is_empty() {
        return Err(EngineError::NoDrugs);
    }

    Ok(drugs)
}
