use crate::types::{Phenotype, RiskLabel};

pub fn drug_interpretation(
    drug: &str,
    risk_label: RiskLabel,
    gene: Option<&str>,
    phenotype: Option<Phenotype>,
) -> String {
    let Some(gene) = gene else {
        return "No pharmacogenomic gene associations detected for this medication.".to_string();
    };

    let phenotype = phenotype.map(|p| p.as_str()).unwrap_or("Unknown");
    let base = format!(
        "{} response influenced by {} ({} phenotype). ",
        drug.to_uppercase(),
        gene,
        phenotype
    );

    let action = match risk_label {
        RiskLabel::Safe => {
            "Genetic findings do not suggest elevated pharmacogenomic risk. Standard therapy appropriate."
        }
        RiskLabel::AdjustDosage => {
            "Genetic variation may alter drug metabolism or response. Clinical monitoring or dose adjustment recommended."
        }
        RiskLabel::Toxic => {
            "Genetic profile indicates elevated toxicity risk. Alternative therapy or major dose modification advised."
        }
        RiskLabel::Ineffective => {
            "Genetic variation may reduce therapeutic efficacy. Consider alternative medication."
        }
        RiskLabel::Unknown => "Pharmacogenomic impact uncertain.",
    };

    base + action
}
