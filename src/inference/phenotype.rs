use crate::rules::RuleTables;
use crate::types::{Phenotype, TraceMethod};

#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeCall {
    pub phenotype: Phenotype,
    pub method: TraceMethod,
    pub rule: String,
}

pub fn classify_phenotype(
    gene: &str,
    diplotype: &str,
    activity_score: f64,
    tables: &RuleTables,
) -> PhenotypeCall {
    if let Some(phenotype) = tables.diplotype_phenotype(gene, diplotype) {
        return PhenotypeCall {
            phenotype,
            method: TraceMethod::DiplotypeLookup,
            rule: format!("{} → {} phenotype (CPIC diplotype mapping)", diplotype, phenotype),
        };
    }

    let (phenotype, rule) = phenotype_from_activity_score(gene, activity_score);
    log::debug!("{} {} not in diplotype table: {}", gene, diplotype, rule);

    PhenotypeCall {
        phenotype,
        method: TraceMethod::ActivityScoreModel,
        rule,
    }
}

pub fn phenotype_from_activity_score(gene: &str, activity_score: f64) -> (Phenotype, String) {
    let score = format_score(activity_score);

    let phenotype = match gene {
        "CYP2D6" => match activity_score {
            s if s <= 0.0 => Phenotype::PM,
            s if s <= 1.0 => Phenotype::IM,
            s if s <= 2.25 => Phenotype::NM,
            _ => Phenotype::UM,
        },
        "CYP2C19" => match activity_score {
            s if s <= 0.0 => Phenotype::PM,
            s if s <= 1.0 => Phenotype::IM,
            s if s <= 2.0 => Phenotype::NM,
            _ => Phenotype::UM,
        },
        "CYP2C9" | "TPMT" | "DPYD" => match activity_score {
            s if s <= 0.0 => Phenotype::PM,
            s if s < 2.0 => Phenotype::IM,
            _ => Phenotype::NM,
        },
        _ => {
            return (
                Phenotype::NM,
                format!("Activity Score = {} → Default phenotype applied", score),
            )
        }
    };

    (
        phenotype,
        format!("Activity Score = {} → {}", score, phenotype.full_name()),
    )
}

pub fn clinical_interpretation(gene: &str, phenotype: Option<Phenotype>, activity_score: f64) -> String {
    let Some(phenotype) = phenotype else {
        return "Insufficient genetic evidence to determine metabolic phenotype.".to_string();
    };

    let base = format!("{} phenotype predicted for {}. ", phenotype.full_name(), gene);

    let detail = if gene.starts_with("CYP") {
        Some(match phenotype {
            Phenotype::PM => {
                "Markedly reduced enzymatic activity expected. Drug metabolism may be significantly impaired."
            }
            Phenotype::IM => {
                "Reduced metabolic capacity observed. Altered drug exposure or response variability may occur."
            }
            Phenotype::NM => "Enzymatic activity within expected physiological range.",
            Phenotype::RM | Phenotype::UM => {
                "Increased metabolic activity possible. Reduced drug exposure or therapeutic failure may occur."
            }
        })
    } else if gene == "TPMT" || gene == "DPYD" {
        match phenotype {
            Phenotype::PM => {
                Some("Severely impaired drug detoxification capacity. High toxicity risk possible.")
            }
            Phenotype::IM => Some(
                "Partial reduction in enzymatic function. Dose adjustments may be clinically relevant.",
            ),
            Phenotype::NM => Some("Normal enzymatic function predicted."),
            Phenotype::RM | Phenotype::UM => None,
        }
    } else {
        None
    };

    match detail {
        Some(detail) => base + detail,
        None => format!(
            "{}Activity Score = {}, supporting phenotype classification.",
            base,
            format_score(activity_score)
        ),
    }
}

// At least one decimal: `2.0`, `2.25`
pub fn format_score(score: f64) -> String {
    let text = format!("{:.2}", score);
    match text.strip_suffix('0') {
        Some(trimmed) if !trimmed.ends_with('.') => trimmed.to_string(),
        _ => text,
    }
}
