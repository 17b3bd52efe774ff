use crate::rules::RuleTables;
use crate::types::{round2, AlleleTrace, FunctionClass, FunctionSource};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionStrategy {
    ExactLabel,
    // `*4` looked up as `4`
    StrippedLabel,
}

/// Lookup order. An allele matching none of these is treated as normal function.
pub const FUNCTION_STRATEGIES: [FunctionStrategy; 2] =
    [FunctionStrategy::ExactLabel, FunctionStrategy::StrippedLabel];

impl FunctionStrategy {
    pub fn resolve(
        &self,
        table: &HashMap<String, FunctionClass>,
        allele: &str,
    ) -> Option<FunctionClass> {
        match self {
            FunctionStrategy::ExactLabel => table.get(allele).cloned(),
            FunctionStrategy::StrippedLabel => {
                let stripped = allele.trim_start_matches('*');
                if stripped == allele {
                    return None;
                }
                table.get(stripped).cloned()
            }
        }
    }

    pub fn source(&self) -> FunctionSource {
        match self {
            FunctionStrategy::ExactLabel => FunctionSource::ExactLabel,
            FunctionStrategy::StrippedLabel => FunctionSource::StrippedLabel,
        }
    }
}

pub fn resolve_function(
    table: Option<&HashMap<String, FunctionClass>>,
    allele: &str,
) -> (FunctionClass, FunctionSource) {
    table
        .and_then(|table| {
            FUNCTION_STRATEGIES
                .iter()
                .find_map(|strategy| strategy.resolve(table, allele).map(|f| (f, strategy.source())))
        })
        .unwrap_or((FunctionClass::Normal, FunctionSource::Default))
}

pub fn calculate_activity_score(
    gene: &str,
    alleles: &[String],
    tables: &RuleTables,
) -> (f64, Vec<AlleleTrace>) {
    let table = tables.allele_functions(gene);

    let details: Vec<AlleleTrace> = alleles
        .iter()
        .map(|allele| {
            let (function, resolved_by) = resolve_function(table, allele);
            if resolved_by == FunctionSource::Default {
                log::debug!("{} {} has no function entry, assuming normal", gene, allele);
            }
            AlleleTrace {
                allele: allele.clone(),
                score: function.weight(),
                function,
                resolved_by,
            }
        })
        .collect();

    let total: f64 = details.iter().map(|d| d.score).sum();

    (round2(total), details)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> HashMap<String, FunctionClass> {
        let mut table = HashMap::new();
        table.insert("*4".to_string(), FunctionClass::NoFunction);
        table.insert("10".to_string(), FunctionClass::Decreased);
        table.insert("*10".to_string(), FunctionClass::Normal);
        table.insert("2A".to_string(), FunctionClass::NoFunction);
        table
    }

    #[test]
    fn test_strategy_chain_order() {
        let table = create_test_table();

        // Exact label shadows the stripped entry
        assert_eq!(
            resolve_function(Some(&table), "*10"),
            (FunctionClass::Normal, FunctionSource::ExactLabel)
        );
        assert_eq!(
            resolve_function(Some(&table), "*2A"),
            (FunctionClass::NoFunction, FunctionSource::StrippedLabel)
        );
        assert_eq!(
            resolve_function(Some(&table), "*99"),
            (FunctionClass::Normal, FunctionSource::Default)
        );
        assert_eq!(
            resolve_function(None, "*4"),
            (FunctionClass::Normal, FunctionSource::Default)
        );
    }

    #[test]
    fn test_each_strategy_independently() {
        let table = create_test_table();

        assert_eq!(FunctionStrategy::ExactLabel.resolve(&table, "*2A"), None);
        assert_eq!(
            FunctionStrategy::StrippedLabel.resolve(&table, "*2A"),
            Some(FunctionClass::NoFunction)
        );
        assert_eq!(FunctionStrategy::StrippedLabel.resolve(&table, "HapB3"), None);
    }

    #[test]
    fn test_activity_score_with_trace() {
        let tables = RuleTables::bundled().unwrap();
        let alleles = vec!["*4".to_string(), "*4".to_string()];

        let (score, trace) = calculate_activity_score("CYP2D6", &alleles, &tables);

        assert_eq!(score, 0.0);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].function, FunctionClass::NoFunction);
        assert_eq!(trace[0].score, 0.0);
    }

    #[test]
    fn test_activity_score_mixed_functions() {
        let tables = RuleTables::bundled().unwrap();

        let alleles = vec!["*1".to_string(), "*17".to_string()];
        let (score, _) = calculate_activity_score("CYP2C19", &alleles, &tables);
        assert_eq!(score, 2.5);

        let alleles = vec!["*1".to_string(), "*2A".to_string()];
        let (score, trace) = calculate_activity_score("DPYD", &alleles, &tables);
        assert_eq!(score, 1.0);
        assert_eq!(trace[1].resolved_by, FunctionSource::StrippedLabel);
    }

    #[test]
    fn test_unknown_gene_defaults_to_normal() {
        let tables = RuleTables::bundled().unwrap();
        let alleles = vec!["*1".to_string(), "*7".to_string()];

        let (score, trace) = calculate_activity_score("NUDT15", &alleles, &tables);

        assert_eq!(score, 2.0);
        assert!(trace.iter().all(|t| t.resolved_by == FunctionSource::Default));
    }
}
