use crate::error::RuleTableError;
use crate::inference::diplotype::canonical_diplotype;
use crate::types::{FunctionClass, Phenotype, RiskRule};
use flate2::read::MultiGzDecoder;
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

pub const ALLELE_FUNCTION_TABLE: &str = "allele_function";
pub const DIPLOTYPE_TABLE: &str = "diplotype_map";
pub const RSID_STAR_TABLE: &str = "rsid_star_map";
pub const RISK_RULES_TABLE: &str = "risk_rules";
pub const RECOMMENDATION_TABLE: &str = "cpic_rules";

// ============================================================================
// Ordered Map
// ============================================================================

/// JSON object kept in document order. Table order is significant for the
/// tracked gene list and for primary-gene selection.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_entries(self) -> Vec<(String, V)> {
        self.0
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

// ============================================================================
// rsID Mapping
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsidMapping {
    // Applies to whichever tracked gene reports the rsID
    LabelOnly(String),
    LabelWithGene { gene: String, allele: String },
}

impl RsidMapping {
    pub fn allele(&self) -> &str {
        match self {
            RsidMapping::LabelOnly(allele) => allele,
            RsidMapping::LabelWithGene { allele, .. } => allele,
        }
    }

    pub fn applies_to(&self, gene: &str) -> bool {
        match self {
            RsidMapping::LabelOnly(_) => true,
            RsidMapping::LabelWithGene { gene: mapped, .. } => mapped == gene,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRsidEntry {
    Label(String),
    Record {
        #[serde(default)]
        gene: Option<String>,
        allele: String,
    },
}

impl RawRsidEntry {
    fn normalize(self, rsid: &str) -> Result<RsidMapping, RuleTableError> {
        let (gene, allele) = match self {
            RawRsidEntry::Label(allele) => (None, allele),
            RawRsidEntry::Record { gene, allele } => (gene, allele),
        };

        let allele = allele.trim().to_string();
        if allele.is_empty() {
            return Err(RuleTableError::InvalidEntry {
                table: RSID_STAR_TABLE,
                message: format!("{} maps to an empty allele label", rsid),
            });
        }

        Ok(match gene.map(|g| g.trim().to_string()).filter(|g| !g.is_empty()) {
            Some(gene) => RsidMapping::LabelWithGene { gene, allele },
            None => RsidMapping::LabelOnly(allele),
        })
    }
}

// ============================================================================
// Rule Tables
// ============================================================================

pub type PhenotypeRiskRules = HashMap<String, RiskRule>;

pub type RecommendationTexts = HashMap<String, String>;

#[derive(Debug, Clone, Copy)]
pub struct RuleSources<'a> {
    pub allele_function: &'a str,
    pub diplotype_map: &'a str,
    pub rsid_star_map: &'a str,
    pub risk_rules: &'a str,
    pub recommendations: &'a str,
}

impl RuleSources<'static> {
    pub fn bundled() -> Self {
        Self {
            allele_function: include_str!("../rules/allele_function.json"),
            diplotype_map: include_str!("../rules/diplotype_map.json"),
            rsid_star_map: include_str!("../rules/rsid_star_map.json"),
            risk_rules: include_str!("../rules/risk_rules.json"),
            recommendations: include_str!("../rules/cpic_rules.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleTables {
    tracked_genes: Vec<String>,
    allele_function: HashMap<String, HashMap<String, FunctionClass>>,
    diplotype_map: HashMap<String, HashMap<String, Phenotype>>,
    rsid_star_map: HashMap<String, RsidMapping>,
    risk_rules: HashMap<String, OrderedMap<PhenotypeRiskRules>>,
    recommendations: HashMap<String, OrderedMap<RecommendationTexts>>,
}

impl RuleTables {
    pub fn bundled() -> Result<Self, RuleTableError> {
        Self::from_sources(&RuleSources::bundled())
    }

    // `<name>.json` or `<name>.json.gz` per table
    pub fn load_dir(dir: &Path) -> Result<Self, RuleTableError> {
        log::info!("Loading rule tables from {}", dir.display());

        let allele_function = read_table(dir, ALLELE_FUNCTION_TABLE)?;
        let diplotype_map = read_table(dir, DIPLOTYPE_TABLE)?;
        let rsid_star_map = read_table(dir, RSID_STAR_TABLE)?;
        let risk_rules = read_table(dir, RISK_RULES_TABLE)?;
        let recommendations = read_table(dir, RECOMMENDATION_TABLE)?;

        Self::from_sources(&RuleSources {
            allele_function: &allele_function,
            diplotype_map: &diplotype_map,
            rsid_star_map: &rsid_star_map,
            risk_rules: &risk_rules,
            recommendations: &recommendations,
        })
    }

    pub fn from_sources(sources: &RuleSources<'_>) -> Result<Self, RuleTableError> {
        let raw_diplotypes: OrderedMap<HashMap<String, String>> =
            parse_table(DIPLOTYPE_TABLE, sources.diplotype_map)?;
        let raw_functions: HashMap<String, HashMap<String, FunctionClass>> =
            parse_table(ALLELE_FUNCTION_TABLE, sources.allele_function)?;
        let raw_rsids: HashMap<String, RawRsidEntry> =
            parse_table(RSID_STAR_TABLE, sources.rsid_star_map)?;
        let raw_risk: HashMap<String, OrderedMap<PhenotypeRiskRules>> =
            parse_table(RISK_RULES_TABLE, sources.risk_rules)?;
        let raw_recommendations: HashMap<String, OrderedMap<RecommendationTexts>> =
            parse_table(RECOMMENDATION_TABLE, sources.recommendations)?;

        if raw_diplotypes.is_empty() {
            return Err(RuleTableError::NoTrackedGenes);
        }

        let mut tracked_genes = Vec::with_capacity(raw_diplotypes.len());
        let mut diplotype_map = HashMap::new();
        for (gene, entries) in raw_diplotypes.into_entries() {
            // Unknown phenotypes are left to the activity score model
            let canonical: HashMap<String, Phenotype> = entries
                .into_iter()
                .filter_map(|(diplotype, label)| match Phenotype::from_label(&label) {
                    Some(phenotype) => Some((canonical_diplotype(&diplotype), phenotype)),
                    None => {
                        log::warn!(
                            "Skipping {} {}: unrecognized phenotype '{}'",
                            gene,
                            diplotype,
                            label
                        );
                        None
                    }
                })
                .collect();
            tracked_genes.push(gene.clone());
            diplotype_map.insert(gene, canonical);
        }

        for gene in &tracked_genes {
            if !raw_functions.contains_key(gene) {
                log::warn!("No allele function entries for tracked gene {}", gene);
            }
        }

        let rsid_star_map = raw_rsids
            .into_iter()
            .map(|(rsid, entry)| {
                let mapping = entry.normalize(&rsid)?;
                Ok((rsid, mapping))
            })
            .collect::<Result<HashMap<_, _>, RuleTableError>>()?;

        let risk_rules = raw_risk
            .into_iter()
            .map(|(drug, genes)| (normalize_drug_key(&drug), genes))
            .collect();

        let recommendations = raw_recommendations
            .into_iter()
            .map(|(drug, genes)| (normalize_drug_key(&drug), genes))
            .collect();

        let tables = Self {
            tracked_genes,
            allele_function: raw_functions,
            diplotype_map,
            rsid_star_map,
            risk_rules,
            recommendations,
        };

        log::info!(
            "Loaded rule tables: {} tracked genes, {} rsIDs, {} drugs",
            tables.tracked_genes.len(),
            tables.rsid_star_map.len(),
            tables.risk_rules.len()
        );

        Ok(tables)
    }

    pub fn tracked_genes(&self) -> &[String] {
        &self.tracked_genes
    }

    pub fn is_tracked(&self, gene: &str) -> bool {
        self.tracked_genes.iter().any(|g| g == gene)
    }

    pub fn allele_functions(&self, gene: &str) -> Option<&HashMap<String, FunctionClass>> {
        self.allele_function.get(gene)
    }

    pub fn diplotype_phenotype(&self, gene: &str, diplotype: &str) -> Option<Phenotype> {
        self.diplotype_map
            .get(gene)
            .and_then(|entries| entries.get(diplotype))
            .copied()
    }

    pub fn rsid_mapping(&self, rsid: &str) -> Option<&RsidMapping> {
        self.rsid_star_map.get(rsid)
    }

    pub fn drug_risk_rules(&self, drug: &str) -> Option<&OrderedMap<PhenotypeRiskRules>> {
        self.risk_rules.get(drug)
    }

    pub fn drug_recommendations(&self, drug: &str) -> Option<&OrderedMap<RecommendationTexts>> {
        self.recommendations.get(drug)
    }

    pub fn configured_drugs(&self) -> Vec<&str> {
        let mut drugs: Vec<&str> = self.risk_rules.keys().map(String::as_str).collect();
        drugs.sort_unstable();
        drugs
    }
}

fn normalize_drug_key(drug: &str) -> String {
    drug.trim().to_uppercase()
}

fn read_table(dir: &Path, table: &'static str) -> Result<String, RuleTableError> {
    let plain = dir.join(format!("{}.json", table));
    let gzipped = dir.join(format!("{}.json.gz", table));

    let io_err = |source| RuleTableError::Io { table, source };

    if plain.exists() {
        return std::fs::read_to_string(&plain).map_err(io_err);
    }

    if gzipped.exists() {
        let file = File::open(&gzipped).map_err(io_err)?;
        let mut decoder = MultiGzDecoder::new(BufReader::new(file));
        let mut text = String::new();
        decoder.read_to_string(&mut text).map_err(io_err)?;
        return Ok(text);
    }

    Err(RuleTableError::Missing { table, path: plain })
}

// Comments and trailing commas are accepted
fn parse_table<T: DeserializeOwned>(table: &'static str, text: &str) -> Result<T, RuleTableError> {
    let json_err = |source| RuleTableError::Json { table, source };

    let mut deserializer = serde_json_lenient::Deserializer::from_str(text);
    deserializer.set_ignore_trailing_commas(true);
    deserializer.set_allow_comments(true);

    let value = T::deserialize(&mut deserializer).map_err(json_err)?;
    deserializer.end().map_err(json_err)?;
    Ok(value)
}
