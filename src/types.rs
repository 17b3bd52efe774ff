use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Engine Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Confidence ladder
    pub base_confidence: f64,
    pub allele_evidence_confidence: f64,
    pub direct_star_confidence: f64,
    pub score_model_penalty: f64,
    pub clamp_confidence: bool,

    // Wildtype assumption
    pub wildtype_activity_score: f64,

    // Risk merge
    pub default_gene_confidence: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.65,
            allele_evidence_confidence: 0.85,
            direct_star_confidence: 0.95,
            score_model_penalty: 0.10,
            clamp_confidence: true,
            wildtype_activity_score: 2.0,
            default_gene_confidence: 0.5,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let unit_fields = [
            ("base_confidence", self.base_confidence),
            ("allele_evidence_confidence", self.allele_evidence_confidence),
            ("direct_star_confidence", self.direct_star_confidence),
            ("score_model_penalty", self.score_model_penalty),
            ("default_gene_confidence", self.default_gene_confidence),
        ];

        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be between 0 and 1, got {}", name, value);
            }
        }

        if self.base_confidence > self.allele_evidence_confidence
            || self.allele_evidence_confidence > self.direct_star_confidence
        {
            anyhow::bail!(
                "confidence ladder must be non-decreasing, got {} / {} / {}",
                self.base_confidence,
                self.allele_evidence_confidence,
                self.direct_star_confidence
            );
        }

        if self.wildtype_activity_score < 0.0 {
            anyhow::bail!(
                "wildtype_activity_score must be non-negative, got {}",
                self.wildtype_activity_score
            );
        }

        Ok(())
    }
}

// ============================================================================
// Variant Records
// ============================================================================

pub const MISSING_ALLELE: &str = "?";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GenotypeRepr", into = "String")]
pub struct Genotype {
    pub first: String,
    pub second: String,
    pub phased: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenotypeRepr {
    Text(String),
    Pair(Vec<String>),
}

impl From<GenotypeRepr> for Genotype {
    fn from(repr: GenotypeRepr) -> Self {
        match repr {
            GenotypeRepr::Text(text) => Genotype::parse(&text),
            GenotypeRepr::Pair(slots) => {
                let mut slots = slots.into_iter().map(|s| normalize_slot(&s));
                let first = slots.next().unwrap_or_else(|| MISSING_ALLELE.to_string());
                let second = slots.next().unwrap_or_else(|| MISSING_ALLELE.to_string());
                Genotype {
                    first,
                    second,
                    phased: false,
                }
            }
        }
    }
}

impl From<Genotype> for String {
    fn from(genotype: Genotype) -> Self {
        genotype.to_string()
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.phased { '|' } else { '/' };
        write!(f, "{}{}{}", self.first, sep, self.second)
    }
}

fn normalize_slot(slot: &str) -> String {
    let slot = slot.trim();
    if slot.is_empty() || slot == "." {
        MISSING_ALLELE.to_string()
    } else {
        slot.to_uppercase()
    }
}

impl Genotype {
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: normalize_slot(first),
            second: normalize_slot(second),
            phased: false,
        }
    }

    pub fn parse(text: &str) -> Self {
        let phased = text.contains('|');
        let sep = if phased { '|' } else { '/' };

        let mut tokens = text.split(sep);
        let first = tokens.next().map(normalize_slot);
        let second = tokens.next().map(normalize_slot);

        Self {
            first: first.unwrap_or_else(|| MISSING_ALLELE.to_string()),
            second: second.unwrap_or_else(|| MISSING_ALLELE.to_string()),
            phased,
        }
    }

    // Without a reference allele the slots cannot tell ref from alt
    pub fn non_reference_count(&self, reference: Option<&str>) -> Option<u8> {
        let reference = reference?.trim().to_uppercase();

        let is_alt = |slot: &str| slot != MISSING_ALLELE && slot != reference;
        let first_alt = is_alt(&self.first);
        let second_alt = is_alt(&self.second);

        let count = match (first_alt, second_alt) {
            (true, true) if self.first == self.second => 2,
            // Two different alternate alleles; only one can carry the labelled star
            (true, true) => 1,
            (true, false) | (false, true) => 1,
            (false, false) => 0,
        };

        Some(count)
    }
}

fn default_rsid() -> String {
    "Unknown".to_string()
}

fn default_genotype() -> Genotype {
    Genotype::new(MISSING_ALLELE, MISSING_ALLELE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub gene: String,
    #[serde(default = "default_rsid")]
    pub rsid: String,
    #[serde(default = "default_genotype")]
    pub genotype: Genotype,
    #[serde(default)]
    pub star: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_count: Option<u8>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_allele: Option<String>,
    #[serde(default)]
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl VariantRecord {
    pub fn new(gene: &str, rsid: &str, genotype: Genotype) -> Self {
        Self {
            gene: gene.to_string(),
            rsid: rsid.to_string(),
            genotype,
            star: None,
            alt_count: None,
            ref_allele: None,
            info: serde_json::Map::new(),
        }
    }

    pub fn with_star(mut self, star: &str) -> Self {
        self.star = Some(star.to_string());
        self
    }

    pub fn with_alt_count(mut self, alt_count: u8) -> Self {
        self.alt_count = Some(alt_count);
        self
    }

    pub fn with_ref(mut self, reference: &str) -> Self {
        self.ref_allele = Some(reference.to_string());
        self
    }

    pub fn reported_star(&self) -> Option<&str> {
        self.star.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Copies of the non-reference allele: the reported count, else the count
    /// read off the genotype, else one. Star inference and the consistency
    /// check both count through here.
    pub fn effective_alt_count(&self) -> u8 {
        if let Some(count) = self.alt_count {
            return count.min(2);
        }

        self.genotype
            .non_reference_count(self.ref_allele.as_deref())
            .unwrap_or(1)
    }
}

// ============================================================================
// Allele Function and Phenotype
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FunctionClass {
    NoFunction,
    Decreased,
    Normal,
    Increased,
    Other(String),
}

impl From<String> for FunctionClass {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "no_function" => FunctionClass::NoFunction,
            "decreased" | "decreased_function" => FunctionClass::Decreased,
            "normal" | "normal_function" => FunctionClass::Normal,
            "increased" | "increased_function" => FunctionClass::Increased,
            _ => FunctionClass::Other(value),
        }
    }
}

impl From<FunctionClass> for String {
    fn from(class: FunctionClass) -> Self {
        class.as_str().to_string()
    }
}

impl FunctionClass {
    pub fn as_str(&self) -> &str {
        match self {
            FunctionClass::NoFunction => "no_function",
            FunctionClass::Decreased => "decreased",
            FunctionClass::Normal => "normal",
            FunctionClass::Increased => "increased",
            FunctionClass::Other(label) => label,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            FunctionClass::NoFunction => 0.0,
            FunctionClass::Decreased => 0.5,
            FunctionClass::Normal => 1.0,
            FunctionClass::Increased => 1.5,
            // Unrecognized classes count as normal
            FunctionClass::Other(_) => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phenotype {
    PM,
    IM,
    NM,
    RM,
    UM,
}

impl Phenotype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phenotype::PM => "PM",
            Phenotype::IM => "IM",
            Phenotype::NM => "NM",
            Phenotype::RM => "RM",
            Phenotype::UM => "UM",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            Phenotype::PM => "Poor Metabolizer",
            Phenotype::IM => "Intermediate Metabolizer",
            Phenotype::NM => "Normal Metabolizer",
            Phenotype::RM => "Rapid Metabolizer",
            Phenotype::UM => "Ultrarapid Metabolizer",
        }
    }

    pub fn is_reduced_function(&self) -> bool {
        matches!(self, Phenotype::PM | Phenotype::IM)
    }

    // Accepts the short code or the full name, in any case
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['_', '-'], " ");
        let phenotype = match normalized.as_str() {
            "pm" | "poor metabolizer" => Phenotype::PM,
            "im" | "intermediate metabolizer" => Phenotype::IM,
            "nm" | "normal metabolizer" => Phenotype::NM,
            "rm" | "rapid metabolizer" => Phenotype::RM,
            "um" | "ultrarapid metabolizer" => Phenotype::UM,
            _ => return None,
        };
        Some(phenotype)
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Gene Profile and Decision Trace
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceMethod {
    #[serde(rename = "Wildtype Default")]
    WildtypeDefault,
    #[serde(rename = "Diplotype Lookup Table")]
    DiplotypeLookup,
    #[serde(rename = "Activity Score Model")]
    ActivityScoreModel,
}

impl TraceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceMethod::WildtypeDefault => "Wildtype Default",
            TraceMethod::DiplotypeLookup => "Diplotype Lookup Table",
            TraceMethod::ActivityScoreModel => "Activity Score Model",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionSource {
    ExactLabel,
    StrippedLabel,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlleleTrace {
    pub allele: String,
    pub function: FunctionClass,
    pub score: f64,
    pub resolved_by: FunctionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub method: TraceMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub observed_alleles: Vec<String>,
    pub alleles: Vec<String>,
    pub allele_details: Vec<AlleleTrace>,
    pub activity_score: f64,
    pub phenotype_rule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneProfile {
    pub gene: String,
    pub diplotype: String,
    pub phenotype: Option<Phenotype>,
    pub activity_score: f64,
    pub decision_trace: DecisionTrace,
    pub clinical_interpretation: String,
    pub confidence: f64,
}

pub type PgxProfile = BTreeMap<String, GeneProfile>;

// ============================================================================
// Drug Risk
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum RiskLabel {
    Safe,
    #[serde(rename = "Adjust Dosage")]
    AdjustDosage,
    Toxic,
    Ineffective,
    #[default]
    Unknown,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Safe => "Safe",
            RiskLabel::AdjustDosage => "Adjust Dosage",
            RiskLabel::Toxic => "Toxic",
            RiskLabel::Ineffective => "Ineffective",
            RiskLabel::Unknown => "Unknown",
        }
    }
}

impl From<String> for RiskLabel {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "safe" => RiskLabel::Safe,
            "adjust dosage" => RiskLabel::AdjustDosage,
            "toxic" => RiskLabel::Toxic,
            "ineffective" => RiskLabel::Ineffective,
            "unknown" => RiskLabel::Unknown,
            _ => {
                log::warn!("Unrecognized risk label '{}', using Unknown", value);
                RiskLabel::Unknown
            }
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Critical,
    #[default]
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "none" => Severity::None,
            "low" => Severity::Low,
            "moderate" => Severity::Moderate,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            "unknown" => Severity::Unknown,
            _ => {
                log::warn!("Unrecognized severity '{}', using unknown", value);
                Severity::Unknown
            }
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskRule {
    #[serde(default)]
    pub risk_label: RiskLabel,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub confidence: f64,
}

impl RiskRule {
    pub fn unknown() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_label: RiskLabel,
    pub confidence_score: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBlock {
    pub primary_gene: Option<String>,
    pub risk_label: RiskLabel,
    pub severity: Severity,
    pub confidence_score: f64,
}

impl RiskBlock {
    pub fn unknown(primary_gene: Option<String>) -> Self {
        Self {
            primary_gene,
            risk_label: RiskLabel::Unknown,
            severity: Severity::Unknown,
            confidence_score: 0.0,
        }
    }

    pub fn assessment(&self) -> RiskAssessment {
        RiskAssessment {
            risk_label: self.risk_label,
            confidence_score: self.confidence_score,
            severity: self.severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub text: String,
}

// ============================================================================
// Analysis Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub primary_gene: Option<String>,
    pub diplotype: Option<String>,
    pub phenotype: Option<Phenotype>,
    pub activity_score: Option<f64>,
    pub decision_trace: Option<DecisionTrace>,
    pub clinical_interpretation: Option<String>,
    pub gene_confidence: Option<f64>,
    pub detected_variants: Vec<VariantRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub summary: String,
    pub mechanism: Option<String>,
    pub evidence: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub vcf_parsing_success: bool,
    pub variant_count: usize,
    pub gene_match_success: bool,
    pub diplotype_consistent: bool,
    pub narrative_success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub patient_id: String,
    pub drug: String,
    pub risk_assessment: RiskAssessment,
    pub pharmacogenomic_profile: ProfileSummary,
    pub drug_level_interpretation: String,
    pub clinical_recommendation: Recommendation,
    pub narrative: Narrative,
    pub quality_metrics: QualityMetrics,
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub drugs_evaluated: usize,
    pub safe: usize,
    pub adjust_dosage: usize,
    pub toxic: usize,
    pub ineffective: usize,
    pub unknown: usize,
    pub gene_matched: usize,
    pub inconsistent_diplotypes: usize,
}

impl RunStats {
    pub fn record(&mut self, result: &AnalysisResult) {
        self.drugs_evaluated += 1;
        match result.risk_assessment.risk_label {
            RiskLabel::Safe => self.safe += 1,
            RiskLabel::AdjustDosage => self.adjust_dosage += 1,
            RiskLabel::Toxic => self.toxic += 1,
            RiskLabel::Ineffective => self.ineffective += 1,
            RiskLabel::Unknown => self.unknown += 1,
        }
        if result.quality_metrics.gene_match_success {
            self.gene_matched += 1;
        }
        if !result.quality_metrics.diplotype_consistent {
            self.inconsistent_diplotypes += 1;
        }
    }

    pub fn merge(&mut self, other: &RunStats) {
        self.drugs_evaluated += other.drugs_evaluated;
        self.safe += other.safe;
        self.adjust_dosage += other.adjust_dosage;
        self.toxic += other.toxic;
        self.ineffective += other.ineffective;
        self.unknown += other.unknown;
        self.gene_matched += other.gene_matched;
        self.inconsistent_diplotypes += other.inconsistent_diplotypes;
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genotype_parse() {
        let gt = Genotype::parse("a/G");
        assert_eq!(gt.first, "A");
        assert_eq!(gt.second, "G");
        assert!(!gt.phased);

        let gt = Genotype::parse("T|T");
        assert!(gt.phased);
        assert_eq!(gt.to_string(), "T|T");

        let gt = Genotype::parse("./C");
        assert_eq!(gt.first, MISSING_ALLELE);

        let gt = Genotype::parse("C");
        assert_eq!(gt.second, MISSING_ALLELE);
    }

    #[test]
    fn test_genotype_deserialize_shapes() {
        let gt: Genotype = serde_json::from_str(r#""G/A""#).unwrap();
        assert_eq!(gt, Genotype::new("G", "A"));

        let gt: Genotype = serde_json::from_str(r#"["G", "A"]"#).unwrap();
        assert_eq!(gt, Genotype::new("G", "A"));

        assert_eq!(serde_json::to_string(&gt).unwrap(), r#""G/A""#);
    }

    #[test]
    fn test_non_reference_count() {
        assert_eq!(Genotype::new("A", "A").non_reference_count(Some("G")), Some(2));
        assert_eq!(Genotype::new("A", "G").non_reference_count(Some("G")), Some(1));
        assert_eq!(Genotype::new("G", "G").non_reference_count(Some("G")), Some(0));
        assert_eq!(Genotype::new("A", "T").non_reference_count(Some("G")), Some(1));
        assert_eq!(Genotype::new("?", "A").non_reference_count(Some("G")), Some(1));
        assert_eq!(Genotype::new("A", "A").non_reference_count(None), None);
    }

    #[test]
    fn test_effective_alt_count() {
        let variant = VariantRecord::new("CYP2D6", "rs3892097", Genotype::new("T", "T"));
        assert_eq!(variant.effective_alt_count(), 1);

        let variant = variant.with_ref("C");
        assert_eq!(variant.effective_alt_count(), 2);

        let variant = variant.with_alt_count(1);
        assert_eq!(variant.effective_alt_count(), 1);
    }

    #[test]
    fn test_function_class_weights() {
        assert_eq!(FunctionClass::from("no_function".to_string()).weight(), 0.0);
        assert_eq!(FunctionClass::from("Decreased Function".to_string()).weight(), 0.5);
        assert_eq!(FunctionClass::from("normal".to_string()).weight(), 1.0);
        assert_eq!(FunctionClass::from("increased".to_string()).weight(), 1.5);
        assert_eq!(FunctionClass::from("uncertain".to_string()).weight(), 1.0);
    }

    #[test]
    fn test_phenotype_from_label() {
        assert_eq!(Phenotype::from_label("PM"), Some(Phenotype::PM));
        assert_eq!(Phenotype::from_label(" um "), Some(Phenotype::UM));
        assert_eq!(Phenotype::from_label("Intermediate Metabolizer"), Some(Phenotype::IM));
        assert_eq!(Phenotype::from_label("Indeterminate"), None);
        assert_eq!(Phenotype::from_label("Fast"), None);
    }

    #[test]
    fn test_risk_rule_unknown_values_become_unknown() {
        let rule: RiskRule = serde_json::from_str(
            r#"{"risk_label": "Dangerous", "severity": "medium", "confidence": 0.8}"#,
        )
        .unwrap();
        assert_eq!(rule.risk_label, RiskLabel::Unknown);
        assert_eq!(rule.severity, Severity::Unknown);
        assert_eq!(rule.confidence, 0.8);

        let rule: RiskRule =
            serde_json::from_str(r#"{"risk_label": "Adjust Dosage", "severity": "HIGH"}"#).unwrap();
        assert_eq!(rule.risk_label, RiskLabel::AdjustDosage);
        assert_eq!(rule.severity, Severity::High);
        assert_eq!(
            serde_json::to_string(&rule.risk_label).unwrap(),
            r#""Adjust Dosage""#
        );
        assert_eq!(serde_json::to_string(&rule.severity).unwrap(), r#""high""#);
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let config = EngineConfig {
            direct_star_confidence: 0.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.7749), 0.77);
        assert_eq!(round2(1.5), 1.5);
    }
}
