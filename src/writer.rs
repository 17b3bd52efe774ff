use crate::types::AnalysisResult;
use anyhow::{Context, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::File;

/// One row of the tab-separated run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub patient_id: String,
    pub drug: String,
    pub primary_gene: String,
    pub diplotype: String,
    pub phenotype: String,
    pub activity_score: String,
    pub risk_label: String,
    pub severity: String,
    pub confidence_score: f64,
    pub gene_confidence: String,
    pub diplotype_consistent: bool,
    pub recommendation: String,
}

impl From<&AnalysisResult> for SummaryRecord {
    fn from(result: &AnalysisResult) -> Self {
        let profile = &result.pharmacogenomic_profile;
        let risk = &result.risk_assessment;

        Self {
            patient_id: result.patient_id.clone(),
            drug: result.drug.clone(),
            primary_gene: profile.primary_gene.clone().unwrap_or_default(),
            diplotype: profile.diplotype.clone().unwrap_or_default(),
            phenotype: profile
                .phenotype
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            activity_score: profile
                .activity_score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_default(),
            risk_label: risk.risk_label.to_string(),
            severity: risk.severity.to_string(),
            confidence_score: risk.confidence_score,
            gene_confidence: profile
                .gene_confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_default(),
            diplotype_consistent: result.quality_metrics.diplotype_consistent,
            recommendation: result.clinical_recommendation.text.clone(),
        }
    }
}

pub struct SummaryWriter {
    writer: Writer<File>,
    records_written: usize,
}

impl SummaryWriter {
    pub fn new(output_path: &str) -> Result<Self> {
        let file = File::create(output_path)
            .with_context(|| format!("Failed to create summary file: {}", output_path))?;

        // Header row comes from the SummaryRecord field names on first serialize
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    pub fn write_result(&mut self, result: &AnalysisResult) -> Result<()> {
        self.write_record(&SummaryRecord::from(result))
    }

    pub fn write_record(&mut self, record: &SummaryRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .context("Failed to write summary record")?;
        self.records_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")?;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

/// Writes every result as a summary row.
pub fn write_summary(results: &[AnalysisResult], output_path: &str) -> Result<usize> {
    let mut writer = SummaryWriter::new(output_path)?;
    for result in results {
        writer.write_result(result)?;
    }
    writer.flush()?;
    Ok(writer.records_written())
}
