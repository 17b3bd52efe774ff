use crate::types::VariantRecord;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Top-level shapes accepted for a variant file.
#[derive(Deserialize)]
#[serde(untagged)]
enum VariantDocument {
    List(Vec<VariantRecord>),
    Wrapped { variants: Vec<VariantRecord> },
}

impl VariantDocument {
    fn into_variants(self) -> Vec<VariantRecord> {
        match self {
            VariantDocument::List(variants) => variants,
            VariantDocument::Wrapped { variants } => variants,
        }
    }
}

/// Loads a variant list from a JSON file, gunzipping `.gz` inputs.
pub fn load_variants(file_path: &str) -> Result<Vec<VariantRecord>> {
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open input file: {}", file_path))?;
    let reader = BufReader::new(file);

    let is_gzip = Path::new(file_path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    let variants = if is_gzip {
        log::info!("Reading gzip-compressed variants from {}", file_path);
        read_variants(MultiGzDecoder::new(reader))
    } else {
        log::info!("Reading variants from {}", file_path);
        read_variants(reader)
    }
    .with_context(|| format!("Failed to parse variants from {}", file_path))?;

    log::info!("Loaded {} variants", variants.len());

    Ok(variants)
}

/// Parses a variant list from any JSON reader.
pub fn read_variants<R: Read>(reader: R) -> Result<Vec<VariantRecord>> {
    let document: VariantDocument =
        serde_json::from_reader(reader).context("Invalid variant JSON")?;
    Ok(document.into_variants())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Genotype;

    #[test]
    fn test_read_variant_array() {
        let json = r#"[
            { "gene": "CYP2D6", "rsid": "rs3892097", "genotype": "C/T", "ref": "C" },
            { "gene": "TPMT", "rsid": "rs1142345", "genotype": ["A", "G"], "alt_count": 1 },
            { "gene": "CYP2C19", "genotype": "G|A", "star": "*2", "info": { "qual": 99 } }
        ]"#;

        let variants = read_variants(json.as_bytes()).unwrap();

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].genotype, Genotype::new("C", "T"));
        assert_eq!(variants[0].ref_allele.as_deref(), Some("C"));
        assert_eq!(variants[1].alt_count, Some(1));
        assert_eq!(variants[2].rsid, "Unknown");
        assert!(variants[2].genotype.phased);
        assert_eq!(variants[2].info["qual"], 99);
    }

    #[test]
    fn test_read_wrapped_document() {
        let json = r#"{ "variants": [ { "gene": "DPYD", "rsid": "rs3918290", "genotype": "C/T" } ] }"#;

        let variants = read_variants(json.as_bytes()).unwrap();

        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].gene, "DPYD");
    }

    #[test]
    fn test_malformed_genotype_is_tolerated() {
        let json = r#"[ { "gene": "CYP2C9", "rsid": "rs1057910", "genotype": "./A" } ]"#;

        let variants = read_variants(json.as_bytes()).unwrap();

        assert_eq!(variants[0].genotype, Genotype::new("?", "A"));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(read_variants("{ not json".as_bytes()).is_err());
        assert!(read_variants(r#"{ "records": [] }"#.as_bytes()).is_err());
    }
}
