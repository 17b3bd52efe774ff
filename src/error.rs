use std::path::PathBuf;

/// Failures while loading the rule tables. Any of these leaves the engine
/// unable to serve an analysis.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RuleTableError {
    #[error("Rule table '{table}' not found at {path}")]
    Missing { table: &'static str, path: PathBuf },

    #[error("Failed to read rule table '{table}': {source}")]
    Io {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rule table '{table}': {source}")]
    Json {
        table: &'static str,
        #[source]
        source: serde_json_lenient::Error,
    },

    #[error("Invalid entry in rule table '{table}': {message}")]
    InvalidEntry { table: &'static str, message: String },

    #[error("Diplotype table defines no tracked genes")]
    NoTrackedGenes,
}

/// Contract violations surfaced to the caller. Data-quality gaps never end up here.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    #[error("Profile is missing tracked gene {0}")]
    MissingGeneProfile(String),

    #[error("Unsupported drug: {0}")]
    UnsupportedDrug(String),

    #[error("No valid drug provided")]
    NoDrugs,
}
