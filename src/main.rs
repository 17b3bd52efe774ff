use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pgx_engine::*;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "pgx-engine")]
#[command(version)]
#[command(about = "Pharmacogenomic profile inference and drug risk assessment", long_about = None)]
struct Args {
    /// Input variant JSON (or JSON.gz) file path
    #[arg(short, long)]
    input: String,

    /// Drug name(s), comma-separated
    #[arg(short, long)]
    drug: String,

    /// Directory with rule tables (defaults to the bundled tables)
    #[arg(short, long)]
    rules_dir: Option<String>,

    /// Patient identifier (defaults to a random UUID)
    #[arg(short, long)]
    patient_id: Option<String>,

    /// Output JSON file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Tab-separated summary output path
    #[arg(long)]
    summary: Option<String>,

    /// Reject drugs outside the supported list
    #[arg(long)]
    strict: bool,

    /// Do not clamp gene confidence to [0, 1]
    #[arg(long)]
    no_clamp_confidence: bool,

    /// Verbose output mode
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (no progress display)
    #[arg(short, long)]
    quiet: bool,

    /// Number of threads (defaults to number of CPU cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

/// JSON document written for one run.
#[derive(Serialize)]
struct AnalysisReport<'a> {
    patient_id: &'a str,
    generated_at: DateTime<Utc>,
    results: &'a [AnalysisResult],
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    // Set thread pool size
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let num_threads = rayon::current_num_threads();

    let config = EngineConfig {
        clamp_confidence: !args.no_clamp_confidence,
        ..EngineConfig::default()
    };
    config.validate()?;

    if !Path::new(&args.input).exists() {
        anyhow::bail!("Input file does not exist: {}", args.input);
    }

    let drugs = parse_drug_list(&args.drug, args.strict)?;

    let tables = match &args.rules_dir {
        Some(dir) => RuleTables::load_dir(Path::new(dir)),
        None => RuleTables::bundled(),
    }
    .context("Failed to load rule tables")?;

    let patient_id = args
        .patient_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if args.verbose {
        println!("\nStarting analysis: {}", args.input);
        println!("Patient ID: {}", patient_id);
        println!("Drugs: {}", drugs.join(", "));
        println!("Number of threads: {}", num_threads);
        display_config(&config, &tables);
    }

    let analyzer = PgxAnalyzer::new(tables, config);
    let results = run_analysis(&analyzer, &args.input, &patient_id, &drugs, args.verbose, args.quiet)?;

    let report = AnalysisReport {
        patient_id: &patient_id,
        generated_at: Utc::now(),
        results: &results,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize results")?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write output file: {}", path))?;
            if args.verbose {
                println!("  ✓ Wrote {} results to {}", results.len(), path);
            }
        }
        None => println!("{}", json),
    }

    if let Some(path) = &args.summary {
        let written = write_summary(&results, path)?;
        if args.verbose {
            println!("  ✓ Wrote {} summary rows to {}", written, path);
        }
    }

    if args.verbose {
        print_statistics(&summarize(&results), num_threads);
    }

    Ok(())
}

fn display_config(config: &EngineConfig, tables: &RuleTables) {
    println!("============================================================");
    println!("PGx Engine Configuration");
    println!("============================================================");
    println!();
    println!("Confidence ladder:");
    println!("  No allele evidence (base_confidence):              {}", config.base_confidence);
    println!("  rsID-inferred alleles:                             {}", config.allele_evidence_confidence);
    println!("  Directly reported star alleles:                    {}", config.direct_star_confidence);
    println!("  Activity score model penalty:                      {}", config.score_model_penalty);
    println!("  Clamp to [0, 1]:                                   {}", config.clamp_confidence);
    println!();
    println!("Defaults:");
    println!("  Wildtype activity score:                           {}", config.wildtype_activity_score);
    println!("  Gene confidence without primary gene:              {}", config.default_gene_confidence);
    println!();
    println!("Rule tables:");
    println!("  Tracked genes:                                     {}", tables.tracked_genes().join(", "));
    println!("  Configured drugs:                                  {}", tables.configured_drugs().join(", "));
    println!();
    println!("============================================================");
}

fn run_analysis(
    analyzer: &PgxAnalyzer,
    input_path: &str,
    patient_id: &str,
    drugs: &[String],
    verbose: bool,
    quiet: bool,
) -> Result<Vec<AnalysisResult>> {
    if verbose {
        println!("\n[1/3] Loading variants...");
    }

    let variants = load_variants(input_path)?;

    if verbose {
        println!("  ✓ Loaded {} variants", variants.len());
        println!("\n[2/3] Building pharmacogenomic profile...");
    }

    let profile = analyzer.profile(&variants)?;

    if verbose {
        for gene_profile in profile.values() {
            println!(
                "  {:<8} {:<12} {:<4} score {:<5} confidence {}",
                gene_profile.gene,
                gene_profile.diplotype,
                gene_profile.phenotype.map(|p| p.as_str()).unwrap_or("-"),
                gene_profile.activity_score,
                gene_profile.confidence
            );
        }
        println!("\n[3/3] Evaluating {} drugs in parallel...", drugs.len());
    }

    let progress = if !quiet {
        let pb = ProgressBar::new(drugs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let results: Vec<AnalysisResult> = drugs
        .par_iter()
        .map(|drug| {
            let result = analyzer.analyze_with_profile(patient_id, drug, &variants, &profile);
            if let Some(pb) = &progress {
                pb.inc(1);
            }
            result
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_with_message("Analysis complete");
    }

    Ok(results)
}

fn print_statistics(stats: &RunStats, num_threads: usize) {
    let report = format!(
        r#"
═══════════════════════════════════════════════════════════
                  Drug Risk Statistics Report
═══════════════════════════════════════════════════════════

Number of threads:      {}
Drugs evaluated:        {}

Risk labels:
  - Safe:               {}
  - Adjust Dosage:      {}
  - Toxic:              {}
  - Ineffective:        {}
  - Unknown:            {}

Quality:
  - Primary gene matched:      {}
  - Inconsistent diplotypes:   {}

═══════════════════════════════════════════════════════════
"#,
        num_threads,
        stats.drugs_evaluated,
        stats.safe,
        stats.adjust_dosage,
        stats.toxic,
        stats.ineffective,
        stats.unknown,
        stats.gene_matched,
        stats.inconsistent_diplotypes
    );

    println!("{}", report);
}
