use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pgx_engine::*;

const RSIDS: [(&str, &str); 8] = [
    ("CYP2D6", "rs3892097"),
    ("CYP2D6", "rs1065852"),
    ("CYP2C19", "rs4244285"),
    ("CYP2C19", "rs12248560"),
    ("CYP2C9", "rs1057910"),
    ("SLCO1B1", "rs4149056"),
    ("TPMT", "rs1142345"),
    ("DPYD", "rs3918290"),
];

fn generate_test_variants(n: usize) -> Vec<VariantRecord> {
    (0..n)
        .map(|i| {
            let (gene, rsid) = RSIDS[i % RSIDS.len()];
            let genotype = if i % 5 == 0 {
                Genotype::new("T", "T")
            } else {
                Genotype::new("C", "T")
            };
            VariantRecord::new(gene, rsid, genotype).with_ref("C")
        })
        .collect()
}

fn benchmark_profile(c: &mut Criterion) {
    let tables = RuleTables::bundled().unwrap();
    let config = EngineConfig::default();
    let mut group = c.benchmark_group("build_pharmacogenomic_profile");

    for n in [0, 10, 100, 1_000] {
        let variants = generate_test_variants(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &variants, |b, variants| {
            b.iter(|| build_pharmacogenomic_profile(black_box(variants), &tables, &config));
        });
    }

    group.finish();
}

fn benchmark_drugs(c: &mut Criterion) {
    let analyzer = PgxAnalyzer::new(RuleTables::bundled().unwrap(), EngineConfig::default());
    let variants = generate_test_variants(100);
    let drugs: Vec<String> = SUPPORTED_DRUGS.iter().map(|d| d.to_string()).collect();

    c.bench_function("analyze_supported_drugs", |b| {
        b.iter(|| analyzer.analyze_drugs("BENCH", black_box(&drugs), black_box(&variants)))
    });
}

criterion_group!(benches, benchmark_profile, benchmark_drugs);
criterion_main!(benches);
