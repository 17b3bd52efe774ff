use std::cmp::Ordering;
use std::collections::HashMap;

pub const WILDTYPE: &str = "*1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiplotypeCall {
    pub diplotype: String,
    pub alleles: [String; 2],
    pub wildtype_default: bool,
}

impl DiplotypeCall {
    fn from_pair(a: &str, b: &str) -> Self {
        let (first, second) = canonical_pair(a, b);
        Self {
            diplotype: format!("{}/{}", first, second),
            alleles: [first.to_string(), second.to_string()],
            wildtype_default: false,
        }
    }

    pub fn wildtype() -> Self {
        Self {
            wildtype_default: true,
            ..Self::from_pair(WILDTYPE, WILDTYPE)
        }
    }
}

pub fn call_diplotype(observed: &[String]) -> DiplotypeCall {
    let ranked = rank_alleles(observed);

    match ranked.as_slice() {
        [] => DiplotypeCall::wildtype(),
        [(allele, count)] if *count >= 2 => DiplotypeCall::from_pair(allele, allele),
        [(allele, _)] => DiplotypeCall::from_pair(WILDTYPE, allele),
        [(top, count), ..] if *count >= 2 => DiplotypeCall::from_pair(top, top),
        [(first, _), rest @ ..] => {
            let second = rest.first().map(|(a, _)| a.as_str()).unwrap_or(WILDTYPE);
            DiplotypeCall::from_pair(first, second)
        }
    }
}

// Most observed first; ties fall back to canonical allele order
fn rank_alleles(observed: &[String]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for allele in observed {
        *counts.entry(allele.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(allele, count)| (allele.to_string(), count))
        .collect();

    ranked.sort_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| compare_alleles(a, b)));
    ranked
}

/// Orders a pair canonically: `*1` first, then by numeric suffix, with
/// non-numeric labels last. Symmetric in its arguments.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if compare_alleles(a, b) == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    }
}

// Anything that is not exactly two labels is only trimmed
pub fn canonical_diplotype(diplotype: &str) -> String {
    let parts: Vec<&str> = diplotype.split('/').map(str::trim).collect();
    match parts.as_slice() {
        [a, b] => {
            let (first, second) = canonical_pair(a, b);
            format!("{}/{}", first, second)
        }
        _ => diplotype.trim().to_string(),
    }
}

fn compare_alleles(a: &str, b: &str) -> Ordering {
    allele_sort_key(a).cmp(&allele_sort_key(b))
}

fn allele_sort_key(allele: &str) -> (u8, u64, &str) {
    if allele == WILDTYPE {
        return (0, 0, allele);
    }

    match numeric_suffix(allele) {
        Some(number) => (1, number, allele),
        None => (2, 0, allele),
    }
}

// 3 for `*3A`
fn numeric_suffix(allele: &str) -> Option<u64> {
    let body = allele.trim_start_matches('*');
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
