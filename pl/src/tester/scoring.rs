//! Heuristic output quality score
//!
//! Scale is 0.0..=10.0:
//!
//! | Component              | Points                          |
//! |------------------------|---------------------------------|
//! | non-blank output       | 5.0                             |
//! | >= 50 words            | +1.0                            |
//! | >= 200 words           | +0.5                            |
//! | expected substrings    | +3.0 x matched / expected       |
//! | list or heading marker | +0.5                            |

pub const MAX_SCORE: f64 = 10.0;

const BASE_SCORE: f64 = 5.0;
const EXPECTED_WEIGHT: f64 = 3.0;
const STRUCTURE_MARKERS: [&str; 4] = ["- ", "* ", "1.", "## "];

/// Expected substrings absent from `output`, compared case-insensitively
pub fn missing_keywords(output: &str, expected: &[String]) -> Vec<String> {
    let haystack = output.to_lowercase();
    expected
        .iter()
        .filter(|kw| !haystack.contains(&kw.to_lowercase()))
        .cloned()
        .collect()
}

/// Score `output` given the expected substrings and those found missing
pub fn score_quality(output: &str, expected: &[String], missing: &[String]) -> f64 {
    if output.trim().is_empty() {
        return 0.0;
    }

    let mut score = BASE_SCORE;

    let words = output.split_whitespace().count();
    if words >= 50 {
        score += 1.0;
    }
    if words >= 200 {
        score += 0.5;
    }

    if !expected.is_empty() {
        let matched = expected.len().saturating_sub(missing.len());
        score += EXPECTED_WEIGHT * matched as f64 / expected.len() as f64;
    }

    if STRUCTURE_MARKERS.iter().any(|m| output.contains(m)) {
        score += 0.5;
    }

    score.min(MAX_SCORE)
}
