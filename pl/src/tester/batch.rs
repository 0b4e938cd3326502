//! Aggregate report for a batch run

use serde::Serialize;

use super::TestResult;

/// A prompt that could not be tested at all
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub prompt_name: String,
    pub error: String,
}

/// Outcome of [`Tester::test_batch`](super::Tester::test_batch)
///
/// Averages cover completed results only; failures count towards `total`
/// and `failed`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<TestResult>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Percentage of prompts that passed, 0.0 for an empty batch
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passed() as f64 / total as f64 * 100.0,
        }
    }

    pub fn avg_quality(&self) -> f64 {
        average(self.results.iter().map(|r| r.quality_score))
    }

    pub fn avg_latency_ms(&self) -> f64 {
        average(self.results.iter().map(|r| r.latency_ms as f64))
    }

    pub fn total_cost(&self) -> f64 {
        self.results.iter().map(|r| r.estimated_cost).sum()
    }

    /// Human-readable summary, listing every failed prompt
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Test Results: {}/{} passed ({:.0}%)",
                self.passed(),
                self.total(),
                self.pass_rate()
            ),
            format!("Avg Quality: {:.1}/10", self.avg_quality()),
            format!("Avg Latency: {:.0}ms", self.avg_latency_ms()),
            format!("Est. Cost: ${:.6}", self.total_cost()),
        ];

        if self.failed() > 0 {
            lines.push(String::new());
            lines.push("Failed tests:".to_string());
            for r in self.results.iter().filter(|r| !r.passed) {
                let reason = if r.output.trim().is_empty() {
                    "empty output".to_string()
                } else {
                    format!("Missing keywords: {}", r.missing_keywords.join(", "))
                };
                lines.push(format!("  - {}: {}", r.prompt_name, reason));
            }
            for f in &self.failures {
                lines.push(format!("  - {}: {}", f.prompt_name, f.error));
            }
        }

        lines.join("\n")
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
