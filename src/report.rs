// src/report.rs - console output + CSV export of BLEU results
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use crate::evaluation::CandidateReport;

/// Text block for one candidate: score, penalty, lengths, n-gram table.
pub fn render(report: &CandidateReport) -> String {
    let score = &report.score;
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "{} | BLEU: {:.4}", report.label, report.bleu);
    let _ = writeln!(out, "{}", "-".repeat(60));
    let _ = writeln!(out, "Translation:      {}", report.text);
    let _ = writeln!(out, "BLEU score:       {:.4}", report.bleu);
    let _ = writeln!(out, "Brevity penalty:  {:.4}", score.bp);
    let _ = writeln!(
        out,
        "Lengths:          candidate = {} | reference(s) = {:?}",
        score.candidate_len, score.reference_lens
    );
    let _ = writeln!(out, "N-gram precision table:");
    let _ = writeln!(
        out,
        "  {:<4} {:<12} {:<18} {:<14}",
        "n", "Precision", "Clipped matches", "Total n-grams"
    );
    for row in &score.ngram_table {
        let _ = writeln!(
            out,
            "  {:<4} {:<12.4} {:<18} {:<14}",
            row.n, row.precision, row.clipped, row.total
        );
    }
    out
}

pub fn print_report(report: &CandidateReport) {
    println!("\n{}", render(report));
}

/// Print every candidate, or a hint when there is nothing to show.
pub fn print_reports(reports: &[CandidateReport]) {
    if reports.is_empty() {
        println!("No candidates to evaluate. Provide a source text to translate, or add candidates.");
        return;
    }
    println!("\n{}", "=".repeat(60));
    println!("BLEU evaluation");
    println!("{}", "=".repeat(60));
    for report in reports {
        print_report(report);
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    label: &'a str,
    n: usize,
    precision: f64,
    clipped: usize,
    total: usize,
    bleu: f64,
    bp: f64,
}

/// One row per (candidate, n-gram order).
pub fn write_csv_to<W: io::Write>(writer: W, reports: &[CandidateReport]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for report in reports {
        for row in &report.score.ngram_table {
            wtr.serialize(CsvRow {
                label: &report.label,
                n: row.n,
                precision: row.precision,
                clipped: row.clipped,
                total: row.total,
                bleu: report.bleu,
                bp: report.score.bp,
            })
            .context("Failed to write CSV row")?;
        }
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn write_csv(path: impl AsRef<Path>, reports: &[CandidateReport]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv_to(file, reports)
}
