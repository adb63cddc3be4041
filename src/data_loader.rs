// src/data_loader.rs - references, candidates and batch segments
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::tokenizer::tokenize;

/// Label given to the translator's own output.
pub const NMT_LABEL: &str = "NMT output";

/// A labeled translation to be scored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub text: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    pub fn nmt(text: impl Into<String>) -> Self {
        Self::new(NMT_LABEL, text)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One reference per line; blank lines are dropped, the rest tokenized.
pub fn parse_references(text: &str) -> Vec<Vec<String>> {
    non_blank_lines(text).map(|(_, line)| tokenize(line)).collect()
}

/// One candidate per line, labeled `Candidate {line number}`.
///
/// Blank lines are skipped but still count toward the numbering.
pub fn parse_candidates(text: &str) -> Vec<Candidate> {
    non_blank_lines(text)
        .map(|(i, line)| Candidate::new(format!("Candidate {}", i + 1), line))
        .collect()
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.trim()
        .split('\n')
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
}

/// Read a file as UTF-8, replacing invalid sequences with U+FFFD.
pub fn read_text_lossy(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn load_references(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let references = parse_references(&read_text_lossy(path)?);
    debug!("Loaded {} references from {}", references.len(), path.display());
    Ok(references)
}

#[derive(Debug, Deserialize)]
struct CandidateRecord {
    label: String,
    candidate: String,
}

/// Load extra candidates: `label,candidate` CSV, or plain text one per line.
pub fn load_candidates(path: impl AsRef<Path>) -> Result<Vec<Candidate>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if !is_csv {
        return Ok(parse_candidates(&read_text_lossy(path)?));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut candidates = Vec::new();
    for result in reader.deserialize::<CandidateRecord>() {
        let record = result.context("Failed to read candidate record")?;
        candidates.push(Candidate::new(record.label.trim(), record.candidate.trim()));
    }
    debug!("Loaded {} candidates from {}", candidates.len(), path.display());
    Ok(candidates)
}

/// A source sentence with its reference translation(s), one per line.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub source: String,
    pub reference: String,
}

impl Segment {
    pub fn references(&self) -> Vec<Vec<String>> {
        parse_references(&self.reference)
    }
}

/// Batch input for translate-and-score runs.
/// Expected CSV format: | source | reference |
pub struct DataLoader {
    segments: Vec<Segment>,
}

impl DataLoader {
    pub fn from_csv(csv_path: impl AsRef<Path>) -> Result<Self> {
        let csv_path = csv_path.as_ref();
        let file = fs::File::open(csv_path)
            .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let mut segments = Vec::new();
        for (row, result) in reader.deserialize::<Segment>().enumerate() {
            let segment = result.context("Failed to read CSV record")?;

            if segment.source.trim().is_empty() || segment.reference.trim().is_empty() {
                warn!("Skipping row {}: empty source or reference", row + 1);
                continue;
            }
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn num_samples(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn source_texts(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.source.as_str()).collect()
    }
}
