// src/config.rs - command line options
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::warn;
use std::path::PathBuf;

use crate::data_loader::read_text_lossy;
use crate::metrics::DEFAULT_MAX_N;
use crate::translation::{
    is_supported_model, TranslationRequest, DEFAULT_BEAMS, DEFAULT_MAX_LENGTH, DEFAULT_MODEL,
    MAX_BEAMS, SUPPORTED_MODELS,
};

#[derive(Parser, Debug)]
#[command(name = "nmt-bleu")]
#[command(about = "Translate text and evaluate candidates with BLEU against reference translations")]
pub struct Args {
    /// Source text to translate
    #[arg(short, long, conflicts_with = "source_file")]
    pub source: Option<String>,

    /// File holding the source text
    #[arg(long)]
    pub source_file: Option<PathBuf>,

    /// Reference translation(s), one per line
    #[arg(short, long, conflicts_with = "reference_file")]
    pub reference: Option<String>,

    /// Reference file (.txt), one reference per line
    #[arg(long)]
    pub reference_file: Option<PathBuf>,

    /// Extra candidate translations, one per line
    #[arg(short, long)]
    pub candidates: Option<String>,

    /// Extra candidates from a file (.txt one per line, or .csv with label,candidate)
    #[arg(long)]
    pub candidates_file: Option<PathBuf>,

    /// Batch CSV (source,reference): translate and score each row separately
    #[arg(long, conflicts_with_all = ["source", "source_file", "reference", "reference_file"])]
    pub batch: Option<PathBuf>,

    /// Translation model identifier
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Beam size (larger = better quality, slower)
    #[arg(short, long, default_value_t = DEFAULT_BEAMS)]
    pub beams: u32,

    /// Maximum length of a generated translation
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Translator program (reads source on stdin, prints translation)
    #[arg(short, long, env = "NMT_TRANSLATOR")]
    pub translator: Option<String>,

    /// Extra argument passed to the translator program (repeatable)
    #[arg(long = "translator-arg", allow_hyphen_values = true)]
    pub translator_args: Vec<String>,

    /// Highest n-gram order
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_N)]
    pub max_n: usize,

    /// Per-order weights, comma separated (must sum to 1)
    #[arg(short, long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,

    /// Write the n-gram table of every candidate to this CSV file
    #[arg(long)]
    pub csv_out: Option<PathBuf>,

    /// Show a progress bar while scoring
    #[arg(long)]
    pub progress: bool,
}

/// Where reference translations come from.
#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceInput {
    Text(String),
    File(PathBuf),
    None,
}

/// Validated settings for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalConfig {
    pub source: Option<String>,
    pub references: ReferenceInput,
    pub candidates: Option<String>,
    pub candidates_file: Option<PathBuf>,
    pub batch: Option<PathBuf>,
    pub request: TranslationRequest,
    pub translator: Option<(String, Vec<String>)>,
    pub max_n: usize,
    pub weights: Option<Vec<f64>>,
    pub csv_out: Option<PathBuf>,
    pub progress: bool,
}

impl Args {
    pub fn into_config(self) -> Result<EvalConfig> {
        if self.beams == 0 || self.beams > MAX_BEAMS {
            bail!("Beam size must be between 1 and {}, got {}", MAX_BEAMS, self.beams);
        }
        if self.max_length == 0 {
            bail!("Maximum length must be at least 1");
        }
        if self.max_n == 0 {
            bail!("Max n-gram order must be at least 1");
        }
        if !is_supported_model(&self.model) {
            warn!(
                "Model '{}' is not one of the known models ({})",
                self.model,
                SUPPORTED_MODELS.join(", ")
            );
        }

        let source = match (self.source, self.source_file) {
            (Some(text), _) => Some(text),
            (None, Some(path)) => Some(
                read_text_lossy(&path)
                    .with_context(|| format!("Failed to read source file {}", path.display()))?,
            ),
            (None, None) => None,
        };

        let references = match (self.reference, self.reference_file) {
            (Some(text), _) => ReferenceInput::Text(text),
            (None, Some(path)) => ReferenceInput::File(path),
            (None, None) => ReferenceInput::None,
        };

        Ok(EvalConfig {
            source,
            references,
            candidates: self.candidates,
            candidates_file: self.candidates_file,
            batch: self.batch,
            request: TranslationRequest {
                model: self.model,
                beam_width: self.beams,
                max_length: self.max_length,
            },
            translator: self.translator.map(|program| (program, self.translator_args)),
            max_n: self.max_n,
            weights: self.weights,
            csv_out: self.csv_out,
            progress: self.progress,
        })
    }
}
