//! BLEU evaluation for machine translation output.
//!
//! The scoring core ([`tokenizer`], [`metrics`]) is pure and works on token
//! sequences. The remaining modules supply references and candidates, run an
//! external translator and print or export the results.

pub mod config;
pub mod data_loader;
pub mod evaluation;
pub mod metrics;
pub mod report;
pub mod tokenizer;
pub mod translation;

pub use data_loader::Candidate;
pub use evaluation::{CandidateReport, Evaluator};
pub use metrics::{compute_bleu, BleuError, BleuScore, NgramRow};
pub use tokenizer::tokenize;
pub use translation::{CommandTranslator, TranslationRequest, Translator};
