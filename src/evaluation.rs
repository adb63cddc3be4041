// src/evaluation.rs - score labeled candidates against one reference set
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, warn};
use rayon::prelude::*;

use crate::data_loader::{Candidate, Segment};
use crate::metrics::{compute_bleu, validate_params, BleuError, BleuScore, DEFAULT_MAX_N};
use crate::tokenizer::tokenize;

/// BLEU result for one labeled candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateReport {
    pub label: String,
    pub text: String,
    pub bleu: f64,
    pub score: BleuScore,
}

pub struct Evaluator {
    max_n: usize,
    weights: Option<Vec<f64>>,
    show_progress: bool,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            max_n: DEFAULT_MAX_N,
            weights: None,
            show_progress: false,
        }
    }
}

impl Evaluator {
    /// Validates the scoring parameters up front so every later call can
    /// only fail on an empty reference set.
    pub fn new(max_n: usize, weights: Option<Vec<f64>>) -> Result<Self, BleuError> {
        validate_params(max_n, weights.as_deref())?;
        Ok(Self {
            max_n,
            weights,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn max_n(&self) -> usize {
        self.max_n
    }

    /// Score one raw candidate text.
    pub fn score_text(&self, text: &str, references: &[Vec<String>]) -> Result<(f64, BleuScore), BleuError> {
        compute_bleu(&tokenize(text), references, self.max_n, self.weights.as_deref())
    }

    /// Score every non-blank candidate in parallel, keeping input order.
    pub fn evaluate(
        &self,
        candidates: &[Candidate],
        references: &[Vec<String>],
    ) -> Result<Vec<CandidateReport>, BleuError> {
        if references.is_empty() {
            return Err(BleuError::NoReferences);
        }

        let scorable: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| {
                let keep = !c.is_blank();
                if !keep {
                    warn!("Skipping blank candidate '{}'", c.label);
                }
                keep
            })
            .collect();
        debug!(
            "Scoring {} candidates against {} references (max_n={})",
            scorable.len(),
            references.len(),
            self.max_n
        );

        let jobs: Vec<(&Candidate, &[Vec<String>])> = scorable.into_iter().map(|c| (c, references)).collect();
        self.score_all(&jobs)
    }

    /// Score each batch segment's translation against that segment's own
    /// references. Rows are independent; nothing is averaged. Each report is
    /// paired with the index of its segment.
    pub fn evaluate_segments(
        &self,
        segments: &[Segment],
        translations: &[String],
    ) -> Result<Vec<(usize, CandidateReport)>, BleuError> {
        if segments.len() != translations.len() {
            warn!(
                "{} segments but {} translations; extra rows are ignored",
                segments.len(),
                translations.len()
            );
        }

        let mut indices = Vec::with_capacity(segments.len());
        let mut rows = Vec::with_capacity(segments.len());
        for (i, (segment, translation)) in segments.iter().zip(translations).enumerate() {
            let candidate = Candidate::new(format!("Segment {}", i + 1), translation.as_str());
            if candidate.is_blank() {
                warn!("Skipping blank candidate '{}'", candidate.label);
                continue;
            }
            let references = segment.references();
            if references.is_empty() {
                return Err(BleuError::NoReferences);
            }
            indices.push(i);
            rows.push((candidate, references));
        }
        debug!("Scoring {} segments (max_n={})", rows.len(), self.max_n);

        let jobs: Vec<(&Candidate, &[Vec<String>])> =
            rows.iter().map(|(c, refs)| (c, refs.as_slice())).collect();
        let reports = self.score_all(&jobs)?;
        Ok(indices.into_iter().zip(reports).collect())
    }

    /// Score all jobs in parallel under a single progress bar.
    fn score_all(&self, jobs: &[(&Candidate, &[Vec<String>])]) -> Result<Vec<CandidateReport>, BleuError> {
        let pb = self.progress_bar(jobs.len() as u64);
        let reports = jobs
            .par_iter()
            .progress_with(pb.clone())
            .map(|&(candidate, references)| -> Result<CandidateReport, BleuError> {
                let (bleu, score) = self.score_text(&candidate.text, references)?;
                Ok(CandidateReport {
                    label: candidate.label.clone(),
                    text: candidate.text.clone(),
                    bleu,
                    score,
                })
            })
            .collect::<Result<Vec<_>, BleuError>>();
        pb.finish_and_clear();

        reports
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        match ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}") {
            Ok(style) => pb.set_style(style.progress_chars("=>-")),
            Err(e) => debug!("Progress bar template rejected: {e}"),
        }
        pb.set_message("scoring");
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::parse_references;

    #[test]
    fn invalid_parameters_are_rejected_up_front() {
        assert_eq!(Evaluator::new(0, None).err(), Some(BleuError::InvalidOrder));
        assert!(matches!(
            Evaluator::new(4, Some(vec![0.5, 0.5])),
            Err(BleuError::WeightCountMismatch { expected: 4, found: 2 })
        ));
        assert!(Evaluator::new(2, Some(vec![0.5, 0.5])).is_ok());
    }

    #[test]
    fn evaluates_in_order_and_skips_blank() {
        let refs = parse_references("the patient has a fever\nthe patient is feverish");
        let candidates = vec![
            Candidate::nmt("the patient has a fever"),
            Candidate::new("Candidate 1", "   "),
            Candidate::new("Candidate 2", "a patient"),
        ];
        let reports = Evaluator::default().evaluate(&candidates, &refs).unwrap();

        let labels: Vec<&str> = reports.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["NMT output", "Candidate 2"]);
        assert!((reports[0].bleu - 1.0).abs() < 1e-9);
        assert!(reports[1].bleu < reports[0].bleu);
        assert_eq!(reports[1].score.candidate_len, 2);
        assert_eq!(reports[1].score.reference_lens, vec![5, 4]);
    }

    #[test]
    fn parallel_result_matches_direct_call() {
        let refs = parse_references("der Blutdruck war erhöht");
        let candidates: Vec<Candidate> = (0..32)
            .map(|i| Candidate::new(format!("c{i}"), "der Blutdruck ist erhöht"))
            .collect();
        let evaluator = Evaluator::new(4, None).unwrap().with_progress(false);
        let reports = evaluator.evaluate(&candidates, &refs).unwrap();
        let (direct, _) = evaluator.score_text("der Blutdruck ist erhöht", &refs).unwrap();
        assert_eq!(reports.len(), 32);
        assert!(reports.iter().all(|r| r.bleu.to_bits() == direct.to_bits()));
        assert_eq!(reports[31].label, "c31");
    }

    #[test]
    fn empty_reference_set_is_rejected() {
        let err = Evaluator::default()
            .evaluate(&[Candidate::nmt("x")], &[])
            .unwrap_err();
        assert_eq!(err, BleuError::NoReferences);
    }

    #[test]
    fn segments_use_their_own_references() {
        let segments = vec![
            Segment {
                source: "The patient has a fever.".into(),
                reference: "Der Patient hat Fieber.".into(),
            },
            Segment {
                source: "Blood pressure was high.".into(),
                reference: "Der Blutdruck war hoch.\nDer Blutdruck war erhöht.".into(),
            },
            Segment {
                source: "Cough.".into(),
                reference: "Husten.".into(),
            },
        ];
        let translations = vec![
            "Der Patient hat Fieber.".to_string(),
            "Der Blutdruck war erhöht.".to_string(),
            String::new(),
        ];
        let reports = Evaluator::default()
            .evaluate_segments(&segments, &translations)
            .unwrap();

        // blank translation of the third row is skipped
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, 0);
        assert_eq!(reports[0].1.label, "Segment 1");
        assert_eq!(reports[1].0, 1);
        assert!((reports[1].1.bleu - 1.0).abs() < 1e-9);
        assert_eq!(reports[1].1.score.reference_lens, vec![4, 4]);
    }

    #[test]
    fn many_segments_are_scored_in_one_pass_in_order() {
        let segments: Vec<Segment> = (0..40)
            .map(|i| Segment {
                source: format!("source {i}"),
                reference: format!("Zeile {i} ist hier"),
            })
            .collect();
        // every fifth translation is blank
        let translations: Vec<String> = (0..40)
            .map(|i| if i % 5 == 0 { String::new() } else { format!("Zeile {i} ist hier") })
            .collect();
        let reports = Evaluator::default()
            .with_progress(true)
            .evaluate_segments(&segments, &translations)
            .unwrap();

        assert_eq!(reports.len(), 32);
        let indices: Vec<usize> = reports.iter().map(|(i, _)| *i).collect();
        let expected: Vec<usize> = (0..40).filter(|i| i % 5 != 0).collect();
        assert_eq!(indices, expected);
        for (i, report) in &reports {
            assert_eq!(report.label, format!("Segment {}", i + 1));
            assert_eq!(report.text, translations[*i]);
            assert!((report.bleu - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn segment_without_references_is_rejected() {
        let segments = vec![Segment {
            source: "Cough.".into(),
            reference: " \n ".into(),
        }];
        let err = Evaluator::default()
            .evaluate_segments(&segments, &["Husten.".to_string()])
            .unwrap_err();
        assert_eq!(err, BleuError::NoReferences);
    }

    #[test]
    fn weights_are_applied() {
        let refs = parse_references("a b");
        let evaluator = Evaluator::new(2, Some(vec![1.0, 0.0])).unwrap();
        let reports = evaluator.evaluate(&[Candidate::nmt("b a")], &refs).unwrap();
        assert!((reports[0].bleu - 1.0).abs() < 1e-9);
        assert_eq!(evaluator.max_n(), 2);
    }
}
