// src/main.rs - translate, then score candidates with BLEU
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use nmt_bleu::config::{Args, EvalConfig, ReferenceInput};
use nmt_bleu::data_loader::{load_candidates, load_references, parse_candidates, parse_references, DataLoader};
use nmt_bleu::report::{print_report, print_reports, write_csv};
use nmt_bleu::{Candidate, CandidateReport, CommandTranslator, Evaluator, Translator};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;

    println!("========================================");
    println!("  NMT with Automatic BLEU Evaluation");
    println!("  Model: {} | Beams: {}", config.request.model, config.request.beam_width);
    println!("========================================\n");

    let evaluator = Evaluator::new(config.max_n, config.weights.clone())
        .context("Invalid scoring parameters")?
        .with_progress(config.progress);

    let translator: Option<Box<dyn Translator>> = config.translator.as_ref().map(|(program, args)| {
        info!("Using translator: {}", program);
        Box::new(CommandTranslator::new(program.clone(), args.clone())) as Box<dyn Translator>
    });

    let reports = match &config.batch {
        Some(_) => run_batch(&config, &evaluator, translator.as_deref())?,
        None => run_single(&config, &evaluator, translator.as_deref())?,
    };

    if let Some(path) = &config.csv_out {
        write_csv(path, &reports)?;
        println!("\n✓ N-gram table written to {}", path.display());
    }

    Ok(())
}

fn run_single(
    config: &EvalConfig,
    evaluator: &Evaluator,
    translator: Option<&dyn Translator>,
) -> Result<Vec<CandidateReport>> {
    let references = match &config.references {
        ReferenceInput::Text(text) => parse_references(text),
        ReferenceInput::File(path) => load_references(path)?,
        ReferenceInput::None => Vec::new(),
    };
    println!("✓ References: {}", references.len());

    let mut candidates = Vec::new();

    if let Some(source) = config.source.as_deref().filter(|s| !s.trim().is_empty()) {
        match translator {
            Some(translator) => {
                println!("Running NMT...");
                let output = translator
                    .translate(source, &config.request)
                    .context("Translation failed")?;
                println!("✓ NMT output: {}", output);
                candidates.push(Candidate::nmt(output));
            }
            None => warn!("No translator configured (--translator or NMT_TRANSLATOR); skipping translation"),
        }
    }

    if let Some(text) = &config.candidates {
        candidates.extend(parse_candidates(text));
    }
    if let Some(path) = &config.candidates_file {
        candidates.extend(load_candidates(path)?);
    }
    println!("✓ Candidates: {}", candidates.len());

    if references.is_empty() {
        println!("\nAdd at least one reference (--reference or --reference-file) to compute BLEU.");
        return Ok(Vec::new());
    }

    let reports = evaluator.evaluate(&candidates, &references)?;
    print_reports(&reports);
    Ok(reports)
}

fn run_batch(
    config: &EvalConfig,
    evaluator: &Evaluator,
    translator: Option<&dyn Translator>,
) -> Result<Vec<CandidateReport>> {
    let Some(path) = &config.batch else {
        return Ok(Vec::new());
    };
    let Some(translator) = translator else {
        bail!("Batch mode needs a translator (--translator or NMT_TRANSLATOR)");
    };

    println!("Loading segments from {}...", path.display());
    let loader = DataLoader::from_csv(path)?;
    println!("✓ Loaded {} segments", loader.num_samples());

    println!("Running NMT on {} segments...", loader.num_samples());
    let translations = translator
        .translate_batch(&loader.source_texts(), &config.request)
        .context("Batch translation failed")?;

    let segments = loader.segments();
    let mut reports = Vec::new();
    for (index, report) in evaluator.evaluate_segments(segments, &translations)? {
        println!("\nSource: {}", segments[index].source);
        print_report(&report);
        reports.push(report);
    }
    Ok(reports)
}
