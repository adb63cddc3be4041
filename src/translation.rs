// src/translation.rs - translation provider (external program)
use log::{debug, info};
use std::fmt;
use std::io::{self, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

pub const DEFAULT_MODEL: &str = "Helsinki-NLP/opus-mt-en-de";

/// MarianMT checkpoints offered by default.
pub const SUPPORTED_MODELS: [&str; 4] = [
    "Helsinki-NLP/opus-mt-en-de",
    "Helsinki-NLP/opus-mt-en-es",
    "Helsinki-NLP/opus-mt-en-fr",
    "Helsinki-NLP/opus-mt-de-en",
];

pub const DEFAULT_BEAMS: u32 = 4;
pub const MAX_BEAMS: u32 = 8;
pub const DEFAULT_MAX_LENGTH: usize = 512;

pub fn is_supported_model(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// Decoding parameters handed to the provider with every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationRequest {
    pub model: String,
    pub beam_width: u32,
    pub max_length: usize,
}

impl Default for TranslationRequest {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            beam_width: DEFAULT_BEAMS,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

#[derive(Debug)]
pub enum TranslationError {
    /// The translator process could not be started or talked to.
    Spawn(std::io::Error),
    /// The translator exited unsuccessfully.
    Failed { status: Option<i32>, stderr: String },
    /// The translator wrote something that is not UTF-8.
    InvalidOutput(std::string::FromUtf8Error),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "could not run translator: {e}"),
            Self::Failed { status: Some(code), stderr } => {
                write!(f, "translator exited with status {code}: {}", stderr.trim())
            }
            Self::Failed { status: None, stderr } => {
                write!(f, "translator was terminated: {}", stderr.trim())
            }
            Self::InvalidOutput(e) => write!(f, "translator output is not UTF-8: {e}"),
        }
    }
}

impl std::error::Error for TranslationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            Self::InvalidOutput(e) => Some(e),
            Self::Failed { .. } => None,
        }
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(e: std::io::Error) -> Self {
        Self::Spawn(e)
    }
}

/// Something that turns source text into a single translated string.
pub trait Translator: Send + Sync {
    /// Translate one text. Blank input yields an empty string.
    fn translate(&self, text: &str, request: &TranslationRequest) -> Result<String, TranslationError>;

    /// Translate several segments, keeping blank ones as empty strings
    /// without calling the provider for them.
    fn translate_batch(
        &self,
        texts: &[&str],
        request: &TranslationRequest,
    ) -> Result<Vec<String>, TranslationError> {
        texts
            .iter()
            .map(|text| {
                if text.trim().is_empty() {
                    Ok(String::new())
                } else {
                    self.translate(text, request)
                }
            })
            .collect()
    }
}

/// Runs an external translation program once per text.
///
/// The program receives `--model <id> --beams <n> --max-length <n>` after its
/// own arguments, reads the source text on stdin and prints the translation
/// on stdout.
#[derive(Clone, Debug)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, request: &TranslationRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--model")
            .arg(&request.model)
            .arg("--beams")
            .arg(request.beam_width.to_string())
            .arg("--max-length")
            .arg(request.max_length.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Translator for CommandTranslator {
    fn translate(&self, text: &str, request: &TranslationRequest) -> Result<String, TranslationError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        debug!(
            "Running {} (model={}, beams={})",
            self.program, request.model, request.beam_width
        );
        let mut child = self.command(request).spawn()?;
        let stdin = child.stdin.take();

        // stdin is fed from its own thread while stdout is drained, otherwise a
        // translator that streams output blocks on a full pipe
        let (output, written) = thread::scope(|s| {
            let writer = s.spawn(move || feed_stdin(stdin, text));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked")));
            (output, written)
        });
        let output = output?;
        written?;
        if !output.status.success() {
            return Err(TranslationError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let translation = String::from_utf8(output.stdout).map_err(TranslationError::InvalidOutput)?;
        let translation = translation.trim().to_string();
        info!("Translated {} chars -> {} chars", text.len(), translation.len());
        Ok(translation)
    }
}

/// Write the source and close the pipe so the child sees EOF.
fn feed_stdin(stdin: Option<ChildStdin>, text: &str) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(text.as_bytes()) {
        // a translator that exits early closes the pipe; its status says why
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
