//! Tokenization progress reporting.
//!
//! Reports observable progress during `medprep tokenize` so users see which
//! category is being scanned and how many files are left. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a tokenization run.
#[derive(Clone, Debug)]
pub enum TokenizeProgressEvent {
    /// Corpus folders are being listed. Total unknown.
    Discovering { root: String },
    /// `n` files out of `total` have been extracted and tokenized.
    Extracting {
        category: String,
        file: String,
        n: u64,
        total: u64,
    },
    /// The token store was replaced.
    Saved { path: String, files: u64 },
}

/// Reports tokenization progress. Implementations write to stderr.
pub trait TokenizeProgressReporter: Send + Sync {
    fn report(&self, event: TokenizeProgressEvent);
}

/// Human-friendly progress: "tokenize guidelines  1,234 / 5,000 files  CHF.pdf".
pub struct StderrProgress;

impl TokenizeProgressReporter for StderrProgress {
    fn report(&self, event: TokenizeProgressEvent) {
        let line = match &event {
            TokenizeProgressEvent::Discovering { root } => {
                format!("tokenize {}  discovering...\n", root)
            }
            TokenizeProgressEvent::Extracting {
                category,
                file,
                n,
                total,
            } => format!(
                "tokenize {}  {} / {} files  {}\n",
                category,
                format_number(*n),
                format_number(*total),
                file
            ),
            TokenizeProgressEvent::Saved { path, files } => {
                format!("tokenize  saved {} files to {}\n", format_number(*files), path)
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl TokenizeProgressReporter for JsonProgress {
    fn report(&self, event: TokenizeProgressEvent) {
        let obj = match &event {
            TokenizeProgressEvent::Discovering { root } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "root": root
            }),
            TokenizeProgressEvent::Extracting {
                category,
                file,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "category": category,
                "file": file,
                "n": n,
                "total": total
            }),
            TokenizeProgressEvent::Saved { path, files } => serde_json::json!({
                "event": "progress",
                "phase": "saved",
                "path": path,
                "files": files
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl TokenizeProgressReporter for NoProgress {
    fn report(&self, _event: TokenizeProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn TokenizeProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
