use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for one orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        run_id: String,
        purpose: String,
        max_iterations: usize,
        approval_threshold: f64,
    },
    GeneratorStarted {
        iteration: usize,
        refining: bool,
    },
    GeneratorCompleted {
        iteration: usize,
        title: String,
        confidence: f64,
    },
    EvaluatorCompleted {
        iteration: usize,
        decision: String,
        score: f64,
    },
    IterationFailed {
        iteration: usize,
        error: String,
    },
    RunApproved {
        iterations: usize,
        score: f64,
    },
    MaxIterationsReached {
        iterations: usize,
        best_score: f64,
    },
    RunCancelled {
        iteration: usize,
    },
    RunFailed {
        iterations: usize,
        error: String,
    },
    QuickRunStarted {
        purpose: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for run events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger that also appends JSON lines to a file
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON, regardless of console format
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                run_id,
                purpose,
                max_iterations,
                approval_threshold,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "draftloop".bold().bright_white(),
                    "run".dimmed(),
                    run_id.dimmed()
                );
                let _ = writeln!(stderr, "  {} {}", "Purpose:".dimmed(), purpose);
                let _ = writeln!(
                    stderr,
                    "  {} {} iterations, threshold {:.1}",
                    "Budget:".dimmed(),
                    max_iterations,
                    approval_threshold
                );
            }
            LogEvent::GeneratorStarted { iteration, refining } => {
                let label = if *refining { "refine" } else { "generate" };
                let _ = writeln!(
                    stderr,
                    "{} {}",
                    format!("[{}]", iteration).bright_blue(),
                    label.bright_white()
                );
            }
            LogEvent::GeneratorCompleted {
                iteration,
                title,
                confidence,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} (confidence {:.1})",
                    format!("[{}]", iteration).bright_blue(),
                    "draft:".dimmed(),
                    title,
                    confidence
                );
            }
            LogEvent::EvaluatorCompleted {
                iteration,
                decision,
                score,
            } => {
                let colored_decision = if decision.starts_with("APPROVED") {
                    decision.bright_green()
                } else {
                    decision.bright_yellow()
                };
                let _ = writeln!(
                    stderr,
                    "{} {} {} (score {:.1})",
                    format!("[{}]", iteration).bright_blue(),
                    "verdict:".dimmed(),
                    colored_decision,
                    score
                );
            }
            LogEvent::IterationFailed { iteration, error } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    format!("[{}]", iteration).bright_blue(),
                    "failed:".bright_red(),
                    error
                );
            }
            LogEvent::RunApproved { iterations, score } => {
                let _ = writeln!(
                    stderr,
                    "{} after {} iteration(s), score {:.1}",
                    "Approved".bright_green().bold(),
                    iterations,
                    score
                );
            }
            LogEvent::MaxIterationsReached {
                iterations,
                best_score,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} after {} iteration(s), best score {:.1}",
                    "Budget exhausted".bright_yellow().bold(),
                    iterations,
                    best_score
                );
            }
            LogEvent::RunCancelled { iteration } => {
                let _ = writeln!(
                    stderr,
                    "{} at iteration {}",
                    "Cancelled".bright_yellow().bold(),
                    iteration
                );
            }
            LogEvent::RunFailed { iterations, error } => {
                let _ = writeln!(
                    stderr,
                    "{} after {} iteration(s): {}",
                    "Failed".bright_red().bold(),
                    iterations,
                    error
                );
            }
            LogEvent::QuickRunStarted { purpose } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "draftloop".bold().bright_white(),
                    "quick".dimmed(),
                    purpose
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let line = match event {
            LogEvent::RunStarted {
                run_id,
                max_iterations,
                ..
            } => format!("run {} start max_iter={}", run_id, max_iterations),
            LogEvent::GeneratorStarted { iteration, refining } => {
                format!("iter {} generate refining={}", iteration, refining)
            }
            LogEvent::GeneratorCompleted {
                iteration,
                confidence,
                ..
            } => format!("iter {} draft confidence={:.1}", iteration, confidence),
            LogEvent::EvaluatorCompleted {
                iteration, score, ..
            } => format!("iter {} verdict score={:.1}", iteration, score),
            LogEvent::IterationFailed { iteration, error } => {
                format!("iter {} failed: {}", iteration, error)
            }
            LogEvent::RunApproved { iterations, score } => {
                format!("approved iter={} score={:.1}", iterations, score)
            }
            LogEvent::MaxIterationsReached {
                iterations,
                best_score,
            } => format!("max_iter iter={} best={:.1}", iterations, best_score),
            LogEvent::RunCancelled { iteration } => format!("cancelled iter={}", iteration),
            LogEvent::RunFailed { iterations, error } => {
                format!("failed iter={}: {}", iterations, error)
            }
            LogEvent::QuickRunStarted { .. } => "quick start".to_string(),
        };
        let _ = writeln!(stderr, "{}", line);
    }
}
