//! Domain error types.

use chrono::NaiveDate;

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Failures that stop a simulation from starting or from being analysed.
///
/// Insufficient indicator history, zero volatility and rejected trades are not
/// errors; they are absorbed where they occur.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("no data provided to run strategy")]
    NoData,

    #[error("no simulation dates found on or after {start}")]
    EmptyRange { start: NaiveDate },

    #[error("no portfolio history available from simulation start date {start}")]
    EmptyHistory { start: NaiveDate },

    #[error("invalid series for {ticker}: {reason}")]
    InvalidSeries { ticker: String, reason: String },
}

/// Top-level error type for stratlab.
#[derive(Debug, thiserror::Error)]
pub enum StratlabError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("strategy \"{name}\" not found or not implemented")]
    UnknownStrategy { name: String },

    #[error("no historical data found for {ticker}")]
    NoData { ticker: String },

    #[error("backtest failed: {0}")]
    Simulation(#[from] SimError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratlabError> for std::process::ExitCode {
    fn from(err: &StratlabError) -> Self {
        let code: u8 = match err {
            StratlabError::Io(_) | StratlabError::Report { .. } => 1,
            StratlabError::ConfigParse { .. }
            | StratlabError::ConfigMissing { .. }
            | StratlabError::ConfigInvalid { .. } => 2,
            StratlabError::Database { .. } | StratlabError::DatabaseQuery { .. } => 3,
            StratlabError::RuleParse(_)
            | StratlabError::RuleInvalid { .. }
            | StratlabError::UnknownStrategy { .. } => 4,
            StratlabError::NoData { .. } => 5,
            StratlabError::Simulation(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
