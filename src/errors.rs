use thiserror::Error;

use crate::expr::ExprError;

/// Errors raised while compiling an FSM program into a LUT image.
///
/// All of these are structural errors in the program description; none are
/// transient, so none are retried. Any of them aborts the whole encode run
/// before a single byte is produced.
#[derive(Debug, Error)]
pub enum Error {
    /// Condition pattern has the wrong length or characters outside `{0,1,-}`.
    #[error("state {state}: malformed condition {pattern:?}: {reason}")]
    MalformedCondition {
        state: usize,
        pattern: String,
        reason: String,
    },

    /// A `next_state` label does not name any record in the program.
    #[error("state {state}: unknown next-state label {label:?}")]
    UnknownLabel { state: usize, label: String },

    /// An output expression failed to parse or to evaluate.
    ///
    /// `input` is the input combination being evaluated, or `None` when the
    /// failure happened while parsing the expression.
    #[error("state {state}{}: {source}", fmt_input(.input))]
    Expression {
        state: usize,
        input: Option<u64>,
        source: ExprError,
    },

    /// The geometry quartet cannot describe a valid LUT.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// A diagnostic referenced a state index the program does not have.
    #[error("state index {state} out of range ({len} records)")]
    NoSuchState { state: usize, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn fmt_input(input: &Option<u64>) -> String {
    match input {
        Some(i) => format!(", input {i:#b}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
