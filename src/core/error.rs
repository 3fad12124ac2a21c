use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must be a finite, non-negative amount, got {value}")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("invalid input document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("monte carlo run cancelled after {completed} of {requested} paths")]
    Cancelled { completed: usize, requested: usize },
}
