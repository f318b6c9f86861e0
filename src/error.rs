use reqwest::StatusCode;

/// Failure to turn a roster body into records.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: missing field `{field}`")]
    MissingField { line: usize, field: &'static str },

    #[error("JSON roster records do not match the student layout: {0}")]
    Records(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("{method} {url} returned {status}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
    },

    #[error("invalid roster body: {0}")]
    Parse(#[from] ParseError),
}
