//! Roster body decoding.
//!
//! The endpoint has been seen answering with a JSON-encoded string holding
//! comma-separated text, with a JSON array of records, and with plain text.

use crate::error::ParseError;
use crate::model::{HeaderMode, Student};

const FIELD_NAMES: [&str; 5] = ["id", "first_name", "last_name", "email", "ip_address"];

/// Shape of a GET response body after JSON sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterBody {
    /// Comma-separated text, one record per line.
    Text(String),
    /// Records already structured by the server.
    Records(Vec<Student>),
}

/// A JSON array is always taken as records; one that does not fit the student
/// layout is an error, never reinterpreted as comma-separated text.
pub fn decode_body(body: &str) -> Result<RosterBody, ParseError> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(text)) => Ok(RosterBody::Text(text)),
        Ok(array @ serde_json::Value::Array(_)) => serde_json::from_value::<Vec<Student>>(array)
            .map(RosterBody::Records)
            .map_err(|e| ParseError::Records(e.to_string())),
        _ => Ok(RosterBody::Text(body.to_string())),
    }
}

/// Decode and parse a response body in one step.
pub fn parse_body(body: &str, header: HeaderMode) -> Result<Vec<Student>, ParseError> {
    match decode_body(body)? {
        RosterBody::Text(text) => parse_roster(&text, header),
        RosterBody::Records(records) => Ok(records),
    }
}

/// Split comma-separated roster text into records.
///
/// Splitting is naive: no quoting, no escapes. Fields past the fifth are
/// ignored and blank lines are dropped. Line numbers in errors are 1-based
/// and count the header.
pub fn parse_roster(text: &str, header: HeaderMode) -> Result<Vec<Student>, ParseError> {
    let skip = match header {
        HeaderMode::Skip => 1,
        HeaderMode::Absent => 0,
    };

    let mut students = Vec::new();
    for (idx, raw) in text.split('\n').enumerate().skip(skip) {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        students.push(parse_line(line, idx + 1)?);
    }
    Ok(students)
}

fn parse_line(line: &str, line_no: usize) -> Result<Student, ParseError> {
    let mut parts = line.split(',');
    let mut next = |i: usize| {
        parts
            .next()
            .map(str::to_string)
            .ok_or(ParseError::MissingField {
                line: line_no,
                field: FIELD_NAMES[i],
            })
    };
    Ok(Student {
        id: next(0)?,
        first_name: next(1)?,
        last_name: next(2)?,
        email: next(3)?,
        ip_address: next(4)?,
    })
}
