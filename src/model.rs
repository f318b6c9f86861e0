use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// One roster record. Every field is kept as text, the way it arrives on the wire.
/// JSON numbers, booleans and nulls are accepted and stored as their text form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(alias = "firstName", deserialize_with = "scalar_string")]
    pub first_name: String,
    #[serde(alias = "lastName", deserialize_with = "scalar_string")]
    pub last_name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub email: String,
    #[serde(alias = "ip", deserialize_with = "scalar_string")]
    pub ip_address: String,
}

fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

impl Student {
    /// Field values in column order.
    pub fn fields(&self) -> [&str; 5] {
        [
            self.id.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
            self.ip_address.as_str(),
        ]
    }

    pub fn field(&self, key: SortKey) -> &str {
        match key {
            SortKey::Id => self.id.as_str(),
            SortKey::FirstName => self.first_name.as_str(),
            SortKey::LastName => self.last_name.as_str(),
            SortKey::Email => self.email.as_str(),
            SortKey::IpAddress => self.ip_address.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum SortKey {
    Id,
    #[default]
    FirstName,
    LastName,
    Email,
    IpAddress,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Id,
        SortKey::FirstName,
        SortKey::LastName,
        SortKey::Email,
        SortKey::IpAddress,
    ];

    /// Column position in the rendered table.
    pub fn column(self) -> usize {
        match self {
            SortKey::Id => 0,
            SortKey::FirstName => 1,
            SortKey::LastName => 2,
            SortKey::Email => 3,
            SortKey::IpAddress => 4,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.column() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.column() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Whether the first line of a roster body is a header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderMode {
    #[default]
    Skip,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub header: HeaderMode,
    pub gzip_upload: bool,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Fetching,
    Uploading,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RosterEvent {
    PhaseStarted {
        phase: Phase,
    },
    Fetched {
        students: Vec<Student>,
    },
    Uploaded {
        count: usize,
        status: u16,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    Busy { phase: Phase },
    Failed { phase: Phase, error: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Busy { phase } => {
                format!("Busy ({phase:?}), wait for the current request to finish")
            }
            InfoEvent::Failed { phase, error } => match phase {
                Phase::Fetching => format!("Fetch failed: {error}"),
                Phase::Uploading => format!("Upload failed: {error}"),
                Phase::Idle => error.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_serializes_with_upload_keys() {
        let s = Student {
            id: "1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            ip_address: "10.0.0.1".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["first_name"], "Ada");
        assert_eq!(v["last_name"], "Lovelace");
        assert_eq!(v["ip_address"], "10.0.0.1");
    }

    #[test]
    fn student_accepts_camel_case_aliases() {
        let s: Student = serde_json::from_str(
            r#"{"id":"2","firstName":"Alan","lastName":"Turing","email":"a@t.uk","ip":"::1"}"#,
        )
        .unwrap();
        assert_eq!(s.first_name, "Alan");
        assert_eq!(s.ip_address, "::1");
    }

    #[test]
    fn student_accepts_scalar_fields() {
        let s: Student = serde_json::from_str(
            r#"{"id":1,"first_name":"Eve","last_name":null,"email":"e@m.io","ip_address":"::1"}"#,
        )
        .unwrap();
        assert_eq!(s.id, "1");
        assert_eq!(s.last_name, "");
    }

    #[test]
    fn student_rejects_nested_values() {
        let res = serde_json::from_str::<Student>(
            r#"{"id":[1],"first_name":"Eve","last_name":"M","email":"e@m.io","ip_address":"::1"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn sort_key_cycles_through_columns() {
        assert_eq!(SortKey::IpAddress.next(), SortKey::Id);
        assert_eq!(SortKey::Id.prev(), SortKey::IpAddress);
        assert_eq!(SortKey::FirstName.next().column(), 2);
    }

    #[test]
    fn failed_info_names_the_phase() {
        let ev = InfoEvent::Failed {
            phase: Phase::Uploading,
            error: "boom".into(),
        };
        assert_eq!(ev.to_message(), "Upload failed: boom");
    }
}
