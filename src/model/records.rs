//! Raw records as returned by the GraphQL data source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix marking skill-tracking transaction kinds.
pub const SKILL_PREFIX: &str = "skill_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Xp,
    /// Audit XP earned by reviewing someone else ("up").
    AuditGiven,
    /// Audit XP lost by being reviewed ("down").
    AuditReceived,
    /// `skill_<label>`; holds the raw kind string.
    Skill(String),
    Level,
    Other(String),
}

impl TransactionKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "xp" => TransactionKind::Xp,
            "up" => TransactionKind::AuditGiven,
            "down" => TransactionKind::AuditReceived,
            "level" => TransactionKind::Level,
            s if s.starts_with(SKILL_PREFIX) => TransactionKind::Skill(s.to_string()),
            s => TransactionKind::Other(s.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::Xp => "xp",
            TransactionKind::AuditGiven => "up",
            TransactionKind::AuditReceived => "down",
            TransactionKind::Level => "level",
            TransactionKind::Skill(raw) | TransactionKind::Other(raw) => raw,
        }
    }

    pub fn is_skill(&self) -> bool {
        matches!(self, TransactionKind::Skill(_))
    }
}

impl Serialize for TransactionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TransactionKind::parse(&raw))
    }
}

/// What a record is about: the curriculum object plus its path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub category: String,
    pub path: String,
}

impl Subject {
    pub fn new(name: &str, category: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            path: path.to_string(),
        }
    }
}

/// `object { name type }` on the wire; either field may be null.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WireObject {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub category: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn subject_from(object: Option<WireObject>, path: String) -> Subject {
    let object = object.unwrap_or_default();
    Subject {
        name: object.name,
        category: object.category,
        path,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireTransaction", into = "WireTransaction")]
pub struct Transaction {
    pub id: i64,
    pub kind: TransactionKind,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub subject: Subject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    id: i64,
    #[serde(rename = "type")]
    kind: TransactionKind,
    // Amounts arrive as JSON numbers, sometimes with a fractional part.
    amount: f64,
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    path: String,
    #[serde(default)]
    object: Option<WireObject>,
}

impl From<WireTransaction> for Transaction {
    fn from(w: WireTransaction) -> Self {
        Self {
            id: w.id,
            kind: w.kind,
            amount: w.amount.round() as i64,
            created_at: w.created_at,
            subject: subject_from(w.object, w.path),
        }
    }
}

impl From<Transaction> for WireTransaction {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            kind: t.kind,
            amount: t.amount as f64,
            created_at: t.created_at,
            path: t.subject.path,
            object: Some(WireObject {
                name: t.subject.name,
                category: t.subject.category,
            }),
        }
    }
}

impl Transaction {
    pub fn new(id: i64, kind: &str, amount: i64, created_at: DateTime<Utc>, subject: Subject) -> Self {
        Self {
            id,
            kind: TransactionKind::parse(kind),
            amount,
            created_at,
            subject,
        }
    }
}

/// A progress or result row. `grade == None` means not graded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireProgress", into = "WireProgress")]
pub struct Progress {
    pub id: i64,
    pub grade: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub subject: Subject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireProgress {
    id: i64,
    #[serde(default)]
    grade: Option<f64>,
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    path: String,
    #[serde(default)]
    object: Option<WireObject>,
}

impl From<WireProgress> for Progress {
    fn from(w: WireProgress) -> Self {
        Self {
            id: w.id,
            grade: w.grade,
            created_at: w.created_at,
            subject: subject_from(w.object, w.path),
        }
    }
}

impl From<Progress> for WireProgress {
    fn from(p: Progress) -> Self {
        Self {
            id: p.id,
            grade: p.grade,
            created_at: p.created_at,
            path: p.subject.path,
            object: Some(WireObject {
                name: p.subject.name,
                category: p.subject.category,
            }),
        }
    }
}

impl Progress {
    pub fn new(id: i64, grade: Option<f64>, created_at: DateTime<Utc>, subject: Subject) -> Self {
        Self { id, grade, created_at, subject }
    }
}

/// The authenticated user row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
