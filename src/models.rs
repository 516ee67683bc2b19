use serde::{Deserialize, Deserializer, Serialize};

/// Link-health status carried on every stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkStatus {
    Active,
    Dead,
    /// Never probed. Legacy records with no `status` or an empty one decode to this.
    #[default]
    #[serde(alias = "")]
    Unknown,
}

impl std::fmt::Display for BookmarkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookmarkStatus::Active => "active",
            BookmarkStatus::Dead => "dead",
            BookmarkStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A single bookmark as stored in the sorted indices.
///
/// The serialized field names are the on-disk format shared with existing
/// store contents, so they must not be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Identity key. Equality is exact string match.
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,

    /// Unix seconds. Also the score in every sorted index.
    #[serde(default)]
    pub created_at: i64,

    #[serde(default)]
    pub updated_at: i64,

    /// Display fingerprint of `url`; see [`bookmark_id`].
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub status: BookmarkStatus,
}

impl Bookmark {
    /// Create a record with a derived id and `unknown` status.
    pub fn new(url: impl Into<String>, title: impl Into<String>, created_at: i64) -> Self {
        let url = url.into();
        let id = bookmark_id(&url);
        Self {
            url,
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            created_at,
            updated_at: created_at,
            id,
            status: BookmarkStatus::Unknown,
        }
    }

    /// Score used when inserting into a sorted index.
    pub fn score(&self) -> f64 {
        self.created_at as f64
    }

    pub fn with_status(mut self, status: BookmarkStatus) -> Self {
        self.status = status;
        self
    }

    pub fn to_member(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_member(member: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(member)
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, wanted: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(wanted))
    }
}

/// One URL that appears more than once in a record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub url: String,
    pub occurrence_count: usize,
}

/// FNV-1a (64-bit) of the URL, lower-case hex. Stable across runs and builds.
pub fn bookmark_id(url: &str) -> String {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = url.bytes().fold(OFFSET_BASIS, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(PRIME)
    });
    format!("{:x}", hash)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
