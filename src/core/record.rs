//! Record domain model, field validation and paging rules.
use chrono::{DateTime, Utc};
use prost_types::Timestamp;

pub type RecordId = i64;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DIRECTOR_LEN: usize = 255;
pub const MAX_GENRE_LEN: usize = 100;
pub const MIN_RATING: f32 = 0.0;
pub const MAX_RATING: f32 = 10.0;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Validated, storable record contents.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFields {
    pub title: String,
    pub director: String,
    pub release_date: DateTime<Utc>,
    pub genre: String,
    pub rating: f32,
}

/// A persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub director: String,
    pub release_date: DateTime<Utc>,
    pub genre: String,
    pub rating: f32,
}

impl Record {
    pub fn from_fields(id: RecordId, fields: RecordFields) -> Self {
        Self {
            id,
            title: fields.title,
            director: fields.director,
            release_date: fields.release_date,
            genre: fields.genre,
            rating: fields.rating,
        }
    }
}

/// Unvalidated record contents as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub title: String,
    pub director: String,
    pub release_date: Option<DateTime<Utc>>,
    pub genre: String,
    pub rating: f32,
}

/// One failed field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

impl RecordDraft {
    /// Apply the field rules, collecting every violation rather than
    /// stopping at the first.
    pub fn validate(self) -> Result<RecordFields, Vec<FieldViolation>> {
        let mut violations = Vec::new();

        check_length(&mut violations, "title", &self.title, MAX_TITLE_LEN);
        check_length(&mut violations, "director", &self.director, MAX_DIRECTOR_LEN);
        check_length(&mut violations, "genre", &self.genre, MAX_GENRE_LEN);

        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            violations.push(FieldViolation {
                field: "rating",
                message: format!("must be between {MIN_RATING} and {MAX_RATING}"),
            });
        }

        match self.release_date {
            Some(release_date) if violations.is_empty() => Ok(RecordFields {
                title: self.title,
                director: self.director,
                release_date,
                genre: self.genre,
                rating: self.rating,
            }),
            release_date => {
                if release_date.is_none() {
                    violations.push(FieldViolation {
                        field: "release_date",
                        message: "is required".to_string(),
                    });
                }
                Err(violations)
            }
        }
    }
}

fn check_length(out: &mut Vec<FieldViolation>, field: &'static str, value: &str, max: usize) {
    let len = value.chars().count();
    if len == 0 {
        out.push(FieldViolation {
            field,
            message: "is required".to_string(),
        });
    } else if len > max {
        out.push(FieldViolation {
            field,
            message: format!("must be at most {max} characters"),
        });
    }
}

/// Resolved paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    /// Clamp raw page parameters: a number below 1 becomes 1, a size below 1
    /// becomes the default size.
    pub fn resolve(number: i64, size: i64) -> Self {
        let number = if number < 1 {
            DEFAULT_PAGE_NUMBER
        } else {
            u32::try_from(number).unwrap_or(u32::MAX)
        };
        let size = if size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            u32::try_from(size).unwrap_or(u32::MAX)
        };
        Self { number, size }
    }

    pub fn offset(&self) -> usize {
        (self.number as usize).saturating_sub(1).saturating_mul(self.size as usize)
    }

    pub fn limit(&self) -> usize {
        self.size as usize
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE_NUMBER,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub fn to_timestamp(value: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: value.timestamp(),
        nanos: value.timestamp_subsec_nanos() as i32,
    }
}

/// `None` when the timestamp is outside the representable range or carries
/// negative nanos.
pub fn from_timestamp(value: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(value.nanos).ok()?;
    DateTime::<Utc>::from_timestamp(value.seconds, nanos)
}
