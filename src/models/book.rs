//! Book model and request types.
//!
//! A [`Book`] can be built with any field values; limits are only checked when
//! a session commits it (see [`crate::repository::session`]).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{Violation, ViolationKind, Violations};

/// Status given to every new book
pub const STATUS_AVAILABLE: &str = "available";

/// Publication year as supplied by the caller.
///
/// Untyped input that is not an integer is kept as `Raw` so construction never
/// fails; commit rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum YearPublished {
    Integer(i64),
    Raw(String),
}

impl YearPublished {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            YearPublished::Integer(year) => Some(*year),
            YearPublished::Raw(_) => None,
        }
    }
}

impl From<i64> for YearPublished {
    fn from(year: i64) -> Self {
        YearPublished::Integer(year)
    }
}

impl From<i32> for YearPublished {
    fn from(year: i32) -> Self {
        YearPublished::Integer(i64::from(year))
    }
}

impl From<&str> for YearPublished {
    fn from(raw: &str) -> Self {
        YearPublished::Raw(raw.to_string())
    }
}

impl From<String> for YearPublished {
    fn from(raw: String) -> Self {
        YearPublished::Raw(raw)
    }
}

impl<'de> Deserialize<'de> for YearPublished {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde_json::Value;

        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(n) => n
                .as_i64()
                .map(YearPublished::Integer)
                .unwrap_or_else(|| YearPublished::Raw(n.to_string())),
            Value::String(s) => YearPublished::Raw(s),
            other => YearPublished::Raw(other.to_string()),
        })
    }
}

impl fmt::Display for YearPublished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearPublished::Integer(year) => write!(f, "{}", year),
            YearPublished::Raw(raw) => f.write_str(raw),
        }
    }
}

fn validate_year(year: &YearPublished) -> Result<(), ValidationError> {
    match year {
        YearPublished::Integer(_) => Ok(()),
        YearPublished::Raw(_) => Err(ValidationError::new("integer")),
    }
}

/// Book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate, ToSchema)]
pub struct Book {
    /// Assigned by the store on first commit; `None` while transient
    pub id: Option<i64>,
    /// Unique title
    #[validate(length(max = 64))]
    pub name: String,
    #[validate(length(max = 64))]
    pub author: String,
    #[validate(custom(function = "validate_year"))]
    #[schema(value_type = i64)]
    pub year_published: YearPublished,
    #[validate(length(max = 20))]
    pub book_type: String,
    /// e.g. `available`, `checked out`
    pub status: String,
}

impl Book {
    /// Build a transient book with the default status
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        year_published: impl Into<YearPublished>,
        book_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            author: author.into(),
            year_published: year_published.into(),
            book_type: book_type.into(),
            status: STATUS_AVAILABLE.to_string(),
        }
    }

    /// Apply a field change in memory
    pub fn apply(&mut self, change: BookChange) {
        match change {
            BookChange::Name(v) => self.name = v,
            BookChange::Author(v) => self.author = v,
            BookChange::YearPublished(v) => self.year_published = v,
            BookChange::BookType(v) => self.book_type = v,
            BookChange::Status(v) => self.status = v,
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Book(ID: ")?;
        match self.id {
            Some(id) => write!(f, "{}", id)?,
            None => f.write_str("None")?,
        }
        write!(
            f,
            ", Name: {}, Author: {}, Year Published: {}, Type: {}, Status: {})",
            self.name, self.author, self.year_published, self.book_type, self.status
        )
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            author: row.try_get("author")?,
            year_published: YearPublished::Integer(row.try_get("year_published")?),
            book_type: row.try_get("book_type")?,
            status: row.try_get("status")?,
        })
    }
}

/// A single field assignment on a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookChange {
    Name(String),
    Author(String),
    YearPublished(YearPublished),
    BookType(String),
    Status(String),
}

/// Create book request.
///
/// Required fields are optional here so that a missing or `null` value is
/// reported as a violation instead of a deserialization failure.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateBook {
    #[schema(value_type = String)]
    pub name: Option<String>,
    #[schema(value_type = String)]
    pub author: Option<String>,
    #[schema(value_type = i64)]
    pub year_published: Option<YearPublished>,
    #[schema(value_type = String)]
    pub book_type: Option<String>,
    /// Defaults to `available`
    pub status: Option<String>,
}

impl TryFrom<CreateBook> for Book {
    type Error = Violations;

    fn try_from(data: CreateBook) -> Result<Self, Self::Error> {
        let mut violations = Violations::default();
        let mut required = |value: Option<String>, field: &str| {
            value.unwrap_or_else(|| {
                violations.push(Violation::new(field, ViolationKind::Required));
                String::new()
            })
        };
        let name = required(data.name, "name");
        let author = required(data.author, "author");
        let book_type = required(data.book_type, "book_type");
        let year_published = data.year_published.unwrap_or_else(|| {
            violations.push(Violation::new("year_published", ViolationKind::Required));
            YearPublished::Raw(String::new())
        });
        if !violations.is_empty() {
            return Err(violations);
        }

        let mut book = Book::new(name, author, year_published, book_type);
        if let Some(status) = data.status {
            book.status = status;
        }
        Ok(book)
    }
}

/// Keeps an explicit `null` apart from an absent field: absent stays `None`,
/// `null` becomes `Some(None)`.
fn explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `null` goes through [`YearPublished`]'s own deserializer and ends up `Raw`.
fn present<'de, D>(deserializer: D) -> Result<Option<YearPublished>, D::Error>
where
    D: Deserializer<'de>,
{
    YearPublished::deserialize(deserializer).map(Some)
}

/// Update book request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "explicit")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    #[schema(value_type = Option<String>)]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub year_published: Option<YearPublished>,
    #[serde(default, deserialize_with = "explicit")]
    #[schema(value_type = Option<String>)]
    pub book_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    #[schema(value_type = Option<String>)]
    pub status: Option<Option<String>>,
}

impl UpdateBook {
    /// Field changes in request order, or the fields explicitly set to `null`
    pub fn into_changes(self) -> Result<Vec<BookChange>, Violations> {
        let mut changes = Vec::new();
        let mut violations = Violations::default();
        let mut text =
            |value: Option<Option<String>>, field: &str, change: fn(String) -> BookChange| {
                match value {
                    Some(Some(v)) => changes.push(change(v)),
                    Some(None) => {
                        violations.push(Violation::new(field, ViolationKind::Required))
                    }
                    None => {}
                }
            };
        text(self.name, "name", BookChange::Name);
        text(self.author, "author", BookChange::Author);
        text(self.book_type, "book_type", BookChange::BookType);
        text(self.status, "status", BookChange::Status);
        if let Some(v) = self.year_published {
            changes.push(BookChange::YearPublished(v));
        }

        if violations.is_empty() {
            Ok(changes)
        } else {
            Err(violations)
        }
    }
}

/// Book list query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact name match
    pub name: Option<String>,
}
