//! Unit of work over the books table.
//!
//! Books are staged with [`Session::add`] and [`Session::update`] and nothing
//! touches the database until [`Session::commit`]. A commit validates every
//! staged book first, then writes the whole batch in a single transaction.
//! Any violation rejects the batch and nothing is written.

use std::collections::HashSet;

use sqlx::{Pool, Sqlite, Transaction};
use validator::Validate;

use super::books::BOOK_COLUMNS;
use crate::{
    error::{AppError, AppResult, Violation, ViolationKind, Violations},
    models::book::{Book, BookChange},
};

#[derive(Debug)]
enum Staged {
    Insert(Book),
    Update(Book),
}

impl Staged {
    fn book(&self) -> &Book {
        match self {
            Staged::Insert(book) | Staged::Update(book) => book,
        }
    }
}

/// Pending writes against one database
pub struct Session {
    pool: Pool<Sqlite>,
    staged: Vec<Staged>,
}

impl Session {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            staged: Vec::new(),
        }
    }

    /// Stage a transient book for insertion
    pub fn add(&mut self, book: Book) {
        tracing::debug!("Staging insert of book name={:?}", book.name);
        self.staged.push(Staged::Insert(book));
    }

    /// Change a persisted book in memory and stage its new state.
    ///
    /// Staging the same book twice keeps only the latest state.
    pub fn update(&mut self, book: &mut Book, change: BookChange) -> AppResult<()> {
        let id = book.id.ok_or(AppError::NotPersisted)?;
        book.apply(change);
        self.staged
            .retain(|op| !matches!(op, Staged::Update(staged) if staged.id == Some(id)));
        tracing::debug!("Staging update of book id={}", id);
        self.staged.push(Staged::Update(book.clone()));
        Ok(())
    }

    /// Number of staged operations
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    /// Drop all staged operations without writing
    pub fn rollback(&mut self) {
        if !self.staged.is_empty() {
            tracing::debug!("Discarding {} staged operation(s)", self.staged.len());
        }
        self.staged.clear();
    }

    /// Validate and write every staged book in one transaction.
    ///
    /// Returns the books as stored, with ids assigned to new ones. The staged
    /// batch is consumed whether or not the commit succeeds.
    pub async fn commit(&mut self) -> AppResult<Vec<Book>> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(Vec::new());
        }

        let violations = check_batch(&staged);
        if !violations.is_empty() {
            tracing::warn!("Commit rejected: {}", violations);
            return Err(AppError::Constraint(violations));
        }

        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(staged.len());
        for op in staged {
            // Dropping `tx` on error rolls the transaction back.
            let book = match op {
                Staged::Insert(book) => insert(&mut tx, &book).await?,
                Staged::Update(book) => update(&mut tx, &book).await?,
            };
            written.push(book);
        }
        tx.commit().await?;

        tracing::info!("Committed {} book(s)", written.len());
        Ok(written)
    }
}

fn check_batch(staged: &[Staged]) -> Violations {
    let mut violations = Violations::default();
    let mut names = HashSet::new();
    for op in staged {
        let book = op.book();
        if let Err(errors) = book.validate() {
            violations.extend_from_validation(&errors);
        }
        if !names.insert(book.name.as_str()) {
            violations.push(Violation::new("name", ViolationKind::Unique));
        }
    }
    violations
}

async fn insert(tx: &mut Transaction<'_, Sqlite>, book: &Book) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(&format!(
        r#"
        INSERT INTO books (name, author, year_published, book_type, status)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        BOOK_COLUMNS
    ))
    .bind(&book.name)
    .bind(&book.author)
    .bind(book.year_published.as_integer())
    .bind(&book.book_type)
    .bind(&book.status)
    .fetch_one(&mut **tx)
    .await
    .map_err(storage_error)
}

async fn update(tx: &mut Transaction<'_, Sqlite>, book: &Book) -> AppResult<Book> {
    let id = book.id.ok_or(AppError::NotPersisted)?;
    sqlx::query_as::<_, Book>(&format!(
        r#"
        UPDATE books
        SET name = ?, author = ?, year_published = ?, book_type = ?, status = ?
        WHERE id = ?
        RETURNING {}
        "#,
        BOOK_COLUMNS
    ))
    .bind(&book.name)
    .bind(&book.author)
    .bind(book.year_published.as_integer())
    .bind(&book.book_type)
    .bind(&book.status)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(storage_error)?
    .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
}

/// Map constraint errors raised by SQLite onto commit violations.
fn storage_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.message().starts_with("UNIQUE constraint failed") {
            // "UNIQUE constraint failed: books.name"
            let field = db
                .message()
                .rsplit('.')
                .next()
                .unwrap_or("name")
                .trim()
                .to_string();
            return AppError::Constraint(Violations::single(field, ViolationKind::Unique));
        }
        if db.is_check_violation() {
            return AppError::Constraint(Violations::single("books", ViolationKind::Check));
        }
    }
    AppError::Database(err)
}
