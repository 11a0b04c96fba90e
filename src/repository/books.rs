//! Book read and delete methods on Repository

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

pub(crate) const BOOK_COLUMNS: &str = "id, name, author, year_published, book_type, status";

impl Repository {
    /// List all books ordered by id
    pub async fn books_list(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get book by ID
    pub async fn books_get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// First book with the given name, if any
    pub async fn books_find_by_name(&self, name: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE name = ? ORDER BY id LIMIT 1",
            BOOK_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    /// First book by id, if any
    pub async fn books_first(&self) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id LIMIT 1",
            BOOK_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    pub async fn books_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete book permanently
    pub async fn books_delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }
}
