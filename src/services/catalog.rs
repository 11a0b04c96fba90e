//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books, optionally restricted to an exact name
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        match query.name {
            Some(ref name) => {
                let books: Vec<Book> = self
                    .repository
                    .books_find_by_name(name)
                    .await?
                    .into_iter()
                    .collect();
                let total = books.len() as i64;
                Ok((books, total))
            }
            None => {
                let books = self.repository.books_list().await?;
                let total = self.repository.books_count().await?;
                Ok((books, total))
            }
        }
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books_get_by_id(id).await
    }

    /// Create a book; limits and name uniqueness are checked on commit
    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        let book = Book::try_from(data)?;
        let mut session = self.repository.session();
        session.add(book);
        let created = session
            .commit()
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Commit returned no book".to_string()))?;
        tracing::info!("Catalog create: book id={:?} name={:?}", created.id, created.name);
        Ok(created)
    }

    /// Apply every provided field and commit them together
    pub async fn update_book(&self, id: i64, data: UpdateBook) -> AppResult<Book> {
        let mut book = self.repository.books_get_by_id(id).await?;
        let changes = data.into_changes()?;
        if changes.is_empty() {
            return Ok(book);
        }

        let mut session = self.repository.session();
        for change in changes {
            session.update(&mut book, change)?;
        }
        let updated = session.commit().await?.pop().unwrap_or(book);
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.repository.books_delete(id).await
    }

    /// Check that the database answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
