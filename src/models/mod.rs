//! Data models for the book library

pub mod book;

pub use book::{Book, BookChange, BookQuery, CreateBook, UpdateBook, YearPublished, STATUS_AVAILABLE};
