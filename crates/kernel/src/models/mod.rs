//! Persistence models.

mod article;
mod comment;

pub use article::{Article, CreateArticle, UpdateArticle};
pub use comment::{Comment, CreateComment};
