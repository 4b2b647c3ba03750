//! Domain services composing the query layer.

mod comments;
mod news;

pub use comments::CommentService;
pub use news::{Audience, NewsService};
