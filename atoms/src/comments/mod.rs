pub mod http;
pub mod model;
pub mod service;

pub use model::{Comment, CreateCommentPayload, COMMENTS_COLLECTION};
pub use service::*;
