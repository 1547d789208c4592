//! Application services sitting between the HTTP layer and the stores.

pub mod post;
pub mod user;

pub use post::{CreatePost, PostService, UpdatePost};
pub use user::{CreateUser, UpdateUser, UserService};
