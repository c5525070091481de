//! Data models
//!
//! Database entities, request inputs and shared paging types.

mod author;
mod category;
mod hub;
mod list;
mod media;
mod post;
mod session;
mod user;
mod visit;

pub use author::{Author, CreateAuthorInput, UpdateAuthorInput};
pub use category::{
    Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput, DEFAULT_CATEGORY_SLUG,
};
pub use hub::{CreateHubInput, Hub, UpdateHubInput};
pub use list::{ListParams, PagedResult};
pub use media::{Media, MediaLocation, NewMedia};
pub use post::{
    ComparisonTable, CreatePostInput, Faq, Post, PostSeo, PostStatus, UpdatePostInput,
};
pub use session::Session;
pub use user::{CreateUserInput, User, UserRole};
pub use visit::{PageCount, Visit, VisitStats};
