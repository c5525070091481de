//! Database repositories
//!
//! One repository per entity, each a trait plus its SQLite implementation.

pub mod author;
pub mod category;
pub mod hub;
pub mod media;
pub mod post;
pub mod session;
pub mod settings;
pub mod user;
pub mod visit;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use hub::{HubRepository, SqlxHubRepository};
pub use media::{MediaRepository, SqlxMediaRepository};
pub use post::{PostFilter, PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{SettingsRepository, SqlxSettingsRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use visit::{SqlxVisitRepository, VisitRepository};
