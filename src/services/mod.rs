//! Services layer - Business logic
//!
//! Domain services coordinate repositories and the cache; the pure engines
//! (pagination, table sorting, schema/SEO builders, ad-block popup) do no I/O.

pub mod adblock;
pub mod author;
pub mod category;
pub mod feed;
pub mod hub;
pub mod markdown;
pub mod media;
pub mod pagination;
pub mod password;
pub mod post;
pub mod schema;
pub mod seo;
pub mod settings;
pub mod slug;
pub mod storage;
pub mod table;
pub mod tracking;
pub mod user;

pub use adblock::{AdBlockPopup, AdBlockWatcher, BaitDetector, Detector, PopupEvent, PopupState};
pub use author::{AuthorService, AuthorServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use feed::{FeedError, FeedService};
pub use hub::{HubService, HubServiceError};
pub use markdown::MarkdownRenderer;
pub use media::{MediaService, MediaServiceError};
pub use pagination::{compute_page_window, PageMarker, PaginationView};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use settings::{SettingsService, SettingsServiceError, SiteSettings};
pub use slug::generate_slug;
pub use storage::{ObjectStore, S3ObjectStore, UploadHelper};
pub use table::{sort_rows, SortDirection, SortState, TableRow};
pub use tracking::{BeaconSender, TrackEvent, TrackingError, TrackingService};
pub use user::{LoginInput, UserService, UserServiceError};
