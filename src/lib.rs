//! Quillpost - A blog and CMS backend
//!
//! Posts, categories, topic hubs and authors with SEO metadata and JSON-LD,
//! an RSS feed, visitor tracking, media uploads with optional S3-compatible
//! storage, and the pagination, table sorting and ad-block popup engines the
//! front end renders from.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
