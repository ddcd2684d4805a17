//! Discovery of candidate modules from the Go module index.
//!
//! - [`feed`] — the paginated record source ([`feed::FeedSource`]) and its
//!   HTTP implementation against `index.golang.org`.
//! - [`fetcher`] — walks the feed page by page between two timestamps and
//!   returns the deduplicated module paths in first-seen order.

pub mod feed;
pub mod fetcher;
