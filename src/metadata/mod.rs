//! Best-effort metadata lookups
//!
//! - [`TitleResolver`]: display title for a single locator, never fails
//! - [`CollectionResolver`]: entries of a collection locator

mod collection;
mod title;

pub use collection::{
    CollectionEntry, CollectionListing, CollectionResolver, UNKNOWN_COLLECTION,
    YtDlpCollectionResolver,
};
pub use title::{HttpTitleResolver, TitleResolver, extract_title};
