//! FragStore - file-backed fragment library
//!
//! Stores reusable prompt fragments as plain markdown files, one directory
//! per category, so they can be edited with any editor and versioned with
//! the rest of a prompt library.
//!
//! # Layout
//!
//! ```text
//! fragments/
//! └── {category}/
//!     ├── {name}.md
//!     ├── {name}.md
//!     └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fragstore::FragmentStore;
//!
//! let store = FragmentStore::open("fragments").await?;
//! store.add("prompt_engineering", "behavior_attributes", "...").await?;
//! let body = store.content("prompt_engineering", "behavior_attributes").await?;
//! ```

mod store;

pub use store::{FragmentRef, FragmentStore};

/// File extension for fragment bodies
pub const FRAGMENT_EXT: &str = "md";
