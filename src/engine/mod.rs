//! Extraction engine
//!
//! Turns declarative field rules into fully populated records:
//! - `query`: selector query surface and element snapshots
//! - `rules`: field rules, fallback strategies, transforms
//! - `extract`: first-match-wins extractor
//! - `normalize`: Korean count parsing and text cleanup

pub mod extract;
pub mod normalize;
pub mod query;
pub mod rules;

pub use extract::Extractor;
pub use normalize::{clean_text, cut_text, parse_count, truncate_text};
pub use query::{ElementSnapshot, PageQuery};
pub use rules::{Accessor, FieldRule, ListRule, Strategy, Transform};
