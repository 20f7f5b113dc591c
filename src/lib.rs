//! Sustainable shipping-box packing.
//!
//! Packs a cart of items into as few and as small catalog boxes as possible,
//! reports packaging efficiency and carbon impact, and suggests which deferred
//! items could ride along in boxes the cart already needs.
//!
//! ```
//! use ecopack::catalog::ContainerCatalog;
//! use ecopack::metrics::Metrics;
//! use ecopack::model::Item;
//! use ecopack::optimizer::pack_items;
//!
//! let catalog = ContainerCatalog::builtin();
//! let items = vec![
//!     Item::new("book", "Book", (25.0, 18.0, 4.0), 0.8).unwrap(),
//!     Item::new("mug", "Mug", (12.0, 9.0, 10.0), 0.4).unwrap(),
//! ];
//!
//! let result = pack_items(&items, &catalog);
//! let metrics = Metrics::for_result(&result, &items, &catalog);
//! assert_eq!(metrics.breakdown_label(), "1x Small");
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod consolidation;
pub mod fit;
pub mod metrics;
pub mod model;
pub mod optimizer;
pub mod store;
pub mod suggestions;
pub mod types;

pub use catalog::{CatalogError, ContainerCatalog};
pub use model::{ContainerType, Item, PackedContainer, ValidationError};
pub use optimizer::{PackingResult, pack_items};
pub use suggestions::{Suggestion, SuggestionConfig, suggest};
