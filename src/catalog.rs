//! Fixed, ordered catalog of shipping box types.
//!
//! The catalog sorts itself once at construction. Every component asks it for
//! the ascending (smallest first) or descending view instead of sorting on its
//! own, so ties are broken the same way everywhere.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::fit::{FillState, can_add};
use crate::model::{ContainerType, Item, ValidationError};

/// Errors raised while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog must contain at least one container type")]
    Empty,

    #[error("Duplicate container type name: {0}")]
    DuplicateName(String),

    #[error("Invalid container type '{name}': {source}")]
    Invalid {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("Could not read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The ordered set of container types the engine may open.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerCatalog {
    entries: Vec<ContainerType>,
    ascending: Vec<usize>,
    descending: Vec<usize>,
}

impl ContainerCatalog {
    /// Builds a catalog from validated or unvalidated entries.
    ///
    /// Entries keep their definition order in [`entries`](Self::entries);
    /// the size-ordered views are computed here once.
    pub fn new(entries: Vec<ContainerType>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            entry.validate().map_err(|source| CatalogError::Invalid {
                name: entry.name.clone(),
                source,
            })?;
            if !seen.insert(entry.name.as_str()) {
                return Err(CatalogError::DuplicateName(entry.name.clone()));
            }
        }

        Ok(Self::index(entries))
    }

    /// Parses a JSON array of container types.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let entries: Vec<ContainerType> = serde_json::from_str(raw)?;
        Self::new(entries)
    }

    /// Loads a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        debug!(
            "Loaded {} container types from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// The four standard shipping boxes.
    pub fn builtin() -> Self {
        fn entry(
            name: &str,
            dims: (f64, f64, f64),
            volume: f64,
            max_weight: f64,
            fixed_carbon: f64,
            carbon_per_kg: f64,
        ) -> ContainerType {
            ContainerType {
                name: name.to_string(),
                dims,
                volume,
                max_weight,
                fixed_carbon,
                carbon_per_kg,
            }
        }

        Self::index(vec![
            entry("Small", (25.0, 20.0, 12.0), 6000.0, 5.0, 0.12, 0.05),
            entry("Medium", (35.0, 25.0, 15.0), 13125.0, 10.0, 0.18, 0.05),
            entry("Large", (45.0, 35.0, 20.0), 31500.0, 15.0, 0.27, 0.06),
            entry("XLarge", (60.0, 40.0, 30.0), 72000.0, 22.0, 0.42, 0.07),
        ])
    }

    fn index(entries: Vec<ContainerType>) -> Self {
        let by_size = |a: &ContainerType, b: &ContainerType| {
            a.volume
                .partial_cmp(&b.volume)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    a.max_weight
                        .partial_cmp(&b.max_weight)
                        .unwrap_or(Ordering::Equal)
                })
        };

        let mut ascending: Vec<usize> = (0..entries.len()).collect();
        ascending.sort_by(|&a, &b| by_size(&entries[a], &entries[b]));

        let mut descending: Vec<usize> = (0..entries.len()).collect();
        descending.sort_by(|&a, &b| by_size(&entries[b], &entries[a]));

        Self {
            entries,
            ascending,
            descending,
        }
    }

    /// Entries in definition order.
    pub fn entries(&self) -> &[ContainerType] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered smallest volume first.
    pub fn ascending(&self) -> impl Iterator<Item = &ContainerType> + '_ {
        self.ascending.iter().map(|&idx| &self.entries[idx])
    }

    /// Entries ordered largest volume first.
    pub fn descending(&self) -> impl Iterator<Item = &ContainerType> + '_ {
        self.descending.iter().map(|&idx| &self.entries[idx])
    }

    /// The largest container type.
    pub fn largest(&self) -> Option<&ContainerType> {
        self.descending().next()
    }

    /// Smallest container type that can hold `item` on its own.
    pub fn smallest_fitting(&self, item: &Item) -> Option<&ContainerType> {
        self.ascending()
            .find(|container| can_add(item, container, FillState::EMPTY))
    }
}

impl Default for ContainerCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
