//! Data models for the packing engine.
//!
//! This module defines the fundamental data structures:
//! - `Item`: One physical unit to be shipped, with dimensions and weight
//! - `ContainerType`: An immutable catalog entry describing a shipping box
//! - `PackedContainer`: A box of some `ContainerType` with the items assigned to it
//!
//! Catalog entries are never mutated. A `PackedContainer` embeds a read-only
//! copy of its type and keeps its fill totals in sync with its item list.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::fit::{FillState, can_add};
use crate::types::{Dimensional, Vec3, validation};

/// Validation error for item and container data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
    #[error("Invalid carbon cost: {0}")]
    InvalidCarbonCost(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

fn validate_identifier(value: &str, what: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidIdentifier(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

/// Represents a single physical unit to be packed.
///
/// Quantities are tracked outside the engine; a list of `Item`s always holds
/// one element per unit.
///
/// # Fields
/// * `id` - Identifier of the item type (shared by all units of that type)
/// * `label` - Display label
/// * `dims` - Dimensions (length, width, height) in cm
/// * `weight` - Weight in kg
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "book",
    "label": "Book",
    "dims": [25.0, 18.0, 4.0],
    "weight": 0.8
}))]
pub struct Item {
    pub id: String,
    pub label: String,
    #[schema(value_type = [f64; 3], example = json!([25.0, 18.0, 4.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
}

impl Item {
    /// Creates a new item with validation.
    ///
    /// # Examples
    /// ```
    /// use ecopack::model::Item;
    ///
    /// let book = Item::new("book", "Book", (25.0, 18.0, 4.0), 0.8);
    /// assert!(book.is_ok());
    ///
    /// let broken = Item::new("book", "Book", (-25.0, 18.0, 4.0), 0.8);
    /// assert!(broken.is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        dims: (f64, f64, f64),
        weight: f64,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id: id.into(),
            label: label.into(),
            dims,
            weight,
        };
        item.validate()?;
        Ok(item)
    }

    /// Re-checks a record that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.id, "Item id")?;
        validation::validate_dimensions_3d(self.dims)?;
        validation::validate_weight(self.weight)?;
        Ok(())
    }

    /// Volume of the item, always derived from the current dimensions.
    pub fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

/// Template for a shipping box in the catalog.
///
/// `volume` is given explicitly rather than derived from `dims`, so a catalog
/// may state a usable interior volume that differs from the bounding cuboid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Small",
    "dims": [25.0, 20.0, 12.0],
    "volume": 6000.0,
    "max_weight": 5.0,
    "fixed_carbon": 0.12,
    "carbon_per_kg": 0.05
}))]
pub struct ContainerType {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([25.0, 20.0, 12.0]))]
    pub dims: (f64, f64, f64),
    /// Maximum interior volume in cm³.
    pub volume: f64,
    /// Maximum total weight in kg.
    pub max_weight: f64,
    /// kg CO2e incurred once per box shipped.
    pub fixed_carbon: f64,
    /// kg CO2e incurred per kg packed into the box.
    pub carbon_per_kg: f64,
}

impl ContainerType {
    /// Creates a new container type after validating the parameters.
    pub fn new(
        name: impl Into<String>,
        dims: (f64, f64, f64),
        volume: f64,
        max_weight: f64,
        fixed_carbon: f64,
        carbon_per_kg: f64,
    ) -> Result<Self, ValidationError> {
        let container = Self {
            name: name.into(),
            dims,
            volume,
            max_weight,
            fixed_carbon,
            carbon_per_kg,
        };
        container.validate()?;
        Ok(container)
    }

    /// Re-checks a record that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.name, "Container name")?;
        validation::validate_dimensions_3d(self.dims)?;
        if self.volume <= 0.0 || !self.volume.is_finite() {
            return Err(ValidationError::InvalidVolume(format!(
                "Container volume must be positive, got: {}",
                self.volume
            )));
        }
        validation::validate_weight(self.max_weight)?;
        validation::validate_carbon(self.fixed_carbon, "Fixed carbon")?;
        validation::validate_carbon(self.carbon_per_kg, "Carbon per kg")?;
        Ok(())
    }

    /// Carbon cost of shipping this box with `weight` kg inside.
    pub fn carbon_for(&self, weight: f64) -> f64 {
        self.fixed_carbon + weight * self.carbon_per_kg
    }
}

impl Dimensional for ContainerType {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

/// A box of a given type together with the items assigned to it.
///
/// `filled_volume` and `total_weight` are recomputed from `items` after every
/// append and cannot be set independently.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackedContainer {
    container: ContainerType,
    items: Vec<Item>,
    filled_volume: f64,
    total_weight: f64,
}

impl PackedContainer {
    /// Opens an empty box of the given type.
    pub fn new(container: ContainerType) -> Self {
        Self {
            container,
            items: Vec::new(),
            filled_volume: 0.0,
            total_weight: 0.0,
        }
    }

    /// The container type this box was opened from.
    pub fn container(&self) -> &ContainerType {
        &self.container
    }

    /// Items in the order they were assigned.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn filled_volume(&self) -> f64 {
        self.filled_volume
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Current fill totals, for feeding the fit predicate.
    pub fn fill_state(&self) -> FillState {
        FillState::new(self.filled_volume, self.total_weight)
    }

    /// Fill percentage (0.0 to 100.0) of this box.
    pub fn fill_percent(&self) -> f64 {
        (self.filled_volume / self.container.volume) * 100.0
    }

    /// Fill percentage this box would reach after adding `item`.
    pub fn fill_percent_with(&self, item: &Item) -> f64 {
        ((self.filled_volume + item.volume()) / self.container.volume) * 100.0
    }

    /// Checks whether `item` can be added given the current fill.
    pub fn can_accept(&self, item: &Item) -> bool {
        can_add(item, &self.container, self.fill_state())
    }

    /// Adds `item` if the fit predicate allows it.
    ///
    /// # Returns
    /// `true` if the item was appended, `false` if the box was left unchanged
    pub fn try_add(&mut self, item: &Item) -> bool {
        if !self.can_accept(item) {
            return false;
        }
        self.items.push(item.clone());
        self.recompute_totals();
        true
    }

    fn recompute_totals(&mut self) {
        self.filled_volume = self.items.iter().map(Item::volume).sum();
        self.total_weight = self.items.iter().map(|item| item.weight).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ContainerType {
        ContainerType::new("Small", (25.0, 20.0, 12.0), 6000.0, 5.0, 0.12, 0.05).unwrap()
    }

    #[test]
    fn item_volume_follows_dimensions() {
        let mut item = Item::new("mug", "Mug", (12.0, 9.0, 10.0), 0.4).unwrap();
        assert_eq!(item.volume(), 1080.0);
        item.dims = (12.0, 9.0, 5.0);
        assert_eq!(item.volume(), 540.0);
    }

    #[test]
    fn item_rejects_invalid_values() {
        assert!(matches!(
            Item::new("x", "X", (0.0, 1.0, 1.0), 1.0),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            Item::new("x", "X", (1.0, 1.0, 1.0), 0.0),
            Err(ValidationError::InvalidWeight(_))
        ));
        assert!(matches!(
            Item::new("  ", "X", (1.0, 1.0, 1.0), 1.0),
            Err(ValidationError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn container_type_rejects_invalid_values() {
        assert!(ContainerType::new("S", (1.0, 1.0, 1.0), 0.0, 1.0, 0.0, 0.0).is_err());
        assert!(ContainerType::new("S", (1.0, 1.0, 1.0), 1.0, 0.0, 0.0, 0.0).is_err());
        assert!(ContainerType::new("S", (1.0, 1.0, 1.0), 1.0, 1.0, -0.1, 0.0).is_err());
        assert!(ContainerType::new("S", (1.0, 1.0, 1.0), 1.0, 1.0, 0.0, -0.1).is_err());
        assert!(ContainerType::new("S", (1.0, 1.0, 1.0), 1.0, 1.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn packed_container_totals_track_items() {
        let mut packed = PackedContainer::new(small());
        let book = Item::new("book", "Book", (25.0, 18.0, 4.0), 0.8).unwrap();
        let mug = Item::new("mug", "Mug", (12.0, 9.0, 10.0), 0.4).unwrap();

        assert!(packed.try_add(&book));
        assert!(packed.try_add(&mug));
        assert_eq!(packed.items().len(), 2);
        assert!((packed.filled_volume() - 2880.0).abs() < 1e-9);
        assert!((packed.total_weight() - 1.2).abs() < 1e-9);
        assert!((packed.fill_percent() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn packed_container_refuses_overweight_item() {
        let mut packed = PackedContainer::new(small());
        let brick = Item::new("brick", "Brick", (10.0, 10.0, 10.0), 4.0).unwrap();

        assert!(packed.try_add(&brick));
        assert!(!packed.try_add(&brick));
        assert_eq!(packed.items().len(), 1);
        assert!((packed.total_weight() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn opening_a_box_leaves_the_catalog_entry_untouched() {
        let template = small();
        let mut packed = PackedContainer::new(template.clone());
        let mug = Item::new("mug", "Mug", (12.0, 9.0, 10.0), 0.4).unwrap();
        packed.try_add(&mug);

        assert_eq!(packed.container(), &template);
        assert_eq!(template, small());
    }

    #[test]
    fn carbon_for_combines_fixed_and_weight_cost() {
        let container = small();
        assert!((container.carbon_for(2.0) - (0.12 + 0.1)).abs() < 1e-9);
    }
}
