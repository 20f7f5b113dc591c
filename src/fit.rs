//! The fit predicate: can one more item go into a box?
//!
//! Packing, folding simulation and the per-item smallest-box lookup all call
//! [`can_add`]; nothing else in the crate decides whether an item fits.

use crate::model::{ContainerType, Item};
use crate::types::{Dimensional, EPSILON_GENERAL};

/// Running totals of a (possibly hypothetical) box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FillState {
    pub volume: f64,
    pub weight: f64,
}

impl FillState {
    /// A freshly opened, empty box.
    pub const EMPTY: Self = Self::new(0.0, 0.0);

    pub const fn new(volume: f64, weight: f64) -> Self {
        Self { volume, weight }
    }

    /// Totals after adding `item`.
    pub fn with(self, item: &Item) -> Self {
        Self::new(self.volume + item.volume(), self.weight + item.weight)
    }
}

/// Checks whether `item` can be added to a box of type `container` whose
/// current totals are `fill`.
///
/// Every axis of the item must be within the same axis of the container (no
/// rotation), and the volume and weight limits must hold after the addition.
///
/// # Examples
/// ```
/// use ecopack::fit::{FillState, can_add};
/// use ecopack::model::{ContainerType, Item};
///
/// let small = ContainerType::new("Small", (25.0, 20.0, 12.0), 6000.0, 5.0, 0.12, 0.05).unwrap();
/// let book = Item::new("book", "Book", (25.0, 18.0, 4.0), 0.8).unwrap();
///
/// assert!(can_add(&book, &small, FillState::EMPTY));
/// assert!(!can_add(&book, &small, FillState::new(5000.0, 0.0)));
/// ```
pub fn can_add(item: &Item, container: &ContainerType, fill: FillState) -> bool {
    let after = fill.with(item);
    item.fits_in(&container.dimensions(), EPSILON_GENERAL)
        && after.volume <= container.volume + EPSILON_GENERAL
        && after.weight <= container.max_weight + EPSILON_GENERAL
}
