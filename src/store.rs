//! Quantity-tagged cart and deferred pool.
//!
//! The engine itself only consumes flat unit lists. `SelectionStore` is the
//! object callers hold between requests: it owns the selections, turns them
//! into units and hands them to the engine. It performs no I/O; it is
//! serializable so callers can persist it wherever they like.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::catalog::ContainerCatalog;
use crate::model::Item;
use crate::suggestions::{SuggestionConfig, SuggestionReport, suggest};

/// An item type together with how many units are selected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "item": { "id": "mug", "label": "Mug", "dims": [12.0, 9.0, 10.0], "weight": 0.4 },
    "quantity": 2
}))]
pub struct Selection {
    pub item: Item,
    pub quantity: u32,
}

/// Expands selections into one `Item` per unit, preserving selection order.
pub fn flatten(selections: &[Selection]) -> Vec<Item> {
    selections
        .iter()
        .flat_map(|selection| std::iter::repeat_n(&selection.item, selection.quantity as usize))
        .cloned()
        .collect()
}

/// Cart and deferred pool, both keyed by item id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionStore {
    cart: Vec<Selection>,
    deferred: Vec<Selection>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cart(&self) -> &[Selection] {
        &self.cart
    }

    pub fn deferred(&self) -> &[Selection] {
        &self.deferred
    }

    /// Adds units to the cart, merging with an existing selection of the same id.
    pub fn add_to_cart(&mut self, item: Item, quantity: u32) {
        add(&mut self.cart, item, quantity);
    }

    /// Adds units straight to the deferred pool.
    pub fn add_to_deferred(&mut self, item: Item, quantity: u32) {
        add(&mut self.deferred, item, quantity);
    }

    /// Sets the cart quantity of an item; 0 removes it.
    ///
    /// # Returns
    /// `false` if the item is not in the cart
    pub fn set_cart_quantity(&mut self, item_id: &str, quantity: u32) -> bool {
        set_quantity(&mut self.cart, item_id, quantity)
    }

    /// Sets the deferred quantity of an item; 0 removes it.
    pub fn set_deferred_quantity(&mut self, item_id: &str, quantity: u32) -> bool {
        set_quantity(&mut self.deferred, item_id, quantity)
    }

    /// Removes an item from both the cart and the deferred pool.
    pub fn remove(&mut self, item_id: &str) {
        self.cart.retain(|s| s.item.id != item_id);
        self.deferred.retain(|s| s.item.id != item_id);
    }

    /// Moves up to `quantity` units from the cart into the deferred pool.
    ///
    /// # Returns
    /// Number of units actually moved
    pub fn defer(&mut self, item_id: &str, quantity: u32) -> u32 {
        transfer(&mut self.cart, &mut self.deferred, item_id, quantity)
    }

    /// Moves up to `quantity` units from the deferred pool back into the cart.
    pub fn restore(&mut self, item_id: &str, quantity: u32) -> u32 {
        transfer(&mut self.deferred, &mut self.cart, item_id, quantity)
    }

    /// The cart as one `Item` per unit.
    pub fn cart_units(&self) -> Vec<Item> {
        flatten(&self.cart)
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.deferred.clear();
    }

    /// Packs the cart and evaluates the deferred pool against it.
    pub fn evaluate(
        &self,
        catalog: &ContainerCatalog,
        config: &SuggestionConfig,
    ) -> SuggestionReport {
        suggest(&self.cart_units(), &self.deferred, catalog, config)
    }
}

fn add(selections: &mut Vec<Selection>, item: Item, quantity: u32) {
    if quantity == 0 {
        return;
    }
    match selections.iter_mut().find(|s| s.item.id == item.id) {
        Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
        None => selections.push(Selection { item, quantity }),
    }
}

fn set_quantity(selections: &mut Vec<Selection>, item_id: &str, quantity: u32) -> bool {
    let Some(idx) = selections.iter().position(|s| s.item.id == item_id) else {
        return false;
    };
    if quantity == 0 {
        selections.remove(idx);
    } else {
        selections[idx].quantity = quantity;
    }
    true
}

fn transfer(
    from: &mut Vec<Selection>,
    to: &mut Vec<Selection>,
    item_id: &str,
    quantity: u32,
) -> u32 {
    let Some(idx) = from.iter().position(|s| s.item.id == item_id) else {
        return 0;
    };
    let moved = quantity.min(from[idx].quantity);
    if moved == 0 {
        return 0;
    }

    let item = from[idx].item.clone();
    from[idx].quantity -= moved;
    if from[idx].quantity == 0 {
        from.remove(idx);
    }
    add(to, item, moved);
    moved
}
