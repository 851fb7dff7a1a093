//! Borrow cart: equipment staged by a user before submitting requests

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::equipment::Equipment;

/// Equipment snapshot kept in a cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartEquipment {
    pub id: i32,
    pub name: String,
    pub category: String,
    /// Last known available units
    pub available_quantity: i32,
}

impl From<&Equipment> for CartEquipment {
    fn from(e: &Equipment) -> Self {
        Self {
            id: e.id,
            name: e.name.clone(),
            category: e.category.clone(),
            available_quantity: e.available_quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub equipment: CartEquipment,
    pub quantity: i32,
}

/// Ordered list of cart lines, one per equipment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_units(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn line(&self, equipment_id: i32) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.equipment.id == equipment_id)
    }

    /// Add units, merging with an existing line.
    ///
    /// The snapshot is replaced by `equipment` and the line quantity is
    /// capped at its available units. Returns the resulting quantity.
    pub fn add(&mut self, equipment: CartEquipment, quantity: i32) -> AppResult<i32> {
        if quantity < 1 {
            return Err(AppError::Validation("Quantity must be at least 1".to_string()));
        }
        if equipment.available_quantity < 1 {
            return Err(AppError::BusinessRule(format!(
                "{} is not available",
                equipment.name
            )));
        }

        let cap = equipment.available_quantity;
        match self.lines.iter_mut().find(|l| l.equipment.id == equipment.id) {
            Some(line) => {
                line.quantity = (line.quantity + quantity).min(cap);
                line.equipment = equipment;
                Ok(line.quantity)
            }
            None => {
                let quantity = quantity.min(cap);
                self.lines.push(CartLine { equipment, quantity });
                Ok(quantity)
            }
        }
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// Returns the stored quantity, or `None` if the line was removed.
    pub fn set_quantity(&mut self, equipment_id: i32, quantity: i32) -> AppResult<Option<i32>> {
        if quantity <= 0 {
            return if self.remove(equipment_id) {
                Ok(None)
            } else {
                Err(not_in_cart(equipment_id))
            };
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.equipment.id == equipment_id)
            .ok_or_else(|| not_in_cart(equipment_id))?;
        line.quantity = quantity.min(line.equipment.available_quantity).max(1);
        Ok(Some(line.quantity))
    }

    /// Remove a line; returns whether it was present
    pub fn remove(&mut self, equipment_id: i32) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.equipment.id != equipment_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Keep only the lines whose equipment is listed in `failed`.
    ///
    /// Applied after a submission: an empty `failed` leaves an empty cart.
    pub fn retain_failed(&mut self, failed: &[i32]) {
        self.lines.retain(|l| failed.contains(&l.equipment.id));
    }
}

fn not_in_cart(equipment_id: i32) -> AppError {
    AppError::NotFound(format!("Equipment {} is not in the cart", equipment_id))
}

/// Add to cart request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItem {
    pub equipment_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Change quantity request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItem {
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(available: i32) -> CartEquipment {
        CartEquipment {
            id: 1,
            name: "Camera".to_string(),
            category: "Photo".to_string(),
            available_quantity: available,
        }
    }

    fn tripod() -> CartEquipment {
        CartEquipment {
            id: 2,
            name: "Tripod".to_string(),
            category: "Photo".to_string(),
            available_quantity: 4,
        }
    }

    #[test]
    fn test_add_merges_and_caps() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(camera(3), 2).unwrap(), 2);
        assert_eq!(cart.add(camera(3), 2).unwrap(), 3);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.add(tripod(), 1).unwrap(), 1);
        assert_eq!(cart.total_units(), 4);
    }

    #[test]
    fn test_add_uses_fresh_availability() {
        let mut cart = Cart::default();
        cart.add(camera(5), 4).unwrap();
        // someone else's request was approved meanwhile
        assert_eq!(cart.add(camera(2), 1).unwrap(), 2);
        assert_eq!(cart.line(1).unwrap().equipment.available_quantity, 2);
    }

    #[test]
    fn test_add_unavailable_rejected() {
        let mut cart = Cart::default();
        assert!(matches!(cart.add(camera(0), 1), Err(AppError::BusinessRule(_))));
        assert!(cart.add(camera(2), 0).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::default();
        cart.add(camera(3), 1).unwrap();
        assert_eq!(cart.set_quantity(1, 10).unwrap(), Some(3));
        assert_eq!(cart.set_quantity(1, 0).unwrap(), None);
        assert!(cart.is_empty());
        assert!(matches!(cart.set_quantity(1, 1), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_never_exceeds_available() {
        let mut cart = Cart::default();
        for n in 1..6 {
            cart.add(camera(3), n).unwrap();
            let _ = cart.set_quantity(1, n * 2);
            let line = cart.line(1).unwrap();
            assert!(line.quantity <= line.equipment.available_quantity);
        }
    }

    #[test]
    fn test_retain_failed_after_full_success_empties_cart() {
        let mut cart = Cart::default();
        cart.add(camera(3), 1).unwrap();
        cart.add(tripod(), 2).unwrap();
        cart.retain_failed(&[]);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_retain_failed_keeps_exactly_failed_lines() {
        let mut cart = Cart::default();
        cart.add(camera(3), 1).unwrap();
        cart.add(tripod(), 2).unwrap();
        cart.retain_failed(&[2]);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].equipment.id, 2);
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[test]
    fn test_serialized_as_array() {
        let mut cart = Cart::default();
        cart.add(tripod(), 2).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["quantity"], 2);
        assert_eq!(json[0]["equipment"]["name"], "Tripod");
    }
}
