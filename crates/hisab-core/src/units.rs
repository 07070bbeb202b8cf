//! # Unit Conversion
//!
//! Converts between a product's units and its base unit.
//!
//! ```text
//! Product "Cola 330ml", base unit = bottle
//!   bottle  factor 1
//!   pack    factor 6
//!   carton  factor 24
//!
//! to_base(2 carton)   = 48 bottles
//! split(50 bottles, carton) = 2 carton + 2 bottles
//! ```
//!
//! Factors are positive integers, so conversion to base is exact. Going
//! the other way can leave a remainder in base units, which is returned
//! instead of silently dropped.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::ProductUnit;

/// The conversion table of a single product.
#[derive(Debug, Clone)]
pub struct UnitTable<'a> {
    product_id: &'a str,
    base_unit_id: &'a str,
    units: &'a [ProductUnit],
}

impl<'a> UnitTable<'a> {
    /// Builds a table. `units` may or may not contain the base unit;
    /// the base unit always resolves to factor 1.
    pub fn new(product_id: &'a str, base_unit_id: &'a str, units: &'a [ProductUnit]) -> Self {
        UnitTable {
            product_id,
            base_unit_id,
            units,
        }
    }

    /// Base units per one `unit_id`.
    pub fn factor(&self, unit_id: &str) -> CoreResult<i64> {
        if unit_id == self.base_unit_id {
            return Ok(1);
        }
        self.units
            .iter()
            .find(|u| u.unit_id == unit_id && u.product_id == self.product_id)
            .map(|u| u.factor)
            .ok_or_else(|| CoreError::UnknownUnit {
                product_id: self.product_id.to_string(),
                unit_id: unit_id.to_string(),
            })
    }

    /// Converts `quantity` of `unit_id` into base units.
    pub fn to_base(&self, unit_id: &str, quantity: i64) -> CoreResult<i64> {
        to_base(quantity, self.factor(unit_id)?)
    }

    /// Converts base units into whole `unit_id` plus leftover base units.
    pub fn split(&self, unit_id: &str, base_quantity: i64) -> CoreResult<(i64, i64)> {
        Ok(split_base(base_quantity, self.factor(unit_id)?))
    }
}

/// `quantity × factor`, rejecting non-positive factors and overflow.
pub fn to_base(quantity: i64, factor: i64) -> CoreResult<i64> {
    if factor <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "factor".to_string(),
        }
        .into());
    }
    quantity.checked_mul(factor).ok_or_else(|| {
        ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX / factor,
        }
        .into()
    })
}

/// Splits base units into `(whole units, remaining base units)`.
///
/// A factor of zero or less yields everything as remainder.
pub fn split_base(base_quantity: i64, factor: i64) -> (i64, i64) {
    if factor <= 0 {
        return (0, base_quantity);
    }
    (base_quantity / factor, base_quantity % factor)
}
