//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Equipment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EquipmentStatus {
    Available,
    Borrowed,
    Maintenance,
    Retired,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "AVAILABLE",
            EquipmentStatus::Borrowed => "BORROWED",
            EquipmentStatus::Maintenance => "MAINTENANCE",
            EquipmentStatus::Retired => "RETIRED",
        }
    }

    /// Whether new borrow requests may target equipment in this status
    pub fn accepts_requests(&self) -> bool {
        matches!(self, EquipmentStatus::Available | EquipmentStatus::Borrowed)
    }

    /// Status after availability changed. Admin-set statuses are kept.
    pub fn follow_availability(self, available_quantity: i32) -> Self {
        match self {
            EquipmentStatus::Available if available_quantity <= 0 => EquipmentStatus::Borrowed,
            EquipmentStatus::Borrowed if available_quantity > 0 => EquipmentStatus::Available,
            other => other,
        }
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Ok(EquipmentStatus::Available),
            "BORROWED" => Ok(EquipmentStatus::Borrowed),
            "MAINTENANCE" => Ok(EquipmentStatus::Maintenance),
            "RETIRED" => Ok(EquipmentStatus::Retired),
            _ => Err(format!("Invalid equipment status: {}", s)),
        }
    }
}

super::text_enum_sqlx!(EquipmentStatus);

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// Units owned
    pub total_quantity: i32,
    /// Units not held by an approved request
    pub available_quantity: i32,
    pub status: EquipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category must be 1 to 100 characters"))]
    pub category: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: i32,
    pub status: Option<EquipmentStatus>,
}

/// Update equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category must be 1 to 100 characters"))]
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: Option<i32>,
    pub status: Option<EquipmentStatus>,
}

/// Equipment catalog query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    pub category: Option<String>,
    pub status: Option<EquipmentStatus>,
    /// Matches name or description
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl EquipmentQuery {
    /// (page, per_page) with defaults and bounds applied
    pub fn pagination(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page)
    }

    /// Row offset of the requested page, saturating for absurd page numbers
    pub fn offset(&self) -> i64 {
        let (page, per_page) = self.pagination();
        (page - 1).saturating_mul(per_page)
    }
}

/// Stock columns derived for an update of a locked equipment row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    /// Set when the total changed
    pub available_quantity: Option<i32>,
    /// Set when the status differs from the stored one
    pub status: Option<EquipmentStatus>,
}

impl Equipment {
    /// Work out availability and status after applying `data` to this row.
    ///
    /// Fails with `BusinessRule` when the new total is below the units lent out.
    pub fn plan_update(&self, data: &UpdateEquipment) -> AppResult<StockChange> {
        let available_quantity = match data.total_quantity {
            Some(total) if total != self.total_quantity => Some(
                rebalance_available(self.total_quantity, total, self.available_quantity)
                    .ok_or_else(|| {
                        AppError::BusinessRule(format!(
                            "{} unit(s) are lent out; total cannot drop to {}",
                            self.total_quantity - self.available_quantity,
                            total
                        ))
                    })?,
            ),
            _ => None,
        };

        let status = data
            .status
            .unwrap_or(self.status)
            .follow_availability(available_quantity.unwrap_or(self.available_quantity));

        Ok(StockChange {
            available_quantity,
            status: (status != self.status).then_some(status),
        })
    }
}

/// Shift `available` by the change in total units.
///
/// Returns `None` when units currently lent out would exceed the new total.
pub fn rebalance_available(old_total: i32, new_total: i32, available: i32) -> Option<i32> {
    let shifted = available + (new_total - old_total);
    (shifted >= 0).then_some(shifted)
}
