//! Activity feed entries derived from borrow request timestamps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Requested,
    Approved,
    Rejected,
    ReturnRequested,
    Returned,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Requested => "requested",
            ActivityKind::Approved => "approved",
            ActivityKind::Rejected => "rejected",
            ActivityKind::ReturnRequested => "return_requested",
            ActivityKind::Returned => "returned",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(ActivityKind::Requested),
            "approved" => Ok(ActivityKind::Approved),
            "rejected" => Ok(ActivityKind::Rejected),
            "return_requested" => Ok(ActivityKind::ReturnRequested),
            "returned" => Ok(ActivityKind::Returned),
            _ => Err(format!("Invalid activity kind: {}", s)),
        }
    }
}

super::text_enum_sqlx!(ActivityKind);

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub occurred_at: DateTime<Utc>,
    pub request_id: i32,
    pub quantity: i32,
    pub equipment_id: i32,
    pub equipment_name: String,
    /// Requester
    pub user_display_name: String,
    /// Reviewer who approved, rejected or confirmed, if any
    pub actor_display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}
