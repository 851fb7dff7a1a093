//! Borrow request model and its status lifecycle
//!
//! A borrow request moves through a fixed set of statuses. Every change goes
//! through [`BorrowStatus::transition`], so a request can never be approved
//! twice, returned before it was approved, or revived after rejection.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::user::UserClaims;

/// Borrow request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Rejected,
    Active,
    Returned,
    Overdue,
    PendingReturn,
}

impl BorrowStatus {
    /// All statuses in lifecycle order (review queues list them this way)
    pub const ALL: [BorrowStatus; 7] = [
        BorrowStatus::Pending,
        BorrowStatus::PendingReturn,
        BorrowStatus::Approved,
        BorrowStatus::Active,
        BorrowStatus::Overdue,
        BorrowStatus::Returned,
        BorrowStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "PENDING",
            BorrowStatus::Approved => "APPROVED",
            BorrowStatus::Rejected => "REJECTED",
            BorrowStatus::Active => "ACTIVE",
            BorrowStatus::Returned => "RETURNED",
            BorrowStatus::Overdue => "OVERDUE",
            BorrowStatus::PendingReturn => "PENDING_RETURN",
        }
    }

    /// Apply `action` to a request in this status.
    pub fn transition(self, action: BorrowAction) -> AppResult<BorrowStatus> {
        use BorrowAction as A;
        use BorrowStatus as S;

        match (self, action) {
            (S::Pending, A::Approve) => Ok(S::Approved),
            (S::Pending, A::Reject) => Ok(S::Rejected),
            (S::Approved | S::Active | S::Overdue, A::RequestReturn) => Ok(S::PendingReturn),
            (S::Approved | S::Active, A::MarkOverdue) => Ok(S::Overdue),
            (S::PendingReturn, A::ConfirmReturn) => Ok(S::Returned),
            (from, action) => Err(AppError::InvalidTransition {
                from: from.to_string(),
                action: action.to_string(),
            }),
        }
    }

    pub fn can(self, action: BorrowAction) -> bool {
        self.transition(action).is_ok()
    }

    /// No action leaves this status
    pub fn is_terminal(self) -> bool {
        BorrowAction::ALL.iter().all(|a| !self.can(*a))
    }

    /// Units of equipment are held by the borrower in this status
    pub fn holds_equipment(self) -> bool {
        matches!(
            self,
            BorrowStatus::Approved
                | BorrowStatus::Active
                | BorrowStatus::Overdue
                | BorrowStatus::PendingReturn
        )
    }

    /// Actions a reviewer may take on a request in this status
    pub fn reviewer_actions(self) -> Vec<BorrowAction> {
        self.actions_by(Actor::Reviewer)
    }

    /// Actions the requester may take on their own request in this status
    pub fn owner_actions(self) -> Vec<BorrowAction> {
        self.actions_by(Actor::Owner)
    }

    fn actions_by(self, actor: Actor) -> Vec<BorrowAction> {
        BorrowAction::ALL
            .into_iter()
            .filter(|a| a.performed_by() == actor && self.can(*a))
            .collect()
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(BorrowStatus::Pending),
            "APPROVED" => Ok(BorrowStatus::Approved),
            "REJECTED" => Ok(BorrowStatus::Rejected),
            "ACTIVE" => Ok(BorrowStatus::Active),
            "RETURNED" => Ok(BorrowStatus::Returned),
            "OVERDUE" => Ok(BorrowStatus::Overdue),
            "PENDING_RETURN" => Ok(BorrowStatus::PendingReturn),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

super::text_enum_sqlx!(BorrowStatus);

/// Who is allowed to trigger an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// Administrator or moderator
    Reviewer,
    /// The user who filed the request
    Owner,
    /// Background jobs
    System,
}

/// An action that moves a request between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowAction {
    Approve,
    Reject,
    RequestReturn,
    ConfirmReturn,
    MarkOverdue,
}

impl BorrowAction {
    pub const ALL: [BorrowAction; 5] = [
        BorrowAction::Approve,
        BorrowAction::Reject,
        BorrowAction::RequestReturn,
        BorrowAction::ConfirmReturn,
        BorrowAction::MarkOverdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowAction::Approve => "approve",
            BorrowAction::Reject => "reject",
            BorrowAction::RequestReturn => "request_return",
            BorrowAction::ConfirmReturn => "confirm_return",
            BorrowAction::MarkOverdue => "mark_overdue",
        }
    }

    pub fn performed_by(&self) -> Actor {
        match self {
            BorrowAction::Approve | BorrowAction::Reject | BorrowAction::ConfirmReturn => {
                Actor::Reviewer
            }
            BorrowAction::RequestReturn => Actor::Owner,
            BorrowAction::MarkOverdue => Actor::System,
        }
    }
}

impl std::fmt::Display for BorrowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Borrow request row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BorrowStatus,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub return_confirmed_by: Option<i32>,
    pub return_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Borrow request joined with equipment and requester names
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRequestRow {
    #[sqlx(flatten)]
    pub request: BorrowRequest,
    pub equipment_name: String,
    pub equipment_category: String,
    pub user_display_name: String,
    pub user_email: String,
}

impl BorrowRequestRow {
    /// Build the view shown to `viewer`, including the actions they may take
    pub fn into_view(self, viewer: &UserClaims) -> BorrowRequestView {
        let status = self.request.status;
        let mut actions = Vec::new();
        if self.request.user_id == viewer.user_id {
            actions.extend(status.owner_actions());
        }
        if viewer.role.is_reviewer() {
            actions.extend(status.reviewer_actions());
        }

        BorrowRequestView {
            request: self.request,
            equipment_name: self.equipment_name,
            equipment_category: self.equipment_category,
            user_display_name: self.user_display_name,
            user_email: self.user_email,
            actions,
        }
    }
}

/// Borrow request as returned by list and detail endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowRequestView {
    #[serde(flatten)]
    pub request: BorrowRequest,
    pub equipment_name: String,
    pub equipment_category: String,
    pub user_display_name: String,
    pub user_email: String,
    /// Actions the caller may perform on this request
    pub actions: Vec<BorrowAction>,
}

/// Group requests by status in lifecycle order, dropping empty groups
pub fn group_by_status(views: Vec<BorrowRequestView>) -> IndexMap<BorrowStatus, Vec<BorrowRequestView>> {
    let mut groups: IndexMap<BorrowStatus, Vec<BorrowRequestView>> = BorrowStatus::ALL
        .into_iter()
        .map(|s| (s, Vec::new()))
        .collect();

    for view in views {
        if let Some(group) = groups.get_mut(&view.request.status) {
            group.push(view);
        }
    }

    groups.retain(|_, v| !v.is_empty());
    groups
}

/// Date range and free text shared by single requests and cart submissions
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BorrowForm {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 500, message = "Purpose must be at most 500 characters"))]
    pub purpose: Option<String>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl BorrowForm {
    /// Check the date range against `today`. Runs before any write.
    pub fn check_dates(&self, today: NaiveDate, max_days: i64) -> AppResult<()> {
        if self.end_date < self.start_date {
            return Err(AppError::Validation(
                "End date must not be before start date".to_string(),
            ));
        }
        if self.start_date < today {
            return Err(AppError::Validation(
                "Start date cannot be in the past".to_string(),
            ));
        }
        let days = (self.end_date - self.start_date).num_days() + 1;
        if days > max_days {
            return Err(AppError::Validation(format!(
                "Borrow period of {} days exceeds the maximum of {} days",
                days, max_days
            )));
        }
        Ok(())
    }

    /// Field validation followed by the date checks
    pub fn check(&self, today: NaiveDate, max_days: i64) -> AppResult<()> {
        self.validate()?;
        self.check_dates(today, max_days)
    }
}

/// Create borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRequest {
    pub equipment_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 500, message = "Purpose must be at most 500 characters"))]
    pub purpose: Option<String>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl CreateBorrowRequest {
    pub fn form(&self) -> BorrowForm {
        BorrowForm {
            start_date: self.start_date,
            end_date: self.end_date,
            purpose: self.purpose.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Reviewer decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl From<ReviewDecision> for BorrowAction {
    fn from(d: ReviewDecision) -> Self {
        match d {
            ReviewDecision::Approve => BorrowAction::Approve,
            ReviewDecision::Reject => BorrowAction::Reject,
        }
    }
}

/// Approve or reject request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ManageBorrowRequest {
    pub request_id: i32,
    pub action: ReviewDecision,
    #[validate(length(max = 500, message = "Rejection reason must be at most 500 characters"))]
    pub rejection_reason: Option<String>,
}

/// Borrow request list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowQuery {
    /// Restrict to the caller's own requests (always on for plain users)
    pub my_only: Option<bool>,
    pub status: Option<BorrowStatus>,
    /// Matches equipment name, purpose or requester name
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn claims(user_id: i32, role: Role) -> UserClaims {
        UserClaims {
            sub: format!("user{}@example.org", user_id),
            user_id,
            role,
            exp: 0,
            iat: 0,
        }
    }

    fn row(user_id: i32, status: BorrowStatus) -> BorrowRequestRow {
        BorrowRequestRow {
            request: BorrowRequest {
                id: 1,
                user_id,
                equipment_id: 3,
                quantity: 1,
                start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
                status,
                purpose: None,
                notes: None,
                approved_by: None,
                approved_at: None,
                rejection_reason: None,
                actual_return_date: None,
                return_requested_at: None,
                return_confirmed_by: None,
                return_confirmed_at: None,
                created_at: Utc::now(),
                updated_at: None,
            },
            equipment_name: "Tripod".to_string(),
            equipment_category: "Photo".to_string(),
            user_display_name: "Sam".to_string(),
            user_email: "sam@example.org".to_string(),
        }
    }

    fn form(start: (i32, u32, u32), end: (i32, u32, u32)) -> BorrowForm {
        BorrowForm {
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            purpose: None,
            notes: None,
        }
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let s = BorrowStatus::Pending;
        let s = s.transition(BorrowAction::Approve).unwrap();
        assert_eq!(s, BorrowStatus::Approved);
        let s = s.transition(BorrowAction::RequestReturn).unwrap();
        assert_eq!(s, BorrowStatus::PendingReturn);
        let s = s.transition(BorrowAction::ConfirmReturn).unwrap();
        assert_eq!(s, BorrowStatus::Returned);
        assert!(s.is_terminal());
    }

    #[test]
    fn test_rejected_is_terminal() {
        let s = BorrowStatus::Pending.transition(BorrowAction::Reject).unwrap();
        assert_eq!(s, BorrowStatus::Rejected);
        assert!(s.is_terminal());
        assert!(s.transition(BorrowAction::Approve).is_err());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(matches!(
            BorrowStatus::Approved.transition(BorrowAction::Approve),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(BorrowStatus::Pending.transition(BorrowAction::ConfirmReturn).is_err());
        assert!(BorrowStatus::Pending.transition(BorrowAction::RequestReturn).is_err());
        assert!(BorrowStatus::Returned.transition(BorrowAction::RequestReturn).is_err());
        assert!(BorrowStatus::PendingReturn.transition(BorrowAction::MarkOverdue).is_err());
    }

    #[test]
    fn test_overdue_can_still_be_returned() {
        let s = BorrowStatus::Approved.transition(BorrowAction::MarkOverdue).unwrap();
        assert_eq!(s, BorrowStatus::Overdue);
        assert!(s.transition(BorrowAction::MarkOverdue).is_err());
        assert_eq!(
            s.transition(BorrowAction::RequestReturn).unwrap(),
            BorrowStatus::PendingReturn
        );
    }

    #[test]
    fn test_reviewer_actions_gating() {
        for status in BorrowStatus::ALL {
            let actions = status.reviewer_actions();
            match status {
                BorrowStatus::Pending => {
                    assert_eq!(actions, vec![BorrowAction::Approve, BorrowAction::Reject])
                }
                BorrowStatus::PendingReturn => {
                    assert_eq!(actions, vec![BorrowAction::ConfirmReturn])
                }
                _ => assert!(actions.is_empty(), "{} offers {:?}", status, actions),
            }
        }
    }

    #[test]
    fn test_owner_actions() {
        assert_eq!(
            BorrowStatus::Approved.owner_actions(),
            vec![BorrowAction::RequestReturn]
        );
        assert!(BorrowStatus::Pending.owner_actions().is_empty());
        assert!(BorrowStatus::PendingReturn.owner_actions().is_empty());
    }

    #[test]
    fn test_holds_equipment() {
        assert!(!BorrowStatus::Pending.holds_equipment());
        assert!(BorrowStatus::Approved.holds_equipment());
        assert!(BorrowStatus::PendingReturn.holds_equipment());
        assert!(!BorrowStatus::Returned.holds_equipment());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&BorrowStatus::PendingReturn).unwrap(),
            "\"PENDING_RETURN\""
        );
        let s: BorrowStatus = serde_json::from_str("\"OVERDUE\"").unwrap();
        assert_eq!(s, BorrowStatus::Overdue);
        assert_eq!("pending_return".parse::<BorrowStatus>(), Ok(BorrowStatus::PendingReturn));
        assert!("LOST".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn test_view_actions_depend_on_viewer() {
        let owner = claims(7, Role::User);
        let view = row(7, BorrowStatus::Approved).into_view(&owner);
        assert_eq!(view.actions, vec![BorrowAction::RequestReturn]);

        let admin = claims(1, Role::Admin);
        let view = row(7, BorrowStatus::Pending).into_view(&admin);
        assert_eq!(view.actions, vec![BorrowAction::Approve, BorrowAction::Reject]);

        let stranger = claims(8, Role::User);
        let view = row(7, BorrowStatus::Approved).into_view(&stranger);
        assert!(view.actions.is_empty());
    }

    #[test]
    fn test_group_by_status_order() {
        let admin = claims(1, Role::Admin);
        let views = vec![
            row(2, BorrowStatus::Returned).into_view(&admin),
            row(3, BorrowStatus::Pending).into_view(&admin),
            row(4, BorrowStatus::PendingReturn).into_view(&admin),
            row(5, BorrowStatus::Pending).into_view(&admin),
        ];
        let groups = group_by_status(views);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                BorrowStatus::Pending,
                BorrowStatus::PendingReturn,
                BorrowStatus::Returned
            ]
        );
        assert_eq!(groups[&BorrowStatus::Pending].len(), 2);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let f = form((2026, 3, 10), (2026, 3, 5));
        assert!(matches!(f.check_dates(today, 90), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_start_in_past_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(form((2026, 2, 28), (2026, 3, 5)).check_dates(today, 90).is_err());
        assert!(form((2026, 3, 1), (2026, 3, 1)).check_dates(today, 90).is_ok());
    }

    #[test]
    fn test_period_too_long_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(form((2026, 3, 1), (2026, 3, 7)).check_dates(today, 7).is_ok());
        assert!(form((2026, 3, 1), (2026, 3, 8)).check_dates(today, 7).is_err());
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateBorrowRequest {
            equipment_id: 1,
            quantity: 0,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            purpose: None,
            notes: None,
        };
        assert!(req.validate().is_err());
    }
}
