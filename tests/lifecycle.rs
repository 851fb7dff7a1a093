use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use time2use_server::{
    models::{
        borrow::{BorrowAction, BorrowForm, BorrowRequest, BorrowStatus, CreateBorrowRequest},
        cart::{Cart, CartEquipment},
        equipment::EquipmentStatus,
        user::{Role, UserClaims},
    },
    services::cart::{submit_lines, BorrowRequestSink},
    AppError, AppResult,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn equipment(id: i32, name: &str, available: i32) -> CartEquipment {
    CartEquipment {
        id,
        name: name.to_string(),
        category: "Audio".to_string(),
        available_quantity: available,
    }
}

/// Accepts every request except for equipment listed in `refuse`
struct StubSink {
    refuse: Vec<i32>,
}

#[async_trait]
impl BorrowRequestSink for StubSink {
    async fn create_request(
        &self,
        user_id: i32,
        request: CreateBorrowRequest,
        _today: NaiveDate,
    ) -> AppResult<BorrowRequest> {
        if self.refuse.contains(&request.equipment_id) {
            return Err(AppError::BusinessRule("Out of stock".to_string()));
        }
        Ok(BorrowRequest {
            id: request.equipment_id * 100,
            user_id,
            equipment_id: request.equipment_id,
            quantity: request.quantity,
            start_date: request.start_date,
            end_date: request.end_date,
            purpose: request.purpose,
            notes: request.notes,
            status: BorrowStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            actual_return_date: None,
            return_requested_at: None,
            return_confirmed_by: None,
            return_confirmed_at: None,
            created_at: Utc::now(),
            updated_at: None,
        })
    }
}

#[test]
fn happy_path_walks_every_stage() {
    let mut status = BorrowStatus::Pending;
    for action in [
        BorrowAction::Approve,
        BorrowAction::RequestReturn,
        BorrowAction::ConfirmReturn,
    ] {
        status = status.transition(action).unwrap();
    }
    assert_eq!(status, BorrowStatus::Returned);
    assert!(status.is_terminal());
}

#[test]
fn overdue_request_can_still_be_returned() {
    let status = BorrowStatus::Approved
        .transition(BorrowAction::MarkOverdue)
        .unwrap();
    assert_eq!(status, BorrowStatus::Overdue);
    assert_eq!(status.owner_actions(), vec![BorrowAction::RequestReturn]);
    assert!(status.reviewer_actions().is_empty());
    assert_eq!(
        status.transition(BorrowAction::RequestReturn).unwrap(),
        BorrowStatus::PendingReturn
    );
}

#[test]
fn rejected_request_cannot_be_revived() {
    let status = BorrowStatus::Pending.transition(BorrowAction::Reject).unwrap();
    for action in BorrowAction::ALL {
        let err = status.transition(action).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }
}

#[test]
fn cart_merges_and_caps_lines() {
    let mut cart = Cart::default();
    assert_eq!(cart.add(equipment(1, "Microphone", 3), 2).unwrap(), 2);
    assert_eq!(cart.add(equipment(1, "Microphone", 3), 4).unwrap(), 3);
    assert_eq!(cart.add(equipment(2, "Mixer", 1), 1).unwrap(), 1);

    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.total_units(), 4);

    assert_eq!(cart.set_quantity(1, 0).unwrap(), None);
    assert!(cart.line(1).is_none());
    assert!(cart.remove(2));
    assert!(cart.is_empty());
}

#[test]
fn reversed_dates_are_rejected_before_submission() {
    let form = BorrowForm {
        start_date: day(10),
        end_date: day(8),
        purpose: None,
        notes: None,
    };
    assert!(matches!(
        form.check(day(1), 90),
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn partial_submission_reports_failed_lines() {
    let mut cart = Cart::default();
    cart.add(equipment(1, "Microphone", 2), 1).unwrap();
    cart.add(equipment(2, "Mixer", 1), 1).unwrap();
    cart.add(equipment(3, "Speaker", 4), 2).unwrap();

    let form = BorrowForm {
        start_date: day(10),
        end_date: day(12),
        purpose: Some("Concert".to_string()),
        notes: None,
    };
    let sink = StubSink { refuse: vec![2] };

    let submission = submit_lines(&sink, 7, &cart.lines, &form, day(1)).await;

    assert!(!submission.is_complete());
    assert_eq!(submission.created.len(), 2);
    assert!(submission.created.iter().all(|r| r.user_id == 7));
    assert_eq!(submission.failed.len(), 1);
    assert_eq!(submission.failed[0].equipment_id, 2);
    assert_eq!(submission.message, "Mixer: Out of stock");
}

#[test]
fn equipment_status_follows_stock() {
    assert_eq!(
        EquipmentStatus::Available.follow_availability(0),
        EquipmentStatus::Borrowed
    );
    assert_eq!(
        EquipmentStatus::Borrowed.follow_availability(1),
        EquipmentStatus::Available
    );
    assert_eq!(
        EquipmentStatus::Maintenance.follow_availability(5),
        EquipmentStatus::Maintenance
    );
}

#[test]
fn token_carries_role() {
    let now = Utc::now().timestamp();
    let claims = UserClaims {
        sub: "mod@example.org".to_string(),
        user_id: 4,
        role: Role::Moderator,
        exp: now + 3600,
        iat: now,
    };
    let token = claims.create_token("lifecycle-secret").unwrap();
    let decoded = UserClaims::from_token(&token, "lifecycle-secret").unwrap();

    assert!(decoded.is_reviewer());
    assert!(decoded.require_admin().is_err());
    assert!(decoded.require_owner_or_reviewer(99).is_ok());
}
