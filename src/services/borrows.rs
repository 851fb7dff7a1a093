//! Borrow request lifecycle service

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use validator::Validate;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        borrow::{
            group_by_status, BorrowAction, BorrowQuery, BorrowRequest, BorrowRequestView,
            BorrowStatus, CreateBorrowRequest, ManageBorrowRequest,
        },
        user::UserClaims,
    },
    repository::{borrows::BorrowFilter, Repository},
};

use super::cart::BorrowRequestSink;

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    lending: LendingConfig,
}

impl BorrowsService {
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self { repository, lending }
    }

    /// List requests visible to the caller.
    ///
    /// Plain users only ever see their own requests; reviewers see all
    /// unless `my_only` is set.
    pub async fn list(&self, claims: &UserClaims, query: &BorrowQuery) -> AppResult<Vec<BorrowRequestView>> {
        let own_only = !claims.is_reviewer() || query.my_only.unwrap_or(false);
        let filter = BorrowFilter {
            user_id: own_only.then_some(claims.user_id),
            status: query.status,
            search: query
                .search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };

        let rows = self.repository.borrows.list(&filter).await?;
        Ok(rows.into_iter().map(|r| r.into_view(claims)).collect())
    }

    /// Review queue grouped by status
    pub async fn grouped(
        &self,
        claims: &UserClaims,
        query: &BorrowQuery,
    ) -> AppResult<IndexMap<BorrowStatus, Vec<BorrowRequestView>>> {
        claims.require_reviewer()?;
        Ok(group_by_status(self.list(claims, query).await?))
    }

    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<BorrowRequestView> {
        let row = self.repository.borrows.get_row(id).await?;
        claims.require_owner_or_reviewer(row.request.user_id)?;
        Ok(row.into_view(claims))
    }

    /// File a new PENDING request
    pub async fn create(&self, user_id: i32, data: CreateBorrowRequest, today: NaiveDate) -> AppResult<BorrowRequest> {
        data.validate()?;
        data.form().check(today, self.lending.max_borrow_days)?;

        let equipment = self.repository.equipment.get_by_id(data.equipment_id).await?;
        if !equipment.status.accepts_requests() {
            return Err(AppError::BusinessRule(format!(
                "{} is {} and cannot be requested",
                equipment.name, equipment.status
            )));
        }
        if data.quantity > equipment.available_quantity {
            return Err(AppError::BusinessRule(format!(
                "Only {} unit(s) of {} available, {} requested",
                equipment.available_quantity, equipment.name, data.quantity
            )));
        }

        let request = self.repository.borrows.create(user_id, &data).await?;
        tracing::info!(
            request_id = request.id,
            user_id,
            equipment_id = request.equipment_id,
            quantity = request.quantity,
            "Borrow request created"
        );
        Ok(request)
    }

    /// Approve or reject a pending request
    pub async fn manage(&self, claims: &UserClaims, body: ManageBorrowRequest) -> AppResult<BorrowRequestView> {
        claims.require_reviewer()?;
        body.validate()?;

        let request = self.repository.borrows.get_by_id(body.request_id).await?;
        let action = BorrowAction::from(body.action);
        let to = request.status.transition(action)?;

        let updated = match action {
            BorrowAction::Approve => {
                self.repository
                    .borrows
                    .approve(&request, to, claims.user_id)
                    .await?
            }
            _ => {
                let reason = body
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty());
                self.repository
                    .borrows
                    .reject(&request, to, claims.user_id, reason)
                    .await?
            }
        };

        log_transition(&request, &updated, action, claims.user_id);
        self.get(claims, updated.id).await
    }

    /// Borrower asks to return the equipment
    pub async fn request_return(&self, claims: &UserClaims, id: i32) -> AppResult<BorrowRequestView> {
        let request = self.repository.borrows.get_by_id(id).await?;
        if request.user_id != claims.user_id {
            return Err(AppError::Authorization(
                "Only the borrower can request a return".to_string(),
            ));
        }

        let to = request.status.transition(BorrowAction::RequestReturn)?;
        let updated = self.repository.borrows.request_return(&request, to).await?;

        log_transition(&request, &updated, BorrowAction::RequestReturn, claims.user_id);
        self.get(claims, updated.id).await
    }

    /// Reviewer confirms the equipment came back
    pub async fn confirm_return(&self, claims: &UserClaims, id: i32) -> AppResult<BorrowRequestView> {
        claims.require_reviewer()?;

        let request = self.repository.borrows.get_by_id(id).await?;
        let to = request.status.transition(BorrowAction::ConfirmReturn)?;
        let updated = self
            .repository
            .borrows
            .confirm_return(&request, to, claims.user_id)
            .await?;

        log_transition(&request, &updated, BorrowAction::ConfirmReturn, claims.user_id);
        self.get(claims, updated.id).await
    }

    /// Flag requests past their end date as overdue. Returns how many moved.
    pub async fn mark_overdue(&self, today: NaiveDate) -> AppResult<usize> {
        let from: Vec<BorrowStatus> = BorrowStatus::ALL
            .into_iter()
            .filter(|s| s.can(BorrowAction::MarkOverdue))
            .collect();

        let ids = self
            .repository
            .borrows
            .mark_overdue(&from, BorrowStatus::Overdue, today)
            .await?;

        if !ids.is_empty() {
            tracing::info!(count = ids.len(), ?ids, "Borrow requests marked overdue");
        }
        Ok(ids.len())
    }
}

#[async_trait]
impl BorrowRequestSink for BorrowsService {
    async fn create_request(
        &self,
        user_id: i32,
        request: CreateBorrowRequest,
        today: NaiveDate,
    ) -> AppResult<BorrowRequest> {
        self.create(user_id, request, today).await
    }
}

fn log_transition(before: &BorrowRequest, after: &BorrowRequest, action: BorrowAction, actor: i32) {
    tracing::info!(
        request_id = before.id,
        actor,
        action = %action,
        from = %before.status,
        to = %after.status,
        "Borrow request status changed"
    );
}
