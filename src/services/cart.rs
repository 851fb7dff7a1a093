//! Cart service: staging equipment and turning the cart into borrow requests
//!
//! Submitting a cart creates one independent request per line. Lines are
//! submitted in order and a failing line does not undo the lines before it.
//! The caller gets both lists back; only the failed lines stay in the cart.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        borrow::{BorrowForm, BorrowRequest, CreateBorrowRequest},
        cart::{AddCartItem, Cart, CartEquipment, CartLine},
    },
    repository::Repository,
};

use super::{borrows::BorrowsService, redis::RedisService};

/// Creates one borrow request per cart line
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowRequestSink: Send + Sync {
    async fn create_request(
        &self,
        user_id: i32,
        request: CreateBorrowRequest,
        today: NaiveDate,
    ) -> AppResult<BorrowRequest>;
}

/// Persists a user's cart
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn store_cart(&self, user_id: i32, cart: &Cart, ttl_seconds: u64) -> AppResult<()>;
}

#[async_trait]
impl CartStore for RedisService {
    async fn store_cart(&self, user_id: i32, cart: &Cart, ttl_seconds: u64) -> AppResult<()> {
        self.save_cart(user_id, cart, ttl_seconds).await
    }
}

/// A cart line that could not be turned into a request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FailedLine {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub quantity: i32,
    pub error: String,
}

/// Outcome of a cart submission
#[derive(Debug, Serialize, ToSchema)]
pub struct CartSubmission {
    pub created: Vec<BorrowRequest>,
    pub failed: Vec<FailedLine>,
    pub message: String,
}

impl CartSubmission {
    fn new(created: Vec<BorrowRequest>, failed: Vec<FailedLine>) -> Self {
        let message = if failed.is_empty() {
            format!("{} borrow request(s) submitted", created.len())
        } else {
            failed
                .iter()
                .map(|f| format!("{}: {}", f.equipment_name, f.error))
                .collect::<Vec<_>>()
                .join("; ")
        };
        Self {
            created,
            failed,
            message,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_equipment_ids(&self) -> Vec<i32> {
        self.failed.iter().map(|f| f.equipment_id).collect()
    }
}

/// Submit every line in order, collecting successes and failures
pub async fn submit_lines(
    sink: &dyn BorrowRequestSink,
    user_id: i32,
    lines: &[CartLine],
    form: &BorrowForm,
    today: NaiveDate,
) -> CartSubmission {
    let mut created = Vec::new();
    let mut failed = Vec::new();

    for line in lines {
        let request = CreateBorrowRequest {
            equipment_id: line.equipment.id,
            quantity: line.quantity,
            start_date: form.start_date,
            end_date: form.end_date,
            purpose: form.purpose.clone(),
            notes: form.notes.clone(),
        };

        match sink.create_request(user_id, request, today).await {
            Ok(r) => created.push(r),
            Err(e) => {
                tracing::warn!(
                    user_id,
                    equipment_id = line.equipment.id,
                    "Cart line rejected: {}",
                    e
                );
                failed.push(FailedLine {
                    equipment_id: line.equipment.id,
                    equipment_name: line.equipment.name.clone(),
                    quantity: line.quantity,
                    error: e.public_message(),
                });
            }
        }
    }

    CartSubmission::new(created, failed)
}

/// Drop the submitted lines from the stored cart.
///
/// The requests already exist at this point, so a storage failure is logged
/// and the submission is still handed back to the caller.
pub async fn settle_cart(
    store: &dyn CartStore,
    user_id: i32,
    mut cart: Cart,
    submission: CartSubmission,
    ttl_seconds: u64,
) -> CartSubmission {
    cart.retain_failed(&submission.failed_equipment_ids());
    if let Err(e) = store.store_cart(user_id, &cart, ttl_seconds).await {
        tracing::error!(
            user_id,
            remaining = cart.lines.len(),
            "Cart not updated after submission: {}",
            e
        );
    }
    submission
}

#[derive(Clone)]
pub struct CartService {
    repository: Repository,
    redis: RedisService,
    borrows: BorrowsService,
    lending: LendingConfig,
}

impl CartService {
    pub fn new(
        repository: Repository,
        redis: RedisService,
        borrows: BorrowsService,
        lending: LendingConfig,
    ) -> Self {
        Self {
            repository,
            redis,
            borrows,
            lending,
        }
    }

    pub async fn get(&self, user_id: i32) -> AppResult<Cart> {
        self.redis.get_cart(user_id).await
    }

    /// Add equipment, capped at its current available units
    pub async fn add(&self, user_id: i32, item: AddCartItem) -> AppResult<Cart> {
        item.validate()?;

        let equipment = self.repository.equipment.get_by_id(item.equipment_id).await?;
        if !equipment.status.accepts_requests() {
            return Err(AppError::BusinessRule(format!(
                "{} is {} and cannot be borrowed",
                equipment.name, equipment.status
            )));
        }

        let mut cart = self.redis.get_cart(user_id).await?;
        cart.add(CartEquipment::from(&equipment), item.quantity)?;
        self.save(user_id, &cart).await?;
        Ok(cart)
    }

    pub async fn set_quantity(&self, user_id: i32, equipment_id: i32, quantity: i32) -> AppResult<Cart> {
        let mut cart = self.redis.get_cart(user_id).await?;
        cart.set_quantity(equipment_id, quantity)?;
        self.save(user_id, &cart).await?;
        Ok(cart)
    }

    pub async fn remove(&self, user_id: i32, equipment_id: i32) -> AppResult<Cart> {
        let mut cart = self.redis.get_cart(user_id).await?;
        if !cart.remove(equipment_id) {
            return Err(AppError::NotFound(format!(
                "Equipment {} is not in the cart",
                equipment_id
            )));
        }
        self.save(user_id, &cart).await?;
        Ok(cart)
    }

    pub async fn clear(&self, user_id: i32) -> AppResult<()> {
        self.redis.delete_cart(user_id).await
    }

    /// Turn the cart into borrow requests sharing one date range.
    ///
    /// The form is checked before anything is created. A fully successful
    /// submission empties the cart; otherwise the failed lines remain.
    pub async fn submit(&self, user_id: i32, form: BorrowForm) -> AppResult<CartSubmission> {
        let today = Utc::now().date_naive();
        form.check(today, self.lending.max_borrow_days)?;

        let cart = self.redis.get_cart(user_id).await?;
        if cart.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".to_string()));
        }

        let submission = submit_lines(&self.borrows, user_id, &cart.lines, &form, today).await;
        let submission = settle_cart(
            &self.redis,
            user_id,
            cart,
            submission,
            self.lending.cart_ttl_seconds,
        )
        .await;

        tracing::info!(
            user_id,
            created = submission.created.len(),
            failed = submission.failed.len(),
            "Cart submitted"
        );
        Ok(submission)
    }

    async fn save(&self, user_id: i32, cart: &Cart) -> AppResult<()> {
        self.redis
            .save_cart(user_id, cart, self.lending.cart_ttl_seconds)
            .await
    }
}
