//! Redis service holding per-user borrow carts

use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    models::cart::Cart,
};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Redis client creation failed: {}", e)))?;

        let service = Self { client };
        service.ping().await?;
        Ok(service)
    }

    /// Round-trip a PING
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn cart_key(user_id: i32) -> String {
        format!("cart:{}", user_id)
    }

    /// Load a user's cart; missing or expired carts are empty
    pub async fn get_cart(&self, user_id: i32) -> AppResult<Cart> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::cart_key(user_id)).await?;

        match raw {
            Some(json) => serde_json::from_str(&json).or_else(|e| {
                tracing::warn!(user_id, "Discarding unreadable cart: {}", e);
                Ok(Cart::default())
            }),
            None => Ok(Cart::default()),
        }
    }

    /// Store a cart, refreshing its expiration. Empty carts are deleted.
    pub async fn save_cart(&self, user_id: i32, cart: &Cart, ttl_seconds: u64) -> AppResult<()> {
        if cart.is_empty() {
            return self.delete_cart(user_id).await;
        }

        let json = serde_json::to_string(cart)
            .map_err(|e| AppError::Internal(format!("Failed to encode cart: {}", e)))?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::cart_key(user_id), json, ttl_seconds)
            .await?;
        Ok(())
    }

    pub async fn delete_cart(&self, user_id: i32) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::cart_key(user_id)).await?;
        Ok(())
    }
}
