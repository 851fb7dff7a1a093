//! Business logic services

pub mod borrows;
pub mod cart;
pub mod equipment;
pub mod redis;
pub mod scheduler;
pub mod stats;
pub mod users;

use crate::{
    config::{AuthConfig, LendingConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub equipment: equipment::EquipmentService,
    pub borrows: borrows::BorrowsService,
    pub cart: cart::CartService,
    pub stats: stats::StatsService,
    pub redis: redis::RedisService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        lending_config: LendingConfig,
        redis_service: redis::RedisService,
    ) -> Self {
        let borrows = borrows::BorrowsService::new(repository.clone(), lending_config.clone());

        Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            equipment: equipment::EquipmentService::new(repository.clone()),
            cart: cart::CartService::new(
                repository.clone(),
                redis_service.clone(),
                borrows.clone(),
                lending_config,
            ),
            borrows,
            stats: stats::StatsService::new(repository),
            redis: redis_service,
        }
    }
}
