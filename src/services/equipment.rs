//! Equipment catalog service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<(Vec<Equipment>, i64)> {
        self.repository.equipment.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.equipment.categories().await
    }

    pub async fn create(&self, claims: &UserClaims, data: CreateEquipment) -> AppResult<Equipment> {
        claims.require_admin()?;
        data.validate()?;

        let equipment = self.repository.equipment.create(&data).await?;
        tracing::info!(equipment_id = equipment.id, name = %equipment.name, "Equipment created");
        Ok(equipment)
    }

    /// Update equipment. A new total shifts available units by the same delta.
    pub async fn update(&self, claims: &UserClaims, id: i32, data: UpdateEquipment) -> AppResult<Equipment> {
        claims.require_admin()?;
        data.validate()?;

        let equipment = self.repository.equipment.update(id, &data).await?;
        tracing::info!(
            equipment_id = id,
            available = equipment.available_quantity,
            status = %equipment.status,
            "Equipment updated"
        );
        Ok(equipment)
    }

    /// Delete equipment that no open request refers to
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        claims.require_admin()?;

        if self.repository.equipment.has_open_requests(id).await? {
            return Err(AppError::Conflict(format!(
                "Equipment {} has open borrow requests",
                id
            )));
        }

        self.repository.equipment.delete(id).await?;
        tracing::info!(equipment_id = id, "Equipment deleted");
        Ok(())
    }
}
