//! Product database entity for SeaORM.
//!
//! `created_at` / `updated_at` are filled by `before_save`, not by callers.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, NotSet, Set};
use serde::{Deserialize, Serialize};

use domain::{validate_product_name, Product, Timestamps};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub uid: Uuid,
    pub name: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// New rows get a fresh v4 uid, same as `Product::new`
    fn new() -> Self {
        Self {
            uid: Set(Uuid::new_v4()),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(name) = &self.name {
            validate_product_name(name).map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        let now = Utc::now();
        if insert {
            if matches!(self.uid, ActiveValue::NotSet) {
                self.uid = Set(Uuid::new_v4());
            }
            self.created_at = Set(now);
        } else {
            // uid and created_at are write-once
            self.uid = NotSet;
            self.created_at = NotSet;
        }
        self.updated_at = Set(now);

        Ok(self)
    }
}

/// Convert database model to domain record
impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Product::restore(
            model.id,
            model.uid,
            model.name,
            Timestamps::persisted(model.created_at, model.updated_at),
        )
    }
}

/// Active model for writing a domain record; timestamps are left to the hook
impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        Self {
            id: match product.id() {
                Some(id) => Set(id),
                None => NotSet,
            },
            uid: Set(product.uid()),
            name: Set(product.name().to_string()),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }
}
