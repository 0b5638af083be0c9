//! Product repository implementation.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::product::{self, ActiveModel, Entity as ProductEntity};
use common::{AppError, AppResult};
use domain::Product;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Product repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find product by primary key
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Product>>;

    /// Find product by its uid
    async fn find_by_uid(&self, uid: Uuid) -> AppResult<Option<Product>>;

    /// List all products ordered by id
    async fn list(&self) -> AppResult<Vec<Product>>;

    /// Insert a product that has not been written yet
    async fn create(&self, product: Product) -> AppResult<Product>;

    /// Write changes to an existing product
    async fn update(&self, product: Product) -> AppResult<Product>;

    /// Create or update depending on whether the product has an id
    async fn save(&self, product: Product) -> AppResult<Product>;

    /// Delete product by ID
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Concrete implementation of ProductRepository
pub struct ProductStore {
    db: DatabaseConnection,
}

impl ProductStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Product>> {
        let result = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Product::from))
    }

    async fn find_by_uid(&self, uid: Uuid) -> AppResult<Option<Product>> {
        let result = ProductEntity::find()
            .filter(product::Column::Uid.eq(uid))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Product::from))
    }

    async fn list(&self) -> AppResult<Vec<Product>> {
        let models = ProductEntity::find()
            .order_by_asc(product::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Product::from).collect())
    }

    async fn create(&self, product: Product) -> AppResult<Product> {
        if product.is_persisted() {
            return Err(AppError::validation("Product has already been created"));
        }

        let model = ActiveModel::from(&product)
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;

        tracing::debug!(id = model.id, uid = %model.uid, "Product inserted");
        Ok(Product::from(model))
    }

    async fn update(&self, product: Product) -> AppResult<Product> {
        let id = product
            .id()
            .ok_or_else(|| AppError::validation("Product has not been created yet"))?;

        let existing = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(product.name().to_string());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Product::from(model))
    }

    async fn save(&self, product: Product) -> AppResult<Product> {
        if product.is_persisted() {
            self.update(product).await
        } else {
            self.create(product).await
        }
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = ProductEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
