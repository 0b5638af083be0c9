//! Product service - Handles product-related use cases.
//!
//! Products are addressed by their uid; the integer id stays internal to storage.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{validate_product_name, Product};

use crate::repository::ProductRepository;

/// Product service trait for dependency injection.
#[async_trait]
pub trait ProductService: Send + Sync {
    /// Get product by uid
    async fn get_product(&self, uid: Uuid) -> AppResult<Product>;

    /// List all products
    async fn list_products(&self) -> AppResult<Vec<Product>>;

    /// Create and store a new product
    async fn create_product(&self, name: String) -> AppResult<Product>;

    /// Change a product's name
    async fn rename_product(&self, uid: Uuid, name: String) -> AppResult<Product>;

    /// Delete product by uid
    async fn delete_product(&self, uid: Uuid) -> AppResult<()>;
}

/// Concrete implementation of ProductService using repository.
pub struct ProductManager {
    repo: Arc<dyn ProductRepository>,
}

impl ProductManager {
    /// Create new product service instance with repository
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ProductService for ProductManager {
    async fn get_product(&self, uid: Uuid) -> AppResult<Product> {
        self.repo.find_by_uid(uid).await?.ok_or_not_found()
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.repo.list().await
    }

    async fn create_product(&self, name: String) -> AppResult<Product> {
        validate_product_name(&name)?;

        let product = Product::new(name);
        tracing::info!(uid = %product.uid(), "Creating product");
        self.repo.create(product).await
    }

    async fn rename_product(&self, uid: Uuid, name: String) -> AppResult<Product> {
        validate_product_name(&name)?;

        let mut product = self.get_product(uid).await?;
        product.rename(name);
        self.repo.update(product).await
    }

    async fn delete_product(&self, uid: Uuid) -> AppResult<()> {
        let product = self.get_product(uid).await?;
        let id = product
            .id()
            .ok_or_else(|| AppError::internal(format!("Stored product {} has no id", uid)))?;

        tracing::info!(%uid, "Deleting product");
        self.repo.delete(id).await
    }
}
