//! Product domain record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_PRODUCT_NAME_LENGTH;
use crate::error::{DomainError, DomainResult};
use crate::timestamps::{Timestamped, Timestamps};

/// Product record.
///
/// The `uid` is generated when the value is constructed and never changes.
/// `id` and the timestamps are assigned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: Option<i32>,
    uid: Uuid,
    name: String,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl Product {
    /// Create a new, not yet persisted product with a fresh v4 uid
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            uid: Uuid::new_v4(),
            name: name.into(),
            timestamps: Timestamps::default(),
        }
    }

    /// Rebuild a product from stored values
    pub fn restore(id: i32, uid: Uuid, name: String, timestamps: Timestamps) -> Self {
        Self {
            id: Some(id),
            uid,
            name,
            timestamps,
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the product has a primary identity from the database
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Change the name in memory; timestamps move on the next write
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Timestamped for Product {
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Check a product name against the column limit.
pub fn validate_product_name(name: &str) -> DomainResult<()> {
    let length = name.chars().count();
    if length > MAX_PRODUCT_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Product name must be at most {} characters, got {}",
            MAX_PRODUCT_NAME_LENGTH, length
        )));
    }
    Ok(())
}
