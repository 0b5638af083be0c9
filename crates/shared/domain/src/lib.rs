//! Domain layer - Core records and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Persistence hooks that fill in timestamps live in the service crates.

pub mod constants;
pub mod error;
pub mod product;
pub mod timestamps;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use product::{validate_product_name, Product};
pub use timestamps::{Timestamped, Timestamps};
