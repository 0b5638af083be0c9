//! Domain-level constants.
//!
//! These constants define record shape limits.

// =============================================================================
// Product
// =============================================================================

/// Maximum product name length, counted in characters
pub const MAX_PRODUCT_NAME_LENGTH: usize = 255;

/// UUID version assigned to product uids
pub const PRODUCT_UID_VERSION: usize = 4;
