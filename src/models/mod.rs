//! Domain model module declarations.

pub mod bundle;
pub mod pagination;
