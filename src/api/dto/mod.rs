//! Data Transfer Objects for REST request/response serialization.

pub mod relay_dto;

pub use relay_dto::*;
