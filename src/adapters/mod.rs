// Adapters layer: concrete implementations for external systems (table API, auth).

pub mod auth;
pub mod rest_store;
