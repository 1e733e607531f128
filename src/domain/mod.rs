// Domain layer: school records, the migration session value types and the store port.

pub mod model;
pub mod ports;
