// Application layer: operator-facing use cases composed from the planner.

pub mod commands;
