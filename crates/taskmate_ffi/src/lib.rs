//! Flutter-facing bindings for the Taskmate core.

pub mod api;
