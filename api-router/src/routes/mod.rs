pub mod events;
pub mod liveness;
pub mod readiness;
pub mod videos;
