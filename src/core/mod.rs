// Core types shared by storage, services and the HTTP layer

pub mod strong_types;

pub use strong_types::{current_time_millis, millis_to_datetime, EntityId, InvalidEntityId};
