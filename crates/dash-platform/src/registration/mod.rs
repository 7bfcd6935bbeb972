//! Dashboard Registration Aggregate

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{registrations_router, RegistrationsState};
pub use entity::{Features, Registration};
pub use repository::{
    InMemoryRegistrationRepository, MongoRegistrationRepository, RegistrationRepository,
};
