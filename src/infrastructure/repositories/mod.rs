pub mod location_repository;
pub mod tour_repository;
pub mod tour_store;
pub mod usage_repository;
pub mod user_repository;

pub use location_repository::LocationRepository;
pub use tour_repository::TourRepository;
pub use tour_store::{LocationStore, TourStore, UsageStore};
pub use usage_repository::UsageRepository;
pub use user_repository::UserRepository;
