pub mod fixture;
pub mod types;
pub use fixture::Fixture;
pub use types::{InMemoryStore, LineRepository, RunRepository};
