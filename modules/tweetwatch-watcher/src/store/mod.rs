pub mod postgres;

pub use postgres::{migrate, PgMarkerStore};
