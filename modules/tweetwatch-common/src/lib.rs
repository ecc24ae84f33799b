pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{DispatchError, ExtractError, StoreError};
pub use types::{CycleReport, Marker, Payload, Record, Target, TargetKind, TargetOutcome};
