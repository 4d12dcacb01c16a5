pub mod update;
pub use update::{update_rates, UpdateReport};
