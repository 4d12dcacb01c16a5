mod provider;
pub use provider::RateSource;
mod showapi;
pub use showapi::{Envelope, ShowApi, ShowApiConf};
