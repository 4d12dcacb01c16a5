use crate::{error::Result, model::RateQuote};
use async_trait::async_trait;

#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> String;

    /// One outbound request for `code`. An empty list is a valid answer.
    async fn fetch_quotes(&self, code: &str) -> Result<Vec<RateQuote>>;
}
