use crate::{
    conf::Conf,
    db,
    error::Result,
    model::RateQuote,
    provider::{RateSource, ShowApi},
    repository::RateQuoteRepository,
    service::{update_rates, UpdateReport},
};
use chrono::NaiveDate;

pub const DEFAULT_CODES: [&str; 2] = ["USD", "EUR"];

/// Entry points for callers: `initialize`, `update` and `find`.
pub struct Ratekeeper<S = ShowApi> {
    repo: RateQuoteRepository,
    source: S,
}

impl Ratekeeper<ShowApi> {
    pub fn from_conf(conf: &Conf) -> Result<Ratekeeper<ShowApi>> {
        let source = ShowApi::new(conf.showapi.clone())?;
        let repo = RateQuoteRepository::new(db::pool(&conf.db_path())?);
        Ok(Ratekeeper::new(repo, source))
    }
}

impl<S: RateSource> Ratekeeper<S> {
    pub fn new(repo: RateQuoteRepository, source: S) -> Ratekeeper<S> {
        Ratekeeper {
            repo: repo,
            source: source,
        }
    }

    /// Creates the schema if missing. Safe to call on every start.
    pub fn initialize(&self) -> Result<()> {
        self.repo.create_schema()
    }

    /// Refreshes `codes`, or `USD` and `EUR` when none are given.
    pub async fn update(&self, codes: Option<&[String]>) -> Result<UpdateReport> {
        match codes {
            Some(codes) => update_rates(&self.source, &self.repo, codes).await,
            None => update_rates(&self.source, &self.repo, &DEFAULT_CODES).await,
        }
    }

    pub fn find(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RateQuote>> {
        self.repo.query_history(code, start_date, end_date)
    }

    pub fn find_latest(&self, code: &str) -> Result<Option<RateQuote>> {
        self.repo.get_latest(code)
    }
}
