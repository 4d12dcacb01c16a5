use crate::{
    error::{Error, Result},
    model::RateQuote,
    provider::RateSource,
    repository::RateQuoteRepository,
};
use tracing::{error, info};

/// Outcome of one update run.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub fetched: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub failures: Vec<(String, Error)>,
}

/// Fetches every code in turn, drops quotes whose prices match the latest
/// stored quote and writes the rest in a single batch. A failed fetch is
/// logged and recorded without stopping the other codes.
pub async fn update_rates<S, C>(
    source: &S,
    repo: &RateQuoteRepository,
    codes: &[C],
) -> Result<UpdateReport>
where
    S: RateSource + ?Sized,
    C: AsRef<str>,
{
    let mut report = UpdateReport::default();
    let mut to_insert: Vec<RateQuote> = vec![];

    for code in codes {
        let code = code.as_ref();

        let quotes = match source.fetch_quotes(code).await {
            Ok(quotes) => quotes,
            Err(e) => {
                error!(provider = %source.name(), %code, %e, "Fetch failed");
                report.failures.push((code.to_string(), e));
                continue;
            }
        };

        report.fetched += quotes.len();

        for quote in quotes {
            let latest = repo.get_latest(&quote.currency_code)?;

            if is_duplicate(latest.as_ref(), &quote) {
                info!(
                    code = %quote.currency_code,
                    date = %quote.publication_date,
                    time = %quote.publication_time,
                    "Skipping duplicate"
                );
                report.duplicates += 1;
                continue;
            }

            to_insert.push(quote);
        }
    }

    if to_insert.is_empty() {
        info!("No new records to insert");
    } else {
        report.inserted = repo.insert_batch(&to_insert)?;
        info!(
            count = report.inserted,
            attempted = to_insert.len(),
            "Inserted new records"
        );
    }

    Ok(report)
}

/// Only the five prices are compared. Names and timestamps are ignored.
pub fn is_duplicate(latest: Option<&RateQuote>, new: &RateQuote) -> bool {
    match latest {
        Some(latest) => latest.prices == new.prices,
        None => false,
    }
}
