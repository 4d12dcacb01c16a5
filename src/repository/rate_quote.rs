use crate::{db::DbPool, error::Result, model::{Prices, RateQuote}};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row, ToSql};

const COLUMNS: &str = "currency_code, currency_name_local, spot_buy, cash_buy, spot_sell, \
    cash_sell, translation, publication_date, publication_time, created_at";

pub struct RateQuoteRepository {
    pool: DbPool,
}

impl RateQuoteRepository {
    pub fn new(pool: DbPool) -> RateQuoteRepository {
        RateQuoteRepository { pool: pool }
    }

    pub fn create_schema(&self) -> Result<()> {
        self.pool.get()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS rate_quote (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                currency_code TEXT NOT NULL,
                currency_name_local TEXT NOT NULL,
                spot_buy REAL,
                cash_buy REAL,
                spot_sell REAL,
                cash_sell REAL,
                translation REAL,
                publication_date TEXT NOT NULL,
                publication_time TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (currency_code, publication_date, publication_time)
            );
            "#,
        )?;
        Ok(())
    }

    /// Returns the number of rows written. Rows clashing on the dedup key are
    /// skipped without error.
    pub fn insert_batch(&self, rows: &[RateQuote]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO rate_quote (
                    currency_code,
                    currency_name_local,
                    spot_buy,
                    cash_buy,
                    spot_sell,
                    cash_sell,
                    translation,
                    publication_date,
                    publication_time
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for row in rows {
                inserted += stmt.execute(params![
                    row.currency_code.trim().to_uppercase(),
                    &row.currency_name_local,
                    row.prices.spot_buy,
                    row.prices.cash_buy,
                    row.prices.spot_sell,
                    row.prices.cash_sell,
                    row.prices.translation,
                    &row.publication_date,
                    &row.publication_time,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn get_latest(&self, currency_code: &str) -> Result<Option<RateQuote>> {
        let query = format!(
            r#"
            SELECT {}
            FROM rate_quote
            WHERE currency_code = ?
            ORDER BY publication_date DESC, publication_time DESC
            LIMIT 1
            "#,
            COLUMNS
        );

        Ok(self
            .pool
            .get()?
            .query_row(&query, params![currency_code.trim().to_uppercase()], map_row)
            .optional()?)
    }

    /// Date bounds are inclusive. Rows come back oldest first.
    pub fn query_history(
        &self,
        currency_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RateQuote>> {
        let mut query = format!("SELECT {} FROM rate_quote WHERE currency_code = ?", COLUMNS);
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(currency_code.trim().to_uppercase())];

        if let Some(start_date) = start_date {
            query.push_str(" AND publication_date >= ?");
            args.push(Box::new(start_date.format("%Y-%m-%d").to_string()));
        }

        if let Some(end_date) = end_date {
            query.push_str(" AND publication_date <= ?");
            args.push(Box::new(end_date.format("%Y-%m-%d").to_string()));
        }

        query.push_str(" ORDER BY publication_date ASC, publication_time ASC");

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), map_row)?
            .collect::<rusqlite::Result<Vec<RateQuote>>>()?;
        Ok(rows)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<RateQuote> {
    Ok(RateQuote {
        currency_code: row.get(0)?,
        currency_name_local: row.get(1)?,
        prices: Prices {
            spot_buy: row.get(2)?,
            cash_buy: row.get(3)?,
            spot_sell: row.get(4)?,
            cash_sell: row.get(5)?,
            translation: row.get(6)?,
        },
        publication_date: row.get(7)?,
        publication_time: row.get(8)?,
        created_at: row.get(9)?,
    })
}
