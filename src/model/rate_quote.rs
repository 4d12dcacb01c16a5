use chrono::NaiveDateTime;
use serde::Serialize;

/// One timestamped snapshot of a currency's buy/sell/translation prices.
///
/// `(currency_code, publication_date, publication_time)` is the dedup key
/// enforced by the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateQuote {
    pub currency_code: String,
    pub currency_name_local: String,
    #[serde(flatten)]
    pub prices: Prices,
    /// `YYYY-MM-DD`
    pub publication_date: String,
    /// `HH:MM:SS`
    pub publication_time: String,
    /// Set by the store on insert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl RateQuote {
    pub fn new(
        currency_code: &str,
        currency_name_local: Option<&str>,
        prices: Prices,
        publication_date: &str,
        publication_time: &str,
    ) -> RateQuote {
        let currency_code = currency_code.trim().to_uppercase();
        let currency_name_local = match currency_name_local.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => currency_code.clone(),
        };

        RateQuote {
            currency_code,
            currency_name_local,
            prices,
            publication_date: publication_date.to_string(),
            publication_time: publication_time.to_string(),
            created_at: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Prices {
    pub spot_buy: Option<f64>,
    pub cash_buy: Option<f64>,
    pub spot_sell: Option<f64>,
    pub cash_sell: Option<f64>,
    pub translation: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceField {
    SpotBuy,
    CashBuy,
    SpotSell,
    CashSell,
    Translation,
}

impl Prices {
    pub fn set(&mut self, field: PriceField, value: Option<f64>) {
        let slot = match field {
            PriceField::SpotBuy => &mut self.spot_buy,
            PriceField::CashBuy => &mut self.cash_buy,
            PriceField::SpotSell => &mut self.spot_sell,
            PriceField::CashSell => &mut self.cash_sell,
            PriceField::Translation => &mut self.translation,
        };
        *slot = value;
    }
}
