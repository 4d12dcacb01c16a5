mod rate_quote;
pub use rate_quote::{PriceField, Prices, RateQuote};
