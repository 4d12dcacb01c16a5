use crate::{
    error::{Error, Result},
    model::{PriceField, Prices, RateQuote},
    provider::RateSource,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Provider keys for the five prices.
const PRICE_FIELDS: [(&str, PriceField); 5] = [
    ("hui_in", PriceField::SpotBuy),
    ("chao_in", PriceField::CashBuy),
    ("hui_out", PriceField::SpotSell),
    ("chao_out", PriceField::CashSell),
    ("zhesuan", PriceField::Translation),
];

pub struct ShowApi {
    conf: ShowApiConf,
    client: Client,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ShowApiConf {
    pub url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub app_key: String,
}

impl ShowApiConf {
    pub fn validate(&self) -> Result<()> {
        if self.app_key.trim().is_empty() {
            return Err(Error::Configuration(
                "SHOWAPI_APPKEY is not set, add SHOWAPI_APPKEY=your_real_key to .env".into(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Configuration("showapi.timeout_secs must be positive".into()));
        }

        Ok(())
    }
}

impl ShowApi {
    pub fn new(conf: ShowApiConf) -> Result<ShowApi> {
        conf.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(conf.timeout_secs))
            .build()?;
        Ok(ShowApi {
            conf: conf,
            client: client,
        })
    }
}

#[async_trait]
impl RateSource for ShowApi {
    fn name(&self) -> String {
        "showapi".into()
    }

    async fn fetch_quotes(&self, code: &str) -> Result<Vec<RateQuote>> {
        info!(provider = %self.name(), %code, "Fetching quotes");
        let envelope = self
            .client
            .post(&self.conf.url)
            .query(&[("appKey", &self.conf.app_key)])
            .form(&[("code", code)])
            .send()
            .await?
            .error_for_status()?
            .json::<Envelope>()
            .await?;
        envelope.into_quotes(code)
    }
}

#[derive(Debug, Deserialize)]
pub struct Envelope {
    showapi_res_code: Option<i64>,
    showapi_res_error: Option<String>,
    showapi_res_body: Option<Body>,
}

#[derive(Debug, Deserialize)]
struct Body {
    ret_code: Option<i64>,
    list: Option<Vec<Map<String, Value>>>,
}

impl Envelope {
    /// Fails on a non-zero outer or inner status, otherwise maps every entry.
    pub fn into_quotes(self, requested_code: &str) -> Result<Vec<RateQuote>> {
        let message = self.showapi_res_error.unwrap_or_default();

        if self.showapi_res_code != Some(0) {
            return Err(Error::Provider {
                res_code: self.showapi_res_code,
                ret_code: None,
                message: message,
            });
        }

        let body = self.showapi_res_body.ok_or_else(|| Error::Provider {
            res_code: self.showapi_res_code,
            ret_code: None,
            message: "missing showapi_res_body".into(),
        })?;

        if body.ret_code != Some(0) {
            return Err(Error::Provider {
                res_code: self.showapi_res_code,
                ret_code: body.ret_code,
                message: message,
            });
        }

        Ok(body
            .list
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| to_quote(entry, requested_code))
            .collect())
    }
}

fn to_quote(entry: &Map<String, Value>, requested_code: &str) -> Option<RateQuote> {
    let code = text(entry, "code").unwrap_or(requested_code);

    let (date, time) = match (text(entry, "day"), text(entry, "time")) {
        (Some(date), Some(time)) => (date, time),
        _ => {
            warn!(%code, "Skipping entry without publication date or time");
            return None;
        }
    };

    let mut prices = Prices::default();
    for (key, field) in PRICE_FIELDS.iter() {
        prices.set(*field, to_price(entry.get(*key)));
    }

    Some(RateQuote::new(code, text(entry, "name"), prices, date, time))
}

fn text<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|it| !it.is_empty())
}

/// Missing, blank or unparseable values become `None`.
fn to_price(value: Option<&Value>) -> Option<f64> {
    let price = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            let parsed = s.parse::<f64>().ok();
            if parsed.is_none() {
                debug!(value = s, "Unparseable price, storing null");
            }
            parsed
        }
        _ => None,
    };

    price.filter(|it| it.is_finite())
}

#[cfg(test)]
mod test {
    use super::{to_price, Envelope, ShowApi, ShowApiConf};
    use crate::{error::Error, model::Prices, provider::RateSource};
    use anyhow::Result;
    use serde_json::{json, Value};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    fn conf(app_key: &str) -> ShowApiConf {
        ShowApiConf {
            url: "https://route.showapi.com/105-30".into(),
            timeout_secs: 10,
            app_key: app_key.into(),
        }
    }

    /// Answers a single request with `status` and `body`, then hands back
    /// the raw request it received.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/105-30", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut req = vec![];
            let mut buf = [0u8; 1024];
            while !request_complete(&req) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8(req).unwrap()
        });

        (url, handle)
    }

    fn request_complete(req: &[u8]) -> bool {
        let text = String::from_utf8_lossy(req);
        let head_end = match text.find("\r\n\r\n") {
            Some(i) => i,
            None => return false,
        };
        let content_length = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        req.len() >= head_end + 4 + content_length
    }

    fn local_conf(url: String) -> ShowApiConf {
        ShowApiConf {
            url: url,
            timeout_secs: 5,
            app_key: "test-key".into(),
        }
    }

    #[test]
    fn into_quotes() -> Result<()> {
        let res = envelope(json!({
            "showapi_res_code": 0,
            "showapi_res_error": "",
            "showapi_res_body": {
                "ret_code": 0,
                "list": [{
                    "hui_in": "704.62",
                    "time": "20:47:05",
                    "chao_out": "707.58",
                    "chao_in": "",
                    "hui_out": "707.58",
                    "name": "美元",
                    "zhesuan": "706.86",
                    "code": "USD",
                    "day": "2025-12-11"
                }]
            }
        }))
        .into_quotes("USD")?;

        assert_eq!(1, res.len());
        let quote = &res[0];
        assert_eq!("USD", quote.currency_code);
        assert_eq!("美元", quote.currency_name_local);
        assert_eq!(
            Prices {
                spot_buy: Some(704.62),
                cash_buy: None,
                spot_sell: Some(707.58),
                cash_sell: Some(707.58),
                translation: Some(706.86),
            },
            quote.prices
        );
        assert_eq!("2025-12-11", quote.publication_date);
        assert_eq!("20:47:05", quote.publication_time);
        Ok(())
    }

    #[test]
    fn into_quotes_defaults_code_and_name() -> Result<()> {
        let res = envelope(json!({
            "showapi_res_code": 0,
            "showapi_res_body": {
                "ret_code": 0,
                "list": [{ "hui_in": 7.9, "day": "2025-12-11", "time": "10:30:00" }]
            }
        }))
        .into_quotes("eur")?;

        assert_eq!("EUR", res[0].currency_code);
        assert_eq!("EUR", res[0].currency_name_local);
        assert_eq!(Some(7.9), res[0].prices.spot_buy);
        Ok(())
    }

    #[test]
    fn into_quotes_skips_entries_without_timestamp() -> Result<()> {
        let res = envelope(json!({
            "showapi_res_code": 0,
            "showapi_res_body": {
                "ret_code": 0,
                "list": [
                    { "code": "USD", "hui_in": "1.0", "day": "2025-12-11" },
                    { "code": "USD", "hui_in": "1.0", "day": "2025-12-11", "time": "10:30:00" }
                ]
            }
        }))
        .into_quotes("USD")?;

        assert_eq!(1, res.len());
        Ok(())
    }

    #[test]
    fn into_quotes_null_list() -> Result<()> {
        let res = envelope(json!({
            "showapi_res_code": 0,
            "showapi_res_body": { "ret_code": 0, "list": null }
        }))
        .into_quotes("USD")?;
        assert!(res.is_empty());
        Ok(())
    }

    #[test]
    fn into_quotes_outer_failure() {
        let res = envelope(json!({
            "showapi_res_code": -1,
            "showapi_res_error": "invalid appKey",
            "showapi_res_body": { "ret_code": 0, "list": [] }
        }))
        .into_quotes("USD");

        match res {
            Err(Error::Provider { res_code, message, .. }) => {
                assert_eq!(Some(-1), res_code);
                assert_eq!("invalid appKey", message);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn into_quotes_inner_failure() {
        let res = envelope(json!({
            "showapi_res_code": 0,
            "showapi_res_body": { "ret_code": -1, "list": [{ "day": "2025-12-11", "time": "10:30:00" }] }
        }))
        .into_quotes("USD");

        match res {
            Err(Error::Provider { res_code, ret_code, .. }) => {
                assert_eq!(Some(0), res_code);
                assert_eq!(Some(-1), ret_code);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn into_quotes_missing_body() {
        let res = envelope(json!({ "showapi_res_code": 0 })).into_quotes("USD");
        assert!(matches!(res, Err(Error::Provider { .. })));
    }

    #[test]
    fn to_price_conversions() {
        assert_eq!(Some(704.62), to_price(Some(&json!("704.62"))));
        assert_eq!(Some(704.62), to_price(Some(&json!(" 704.62 "))));
        assert_eq!(Some(7.0), to_price(Some(&json!(7))));
        assert_eq!(None, to_price(Some(&json!(""))));
        assert_eq!(None, to_price(Some(&json!("   "))));
        assert_eq!(None, to_price(Some(&json!("n/a"))));
        assert_eq!(None, to_price(Some(&json!("NaN"))));
        assert_eq!(None, to_price(Some(&json!("inf"))));
        assert_eq!(None, to_price(Some(&Value::Null)));
        assert_eq!(None, to_price(Some(&json!([]))));
        assert_eq!(None, to_price(None));
    }

    #[test]
    fn new_requires_app_key() {
        assert!(matches!(ShowApi::new(conf("")), Err(Error::Configuration(_))));
        assert!(matches!(ShowApi::new(conf("  ")), Err(Error::Configuration(_))));
        assert!(ShowApi::new(conf("key")).is_ok());
    }

    #[tokio::test]
    async fn fetch_quotes_posts_form() -> Result<()> {
        let body = json!({
            "showapi_res_code": 0,
            "showapi_res_error": "",
            "showapi_res_body": {
                "ret_code": 0,
                "list": [{
                    "hui_in": "704.62",
                    "chao_in": "",
                    "hui_out": "707.58",
                    "chao_out": "707.58",
                    "zhesuan": "706.86",
                    "code": "USD",
                    "day": "2025-12-11",
                    "time": "20:47:05"
                }]
            }
        })
        .to_string();
        let (url, server) = serve_once("200 OK", &body).await;

        let res = ShowApi::new(local_conf(url))?.fetch_quotes("USD").await?;
        let req = server.await?;

        assert!(req.starts_with("POST /105-30?appKey=test-key HTTP/1.1\r\n"), "{}", req);
        assert!(req
            .to_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(req.ends_with("\r\n\r\ncode=USD"), "{}", req);

        assert_eq!(1, res.len());
        assert_eq!("USD", res[0].currency_code);
        assert_eq!(Some(704.62), res[0].prices.spot_buy);
        assert_eq!(None, res[0].prices.cash_buy);
        assert_eq!("20:47:05", res[0].publication_time);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_quotes_provider_failure() -> Result<()> {
        let body = json!({ "showapi_res_code": -1, "showapi_res_error": "invalid appKey" }).to_string();
        let (url, server) = serve_once("200 OK", &body).await;

        let res = ShowApi::new(local_conf(url))?.fetch_quotes("USD").await;
        server.await?;

        assert!(matches!(res, Err(Error::Provider { res_code: Some(-1), .. })));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_quotes_http_error() -> Result<()> {
        let (url, server) = serve_once("500 Internal Server Error", "{}").await;

        let res = ShowApi::new(local_conf(url))?.fetch_quotes("USD").await;
        server.await?;

        assert!(matches!(res, Err(Error::Transport(_))));
        Ok(())
    }
}
