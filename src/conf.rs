use crate::{error::Result, provider::ShowApiConf};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Deserialize;
use std::{
    env,
    fs::create_dir_all,
    path::{Path, PathBuf},
};

const CONF_FILE: &str = "ratekeeper.conf";
const APP_KEY_VAR: &str = "SHOWAPI_APPKEY";

#[derive(Debug, Deserialize)]
pub struct Conf {
    pub data_dir: PathBuf,
    pub currencies: Vec<String>,
    pub db_file: String,
    pub log_file: String,
    pub showapi: ShowApiConf,
}

impl Conf {
    pub fn new() -> Result<Conf> {
        Conf::load(&data_dir()?)
    }

    /// Built-in defaults, then `ratekeeper.conf` in `data_dir`, then
    /// `RATEKEEPER_*` variables, then `SHOWAPI_APPKEY`.
    pub fn load(data_dir: &Path) -> Result<Conf> {
        let default_conf = include_str!("../ratekeeper.conf");

        let mut figment = Figment::new()
            .merge(Toml::string(default_conf))
            .merge(Toml::file(data_dir.join(CONF_FILE)))
            .merge(Env::prefixed("RATEKEEPER_").split("__"));

        // Taken verbatim: keys may look like numbers or booleans.
        if let Some(app_key) = env::var_os(APP_KEY_VAR) {
            let app_key = app_key.to_string_lossy().into_owned();
            figment = figment.merge(Serialized::default("showapi.app_key", app_key));
        }

        let conf: Conf = figment
            .merge(Serialized::default("data_dir", data_dir))
            .extract()?;

        conf.showapi.validate()?;
        Ok(conf)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }
}

/// `RATEKEEPER_DATA_DIR`, else the per-user local data dir, else
/// `./ratekeeper_data`. Created if missing.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match env::var_os("RATEKEEPER_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => match dirs::data_local_dir() {
            Some(dir) => dir.join("ratekeeper"),
            None => env::current_dir()?.join("ratekeeper_data"),
        },
    };
    create_dir_all(&dir)?;
    Ok(dir)
}
