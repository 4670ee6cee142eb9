use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(crate::config::request_timeout())
            .build()
            .context("failed to build http client")
    })
}

pub fn is_transient(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(status) = cause.downcast_ref::<crate::http_cache::HttpStatusError>() {
            return status.is_transient();
        }
        if let Some(req) = cause.downcast_ref::<reqwest::Error>() {
            return req.is_timeout() || req.is_connect() || req.is_request();
        }
    }
    false
}
