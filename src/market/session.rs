//! Session bootstrapping.
//!
//! The market's GraphQL endpoint rejects requests that do not echo the
//! `XSRF-TOKEN` cookie back as an `x-xsrf-token` header. A `HEAD` request
//! against the market page makes the server set that cookie.

use super::error::CatalogError;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, info};
use url::Url;

/// Name of the anti-forgery cookie set by the market.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Header that carries the anti-forgery token on GraphQL requests.
pub const XSRF_HEADER: &str = "x-xsrf-token";

/// An established market session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub xsrf_token: String,
}

/// Establish a session and pull the anti-forgery token out of `jar`.
///
/// `http` must have been built with `jar` as its cookie provider.
pub async fn establish(
    http: &reqwest::Client,
    jar: &Jar,
    market_url: &Url,
) -> Result<Session, CatalogError> {
    info!("Establishing market session: {}", market_url);

    let response = http.head(market_url.clone()).send().await?;
    debug!("Session bootstrap returned {}", response.status());

    let header = jar.cookies(market_url).ok_or(CatalogError::MissingToken)?;
    let header = header
        .to_str()
        .map_err(|_| CatalogError::MissingToken)?;

    match find_cookie(header, XSRF_COOKIE) {
        Some(token) if !token.is_empty() => {
            debug!("Obtained {} ({} bytes)", XSRF_COOKIE, token.len());
            Ok(Session {
                xsrf_token: token.to_string(),
            })
        }
        _ => Err(CatalogError::MissingToken),
    }
}

/// Look up `name` in a `Cookie` header value (`a=1; b=2`).
///
/// When a name repeats, the last value wins.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .last()
}
