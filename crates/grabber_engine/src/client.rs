use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT,
};

pub const DEFAULT_REFERER: &str = "https://fitgirl-repacks.site/";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
const BROWSER_SEC_CH_UA: &str = r#""Brave";v="131", "Chromium";v="131", "Not_A Brand";v="24""#;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Transport settings shared by the resolver and the transfer engine.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Per-read idle limit; `None` lets a stalled stream hang.
    pub read_timeout: Option<Duration>,
    pub redirect_limit: usize,
    pub referer: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            redirect_limit: 10,
            referer: DEFAULT_REFERER.to_string(),
        }
    }
}

/// Browser-like header set sent with every outbound request.
pub fn browser_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(BROWSER_SEC_CH_UA),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static("\"Windows\""),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    // An unusable referer is dropped rather than failing every request.
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    headers
}

pub(crate) fn build_client(settings: &HttpSettings) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .default_headers(browser_headers(&settings.referer))
        .connect_timeout(settings.connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit));
    if let Some(read_timeout) = settings.read_timeout {
        builder = builder.read_timeout(read_timeout);
    }
    builder.build()
}

/// Short, display-safe description of a transport error.
pub(crate) fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return format!("timeout: {err}");
    }
    if err.is_redirect() {
        return format!("redirect limit exceeded: {err}");
    }
    if err.is_connect() {
        return format!("connection failed: {err}");
    }
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_referer_and_browser_identity() {
        let headers = browser_headers(DEFAULT_REFERER);
        assert_eq!(headers.get(REFERER).unwrap(), DEFAULT_REFERER);
        assert!(headers
            .get(USER_AGENT)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Chrome/131"));
        assert_eq!(headers.get("sec-ch-ua-mobile").unwrap(), "?0");
    }

    #[test]
    fn invalid_referer_is_skipped() {
        let headers = browser_headers("bad\nvalue");
        assert!(headers.get(REFERER).is_none());
        assert!(headers.get(ACCEPT).is_some());
    }
}
