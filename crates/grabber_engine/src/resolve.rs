use std::sync::OnceLock;

use grabber_logging::{grabber_debug, grabber_info};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};

use crate::client::{build_client, describe_reqwest_error, HttpSettings};
use crate::decode::decode_page_lossy;
use crate::filename::DEFAULT_FILE_NAME;
use crate::{ResolutionError, ResolvedTarget, TransferId};

/// Text that marks the inline script holding the download trigger.
const DOWNLOAD_FUNCTION_ANCHOR: &str = "function download";

/// What a page yields before a transfer id is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub display_name: String,
    pub direct_url: String,
}

#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, link: &str) -> Result<ResolvedTarget, ResolutionError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestResolver {
    settings: HttpSettings,
}

impl ReqwestResolver {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    async fn fetch_page(&self, link: &str) -> Result<String, ResolutionError> {
        let url = url::Url::parse(link).map_err(|err| ResolutionError::NetworkError {
            cause: format!("invalid url: {err}"),
        })?;
        let client = build_client(&self.settings).map_err(|err| network_error(&err))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| network_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::FetchFailed {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response.bytes().await.map_err(|err| network_error(&err))?;
        let page = decode_page_lossy(&bytes, content_type.as_deref());
        grabber_debug!(
            "fetched page {} ({} bytes, {})",
            link,
            bytes.len(),
            page.encoding_label
        );
        Ok(page.html)
    }
}

#[async_trait::async_trait]
impl Resolver for ReqwestResolver {
    async fn resolve(&self, link: &str) -> Result<ResolvedTarget, ResolutionError> {
        grabber_info!("Processing link: {link}");
        let html = self.fetch_page(link).await?;
        let parsed = parse_page(&html)?;
        grabber_info!("Found download URL: {}", parsed.direct_url);
        Ok(ResolvedTarget {
            display_name: parsed.display_name,
            direct_url: parsed.direct_url,
            transfer_id: TransferId::generate(),
        })
    }
}

fn network_error(err: &reqwest::Error) -> ResolutionError {
    ResolutionError::NetworkError {
        cause: describe_reqwest_error(err),
    }
}

/// Pulls the display name and the direct download URL out of a page.
pub fn parse_page(html: &str) -> Result<ParsedPage, ResolutionError> {
    let doc = Html::parse_document(html);
    let direct_url = find_download_url(&doc).ok_or(ResolutionError::PatternNotFound)?;
    Ok(ParsedPage {
        display_name: extract_display_name(&doc),
        direct_url,
    })
}

fn extract_display_name(doc: &Html) -> String {
    Selector::parse(r#"meta[name="title"]"#)
        .ok()
        .and_then(|sel| {
            doc.select(&sel)
                .filter_map(|meta| meta.value().attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

/// First `window.open` URL inside the first script that defines the download function.
fn find_download_url(doc: &Html) -> Option<String> {
    let script_sel = Selector::parse("script").ok()?;
    doc.select(&script_sel)
        .map(|script| script.text().collect::<String>())
        .filter(|text| text.contains(DOWNLOAD_FUNCTION_ANCHOR))
        .find_map(|text| match_window_open(&text))
}

fn match_window_open(script: &str) -> Option<String> {
    static WINDOW_OPEN: OnceLock<Option<Regex>> = OnceLock::new();
    let re = WINDOW_OPEN
        .get_or_init(|| Regex::new(r#"window\.open\(["'](https?://[^\s"')]+)"#).ok())
        .as_ref()?;
    re.captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
