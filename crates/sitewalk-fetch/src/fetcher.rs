use std::io::Read;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use lazy_static::lazy_static;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Response;
use scraper::{Html, Selector};
use sitewalk_crawler::{canonicalize, FetchedPage, PageFetcher};
use url::Url;

use crate::config::FetcherConfig;

lazy_static! {
    static ref LINKS: Selector = Selector::parse("a[href]").unwrap();
    static ref BODY: Selector = Selector::parse("body").unwrap();
}

const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Page fetcher over plain HTTP, tries `http://` first then `https://`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(lang) = &config.accept_language {
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(lang)?);
        }
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn address(&self, scheme: &str, domain: &str) -> String {
        let www = if self.config.prefix_www { "www." } else { "" };
        format!("{scheme}://{www}{domain}")
    }

    async fn load(&self, domain: &str) -> Result<Response> {
        let insecure = self.address("http", domain);
        let resp = match self.client.get(&insecure).send().await {
            Ok(resp) => resp,
            Err(e) => {
                log::debug!("Retrying {domain} over https after: {e}");
                let secure = self.address("https", domain);
                self.client
                    .get(&secure)
                    .send()
                    .await
                    .with_context(|| format!("Couldn't load {domain} over http nor https"))?
            }
        };
        Ok(resp.error_for_status()?)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, domain: &str) -> Result<FetchedPage> {
        let resp = self.load(domain).await?;
        let resolved = resp.url().clone();
        let body = read_body(resp).await?;

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        log::trace!("Parsing {resolved} ({} bytes)", body.len());
        Ok(parse_page(&resolved, &body))
    }
}

async fn read_body(resp: Response) -> Result<String> {
    let page = match resp.headers().get(CONTENT_TYPE) {
        Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
            let compressed = resp.bytes().await?;
            let mut gz = GzDecoder::new(&compressed[..]);
            let mut page = String::new();
            gz.read_to_string(&mut page)?;
            page
        }
        _ => resp.text().await?,
    };
    Ok(page)
}

/// Extracts absolute link targets and visible text out of an html page served at `location`.
pub fn parse_page(location: &Url, html: &str) -> FetchedPage {
    let document = Html::parse_document(html);
    let links = document
        .select(&LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(location, href))
        .collect();

    FetchedPage {
        resolved: location.to_string(),
        links,
        text: extract_text(&document),
    }
}

fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn extract_text(document: &Html) -> String {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|parent| {
                parent
                    .value()
                    .as_element()
                    .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            (!hidden).then_some(&**text)
        })
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fetches a single page outside of any crawl.
pub async fn fetch_page(config: &FetcherConfig, url: &str) -> Result<FetchedPage> {
    let domain = canonicalize(url).ok_or_else(|| anyhow!("Invalid url: {url:?}"))?;
    HttpFetcher::new(config)?.fetch(&domain).await
}
