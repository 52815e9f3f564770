// Site extractors: each one claims a marketplace host and maps its pages into a Listing.
pub mod agrofy;
pub mod mercado_maquinas;
pub mod tratores;

pub use agrofy::AgrofyExtractor;
pub use mercado_maquinas::MercadoMaquinasExtractor;
pub use tratores::TratoresExtractor;

use crate::fetch::{ImageFetcher, PageFetcher};
use crate::model::{ExtractionFailure, Listing};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use url::Url;

#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registrable domain this extractor claims, e.g. `agrofy.com.br`.
    fn host(&self) -> &'static str;

    fn matches(&self, url: &str) -> bool {
        host_matches(url, self.host())
    }

    async fn extract(&self, url: &str) -> Result<Listing, ExtractionFailure>;
}

/// Collaborators shared by every extractor.
#[derive(Clone)]
pub struct FetchContext {
    pub pages: Arc<dyn PageFetcher>,
    pub images: Option<Arc<dyn ImageFetcher>>,
}

impl FetchContext {
    pub fn new(pages: Arc<dyn PageFetcher>, images: Option<Arc<dyn ImageFetcher>>) -> Self {
        Self { pages, images }
    }

    pub async fn fetch_page(&self, url: &str) -> Result<String, ExtractionFailure> {
        self.pages
            .fetch(url)
            .await
            .map_err(|e| ExtractionFailure::from_fetch(url, e))
    }

    pub async fn attach_photo(&self, listing: &mut Listing) {
        if let (Some(images), Some(photo_url)) = (&self.images, &listing.photo_url) {
            listing.photo_data = images.fetch_base64(photo_url).await;
        }
    }
}

/// Extracts the host of `url`, tolerating a missing scheme, userinfo and port.
pub fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    host_port.split(':').next().unwrap_or("")
}

/// True when the URL's host is `domain` or one of its subdomains.
pub fn host_matches(url: &str, domain: &str) -> bool {
    let host = host_of(url);
    let Some(split) = host.len().checked_sub(domain.len()) else {
        return false;
    };
    if !host.is_char_boundary(split) {
        return false;
    }
    let (prefix, tail) = host.split_at(split);
    tail.eq_ignore_ascii_case(domain) && (prefix.is_empty() || prefix.ends_with('.'))
}

/// Resolves a possibly relative `src` against the page URL.
pub fn resolve_url(base: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    if let Ok(absolute) = Url::parse(src) {
        return Some(absolute.to_string());
    }
    Url::parse(base)
        .or_else(|_| Url::parse(&format!("https://{}", base)))
        .and_then(|b| b.join(src))
        .ok()
        .map(|u| u.to_string())
}

pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

pub(crate) fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Element text with whitespace collapsed; `None` when empty.
pub(crate) fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Text of the element's direct text children only.
pub(crate) fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect::<String>()
}

/// Parses counts like `2.150 h` or ` 120 `.
pub(crate) fn parse_int(text: &str) -> Option<i32> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();
    let cleaned = cleaned.trim_end_matches(['h', 'H', 's']);
    cleaned.parse().ok()
}
