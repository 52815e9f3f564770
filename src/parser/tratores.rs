use crate::model::{ContractType, ExtractionFailure, Listing};
use crate::parser::{Extractor, FetchContext, own_text, parse_int, resolve_url, select_all, select_first, text_of};
use crate::price::parse_price;
use scraper::Html;

/// Shopify-based storefront for tratoresecolheitadeiras.com.br.
pub struct TratoresExtractor {
    ctx: FetchContext,
}

impl TratoresExtractor {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }
}

#[async_trait::async_trait]
impl Extractor for TratoresExtractor {
    fn name(&self) -> &'static str {
        "tratoresecolheitadeiras"
    }

    fn host(&self) -> &'static str {
        "tratoresecolheitadeiras.com.br"
    }

    async fn extract(&self, url: &str) -> Result<Listing, ExtractionFailure> {
        let body = self.ctx.fetch_page(url).await?;
        let mut listing = parse_page(&body, url);
        self.ctx.attach_photo(&mut listing).await;
        Ok(listing)
    }
}

/// `<p>Label: <strong>value</strong></p>` rows in the description block.
fn detail(document: &Html, label: &str) -> Option<String> {
    select_all(document, "p")
        .into_iter()
        .find(|p| own_text(*p).contains(label))
        .and_then(|p| select_first(p, "strong"))
        .and_then(text_of)
}

/// The address is the trailing text node of the last description bullet.
fn city(document: &Html) -> Option<String> {
    let last_item = select_all(document, ".product-single__description.rte li")
        .into_iter()
        .last()?;
    let text = last_item.children().last()?.value().as_text()?.trim().to_string();
    (!text.is_empty()).then_some(text)
}

pub fn parse_page(html: &str, url: &str) -> Listing {
    let document = Html::parse_document(html);
    let root = document.root_element();

    Listing {
        model: select_first(root, ".product-single__title").and_then(text_of),
        contract_type: Some(ContractType::Sale),
        make: detail(&document, "Marca"),
        manufacture_year: detail(&document, "Ano de Fabricação").and_then(|y| parse_int(&y)),
        usage_hours: detail(&document, "Horas").and_then(|h| parse_int(&h)),
        location_city: city(&document),
        price: detail(&document, "Preço").and_then(|p| parse_price(Some(p.as_str()))),
        photo_url: select_first(root, "[data-image]")
            .and_then(|e| e.value().attr("data-image"))
            .and_then(|src| resolve_url(url, src)),
        ..Listing::empty(url)
    }
}
