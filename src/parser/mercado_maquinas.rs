use crate::model::{ContractType, ExtractionFailure, Listing};
use crate::parser::{Extractor, FetchContext, parse_int, resolve_url, select_all, select_first, text_of};
use crate::price::parse_price;
use scraper::Html;

pub struct MercadoMaquinasExtractor {
    ctx: FetchContext,
}

impl MercadoMaquinasExtractor {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }
}

#[async_trait::async_trait]
impl Extractor for MercadoMaquinasExtractor {
    fn name(&self) -> &'static str {
        "mercadomaquinas"
    }

    fn host(&self) -> &'static str {
        "mercadomaquinas.com.br"
    }

    async fn extract(&self, url: &str) -> Result<Listing, ExtractionFailure> {
        let body = self.ctx.fetch_page(url).await?;
        let mut listing = parse_page(&body, url);
        self.ctx.attach_photo(&mut listing).await;
        Ok(listing)
    }
}

/// Value of the `li.item` row whose `span.item-name` carries `label`.
fn product_info(document: &Html, label: &str) -> Option<String> {
    select_all(document, "li.item")
        .into_iter()
        .find(|row| {
            select_first(*row, "span.item-name")
                .and_then(text_of)
                .is_some_and(|name| name.contains(label))
        })
        .and_then(|row| select_first(row, "span.item-value"))
        .and_then(text_of)
}

fn worked_hours(document: &Html) -> Option<i32> {
    select_all(document, "li.item.spec")
        .into_iter()
        .find(|row| {
            select_first(*row, "span.name")
                .and_then(text_of)
                .is_some_and(|name| name.contains("Horas trabalhadas:"))
        })
        .and_then(|row| select_first(row, "span.value"))
        .and_then(text_of)
        .and_then(|value| parse_int(&value))
}

/// Best effort: every field the page lacks stays `None`.
pub fn parse_page(html: &str, url: &str) -> Listing {
    let document = Html::parse_document(html);
    let root = document.root_element();

    Listing {
        model: select_first(root, "h1.title").and_then(text_of),
        contract_type: Some(ContractType::Sale),
        make: product_info(&document, "Fabricante:"),
        manufacture_year: product_info(&document, "Ano:").and_then(|y| parse_int(&y)),
        usage_hours: worked_hours(&document),
        location_city: product_info(&document, "Localização:"),
        price: select_first(root, "div.price span.value")
            .and_then(text_of)
            .and_then(|p| parse_price(Some(p.as_str()))),
        photo_url: select_first(root, "#ad-main-photo img")
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve_url(url, src)),
        ..Listing::empty(url)
    }
}
