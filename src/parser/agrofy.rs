// Agrofy renders with Next.js, so the listing lives in the `__NEXT_DATA__` JSON blob
// rather than in the server-rendered HTML.
use crate::model::{ContractType, ExtractionFailure, Listing};
use crate::parser::{Extractor, FetchContext, parse_int, select_first};
use crate::price::parse_price;
use rust_decimal::Decimal;
use scraper::Html;
use serde_json::Value;
use std::str::FromStr;

pub struct AgrofyExtractor {
    ctx: FetchContext,
}

impl AgrofyExtractor {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }
}

#[async_trait::async_trait]
impl Extractor for AgrofyExtractor {
    fn name(&self) -> &'static str {
        "agrofy"
    }

    fn host(&self) -> &'static str {
        "agrofy.com.br"
    }

    async fn extract(&self, url: &str) -> Result<Listing, ExtractionFailure> {
        let body = self.ctx.fetch_page(url).await?;
        let mut listing = parse_page(&body, url)?;
        self.ctx.attach_photo(&mut listing).await;
        Ok(listing)
    }
}

fn next_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = select_first(document.root_element(), "script#__NEXT_DATA__")?;
    Some(script.text().collect())
}

pub fn parse_page(html: &str, url: &str) -> Result<Listing, ExtractionFailure> {
    let json = next_data(html)
        .ok_or_else(|| ExtractionFailure::parse(url, "missing __NEXT_DATA__ script"))?;
    let root: Value = serde_json::from_str(&json)
        .map_err(|e| ExtractionFailure::parse(url, format!("invalid __NEXT_DATA__ JSON: {}", e)))?;

    let product_data = root.pointer("/props/pageProps/productData");
    let product = match product_data.and_then(|d| d.get("product")) {
        Some(p) if p.is_object() => p,
        _ => {
            return Err(ExtractionFailure::NotFound {
                url: url.to_string(),
            });
        }
    };
    let details = product_data.and_then(|d| d.get("productDetails"));

    Ok(Listing {
        model: string_field(product, "title"),
        contract_type: Some(contract_type(string_field(product, "finalidad").as_deref())),
        make: string_field(product, "marca"),
        manufacture_year: int_attribute(details, "ano_fabricacion"),
        usage_hours: int_attribute(details, "cn2_uso"),
        location_city: string_field(product, "localizacion"),
        price: product.get("price").and_then(decimal_value),
        photo_url: first_image(product),
        ..Listing::empty(url)
    })
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn contract_type(finalidad: Option<&str>) -> ContractType {
    let Some(value) = finalidad else {
        return ContractType::Sale;
    };
    let value = value.to_lowercase();
    if ["alug", "loca", "rent"].iter().any(|k| value.contains(k)) {
        ContractType::Rent
    } else {
        ContractType::Sale
    }
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim())
            .ok()
            .or_else(|| parse_price(Some(s.as_str()))),
        _ => None,
    }
}

fn int_attribute(details: Option<&Value>, code: &str) -> Option<i32> {
    let details = details?;
    let entries: Vec<&Value> = match details {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => return None,
    };
    let entry = entries
        .into_iter()
        .find(|e| e.get("attributeCode").and_then(Value::as_str) == Some(code))?;
    match entry.get("value")? {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

fn first_image(product: &Value) -> Option<String> {
    product
        .get("images")?
        .as_array()?
        .first()
        .and_then(|img| string_field(img, "image"))
}
