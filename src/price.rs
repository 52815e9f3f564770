// Brazilian-formatted price parsing ("R$ 1.234,56")
use rust_decimal::Decimal;
use std::str::FromStr;

const CURRENCY_PREFIX: &str = "R$";

/// Parses a pt-BR price string: `.` groups thousands, `,` marks decimals.
/// Returns `None` for blank input or anything outside that grammar.
pub fn parse_price(text: Option<&str>) -> Option<Decimal> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }

    let without_prefix = text.strip_prefix(CURRENCY_PREFIX).unwrap_or(text);
    let cleaned: String = without_prefix
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    let (integer, fraction) = match digits.split_once(',') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };

    if !is_grouped_integer(integer) {
        return None;
    }
    if let Some(frac) = fraction {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let mut normalized = String::with_capacity(cleaned.len());
    if negative {
        normalized.push('-');
    }
    normalized.extend(integer.chars().filter(|c| *c != '.'));
    if let Some(frac) = fraction {
        normalized.push('.');
        normalized.push_str(frac);
    }

    // rust_decimal rounds digits it cannot hold instead of failing
    let value = Decimal::from_str(&normalized).ok()?;
    let expected_scale = fraction.map_or(0, str::len);
    (value.scale() as usize == expected_scale).then_some(value)
}

/// Either plain digits, or 1-3 leading digits followed by `.ddd` groups.
fn is_grouped_integer(integer: &str) -> bool {
    if integer.is_empty() {
        return false;
    }
    if !integer.contains('.') {
        return integer.bytes().all(|b| b.is_ascii_digit());
    }

    let mut groups = integer.split('.');
    let head_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    head_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}
