use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use divvy_core::Money;

use crate::types::ParsedItem;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_price_two_dp, r"\d+[.,]\d{2}");
re!(re_price_one_dp, r"\d+[.,]\d{1}");
re!(re_bare_digits, r"\d+");
re!(re_digit_run, r"\d+[.,]?\d*");

// ── Public API ───────────────────────────────────────────────────────────────

/// Parse raw OCR text into `(description, price)` candidates, one attempt per
/// non-empty line. Receipts vary wildly (tabs vs. spaces, currency symbols,
/// thousands separators, decimal commas), so each line runs through a sequence
/// of independent strategies and a line that defeats all of them is skipped
/// without failing the rest of the ticket.
pub fn parse_receipt(text: &str) -> Vec<ParsedItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

/// Try each strategy in order; the first to produce a candidate wins.
pub fn parse_line(line: &str) -> Option<ParsedItem> {
    const STRATEGIES: [fn(&str) -> Option<ParsedItem>; 3] =
        [tail_amount, pattern_amount, leading_description];

    for strategy in STRATEGIES {
        if let Some(item) = strategy(line) {
            return Some(item);
        }
    }
    tracing::debug!(line, "no parse strategy matched, line skipped");
    None
}

// ── Strategies ───────────────────────────────────────────────────────────────

/// Split on the last whitespace run: everything after it is the price,
/// everything before it the description. Currency symbols and thousands
/// separators are stripped before the numeric parse.
fn tail_amount(line: &str) -> Option<ParsedItem> {
    let gap = line.rfind(char::is_whitespace)?;
    let (left, right) = line.split_at(gap);
    let price = parse_trailing_price(right.trim_start())?;
    let description = left.trim();
    if description.is_empty() {
        return None;
    }
    Some(ParsedItem::new(description, Money::from_decimal(price)))
}

/// Search the line for a price-shaped substring, in priority order: two
/// decimal places, one decimal place, bare digit run. The first match
/// scanning left to right wins; the description is the prefix before it.
fn pattern_amount(line: &str) -> Option<ParsedItem> {
    for re in [re_price_two_dp(), re_price_one_dp(), re_bare_digits()] {
        let Some(m) = re.find(line) else { continue };
        let description = line[..m.start()].trim();
        if description.is_empty() {
            continue;
        }
        let Ok(price) = Decimal::from_str(&m.as_str().replace(',', ".")) else {
            continue;
        };
        return Some(ParsedItem::new(description, Money::from_decimal(price)));
    }
    None
}

/// Split at the boundary where the first digit run starts: the non-digit
/// prefix is the description, the run (decimal comma normalized) the price.
fn leading_description(line: &str) -> Option<ParsedItem> {
    let m = re_digit_run().find(line)?;
    let description = line[..m.start()].trim();
    if description.is_empty() {
        return None;
    }
    let price = Decimal::from_str(&m.as_str().replace(',', ".")).ok()?;
    Some(ParsedItem::new(description, Money::from_decimal(price)))
}

fn parse_trailing_price(s: &str) -> Option<Decimal> {
    let clean: String = s.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let dec = Decimal::from_str(&clean).ok()?;
    (dec >= Decimal::ZERO).then_some(dec)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Money {
        Money::from_decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn parses_aligned_receipt_in_order() {
        let text = "Hamburguesa    10.99\nRefresco       2.50\nPapas fritas   3.99";
        let items = parse_receipt(text);
        assert_eq!(
            items,
            vec![
                ParsedItem::new("Hamburguesa", price("10.99")),
                ParsedItem::new("Refresco", price("2.50")),
                ParsedItem::new("Papas fritas", price("3.99")),
            ]
        );
    }

    #[test]
    fn tabs_are_whitespace_too() {
        let items = parse_receipt("Cafe con leche\t3.20");
        assert_eq!(items, vec![ParsedItem::new("Cafe con leche", price("3.20"))]);
    }

    #[test]
    fn strips_currency_symbol_and_thousands_separator() {
        let items = parse_receipt("Banquete $1,234.56");
        assert_eq!(items, vec![ParsedItem::new("Banquete", price("1234.56"))]);
    }

    #[test]
    fn multiword_description_survives_tail_split() {
        let items = parse_receipt("Tacos al pastor x3 45.00");
        assert_eq!(items, vec![ParsedItem::new("Tacos al pastor x3", price("45.00"))]);
    }

    #[test]
    fn empty_and_blank_lines_are_skipped() {
        assert!(parse_receipt("").is_empty());
        assert!(parse_receipt("\n   \n\t\n").is_empty());
    }

    #[test]
    fn garbage_line_does_not_poison_the_ticket() {
        let text = "-------------------\nHamburguesa 10.99\n!!??\nRefresco 2.50";
        let items = parse_receipt(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Hamburguesa");
        assert_eq!(items[1].description, "Refresco");
    }

    #[test]
    fn negative_tail_price_is_rejected_by_primary_strategy() {
        // The tail split refuses negative amounts; the pattern fallback then
        // finds the digit run, which carries no sign.
        let items = parse_receipt("Descuento -5.00");
        assert_eq!(items, vec![ParsedItem::new("Descuento -", price("5.00"))]);
    }

    #[test]
    fn no_whitespace_falls_through_to_pattern_match() {
        let items = parse_receipt("Cola1.50");
        assert_eq!(items, vec![ParsedItem::new("Cola", price("1.50"))]);
    }

    #[test]
    fn pattern_priority_prefers_two_decimals() {
        // The tail token "8.50ea" defeats the primary strategy. In the pattern
        // fallback, the bare digit "2" in "2x1" sits earlier in the line, but
        // the two-decimal pattern has priority across the whole line.
        let items = parse_receipt("Promo 2x1 cerveza 8.50ea");
        assert_eq!(items, vec![ParsedItem::new("Promo 2x1 cerveza", price("8.50"))]);
    }

    #[test]
    fn one_decimal_place_price() {
        let items = parse_receipt("Agua 10.5");
        assert_eq!(items, vec![ParsedItem::new("Agua", price("10.5"))]);
    }

    #[test]
    fn bare_digits_price() {
        let items = parse_receipt("Menu del dia 120");
        assert_eq!(items, vec![ParsedItem::new("Menu del dia", price("120"))]);
    }

    #[test]
    fn decimal_comma_is_normalized_in_fallback() {
        // No-whitespace line forces the pattern strategy, which maps ',' → '.'.
        let items = parse_receipt("Tortilla2,50");
        assert_eq!(items, vec![ParsedItem::new("Tortilla", price("2.50"))]);
    }

    #[test]
    fn line_with_no_description_is_discarded() {
        assert!(parse_receipt("10.99").is_empty());
        assert!(parse_receipt("   3.50").is_empty());
    }

    #[test]
    fn zero_price_is_parsed_and_left_to_validation() {
        let items = parse_receipt("Cortesia 0.00");
        assert_eq!(items, vec![ParsedItem::new("Cortesia", price("0.00"))]);
    }

    #[test]
    fn partial_parse_is_a_first_class_outcome() {
        let text = "RESTAURANTE EJEMPLO\nHamburguesa 10.99\nsin precio aqui";
        let items = parse_receipt(text);
        assert_eq!(items, vec![ParsedItem::new("Hamburguesa", price("10.99"))]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let items = parse_receipt("   Flan de la casa    4.25   ");
        assert_eq!(items, vec![ParsedItem::new("Flan de la casa", price("4.25"))]);
    }
}
