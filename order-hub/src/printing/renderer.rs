//! Receipt renderer
//!
//! Renders an order snapshot into fixed-width receipt text for the kitchen or
//! the courier. Pure: no state, no I/O, never fails.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::collections::HashMap;
use shared::order::{DeliveryAddress, MergeKey, Order, OrderItem, PaymentMethod};
use shared::util::non_blank;
use ticket_printer::{TicketBuilder, is_rule_line};
use tracing::instrument;

use super::types::PrintJobKind;

const DEFAULT_CATEGORY: &str = "Items";
const DETAIL_INDENT: &str = "   ";
const DETAIL_DELIMITER: &str = " | ";

/// Receipt layout settings
#[derive(Debug, Clone)]
pub struct ReceiptConfig {
    /// Characters per line (58mm: 32, 80mm: 42-48)
    pub width: usize,
    pub store_name: String,
    pub timezone: Tz,
    pub currency_symbol: String,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            width: 42,
            store_name: "Order Hub".to_string(),
            timezone: chrono_tz::America::Sao_Paulo,
            currency_symbol: "R$".to_string(),
        }
    }
}

/// An item after merging equivalent lines
#[derive(Debug)]
struct MergedItem<'a> {
    item: &'a OrderItem,
    quantity: u32,
}

/// Receipt formatter
///
/// Merges equivalent items, groups them by category in first-seen order and
/// wraps them in a header and footer. Kitchen tickets never show money.
#[derive(Debug, Clone, Default)]
pub struct ReceiptFormatter {
    config: ReceiptConfig,
}

impl ReceiptFormatter {
    pub fn new(config: ReceiptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReceiptConfig {
        &self.config
    }

    /// Render an order to receipt text
    #[instrument(skip_all, fields(order_id = %order.id, kind = %kind))]
    pub fn format(&self, order: &Order, kind: PrintJobKind) -> String {
        let mut b = TicketBuilder::new(self.config.width);

        self.render_header(&mut b, order, kind);
        b.sep_double();

        let merged = merge_items(&order.items);
        let groups = group_by_category(&merged);
        let mut item_lines = Vec::with_capacity(merged.len());
        for (idx, (category, items)) in groups.iter().enumerate() {
            if idx > 0 {
                b.newline();
            }
            self.render_category(&mut b, category, items, &mut item_lines);
        }

        b.sep_double();
        self.render_footer(&mut b, order, kind);

        let mut out = String::new();
        for line in dedupe_adjacent(b.into_lines(), &item_lines) {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// Render the header section
    fn render_header(&self, b: &mut TicketBuilder, order: &Order, kind: PrintJobKind) {
        b.center(non_blank(Some(self.config.store_name.as_str())).unwrap_or("-"));
        b.center(kind.ticket_label());
        b.sep_double();

        b.line(&format!("Order #{}", order.display_number()));
        b.line(&format!(
            "Date: {}",
            format_timestamp(order.created_at, self.config.timezone)
        ));
        b.line(&format!("Type: {}", order.delivery_type.label()));
        b.wrapped(
            "",
            &format!(
                "Customer: {}",
                non_blank(Some(order.customer_name.as_str())).unwrap_or("-")
            ),
        );
        if let Some(phone) = non_blank(order.customer_phone.as_deref()) {
            b.line(&format!("Phone: {}", phone));
        }

        if order.is_delivery() {
            match &order.address {
                Some(address) => render_address(b, address),
                None => {
                    b.line("Address: (address missing)");
                }
            }
        }

        if kind == PrintJobKind::Kitchen
            && let Some(minutes) = order.prep_time_minutes
        {
            b.line(&format!("Ready in: {} min", minutes));
        }
    }

    /// Render a category section, recording where each item line starts
    fn render_category(
        &self,
        b: &mut TicketBuilder,
        category: &str,
        items: &[&MergedItem<'_>],
        item_lines: &mut Vec<usize>,
    ) {
        b.line(&format!("[{}]", category));
        for item in items {
            item_lines.push(b.lines().len());
            self.render_item(b, item);
        }
    }

    /// Render a single item: `{qty}x {name}` plus an optional detail line
    fn render_item(&self, b: &mut TicketBuilder, merged: &MergedItem<'_>) {
        b.wrapped("", &format!("{}x {}", merged.quantity, display_name(merged.item)));

        let details = item_details(merged.item);
        if !details.is_empty() {
            b.wrapped(DETAIL_INDENT, &details.join(DETAIL_DELIMITER));
        }
    }

    /// Render the footer section
    fn render_footer(&self, b: &mut TicketBuilder, order: &Order, kind: PrintJobKind) {
        b.line(&format!("Payment: {}", order.payment_method));

        if kind == PrintJobKind::Courier {
            b.sep_single();
            b.line_lr("Subtotal", &self.money(order.subtotal));
            b.line_lr("Delivery fee", &self.money(order.delivery_fee));
            b.line_lr("Total", &self.money(order.total));

            if order.payment_method == PaymentMethod::Cash
                && let Some(change_for) = order.change_for
            {
                b.line_lr("Change for", &self.money(change_for));
                if change_for > order.total {
                    b.line_lr("Change due", &self.money(change_for - order.total));
                }
            }
        }
        b.sep_single();
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{} {:.2}", self.config.currency_symbol, amount)
    }
}

/// Detail parts of an item, in print order: extras, removals, note
fn item_details(item: &OrderItem) -> Vec<String> {
    let mut parts = Vec::new();

    let extras: Vec<&str> = item
        .extras
        .iter()
        .filter_map(|e| non_blank(Some(e.name.as_str())))
        .collect();
    if !extras.is_empty() {
        parts.push(format!("+ {}", extras.join(", ")));
    }

    let mut removed: Vec<&str> = Vec::new();
    for name in item.removed.iter().chain(item.unavailable.iter()) {
        if let Some(name) = non_blank(Some(name.as_str()))
            && !removed.contains(&name)
        {
            removed.push(name);
        }
    }
    if !removed.is_empty() {
        parts.push(format!("Remove: {}", removed.join(", ")));
    }

    if let Some(note) = non_blank(item.note.as_deref()) {
        parts.push(format!("Note: {}", note));
    }

    parts
}

fn render_address(b: &mut TicketBuilder, address: &DeliveryAddress) {
    let street = non_blank(Some(address.street.as_str())).unwrap_or("(address missing)");
    let first = match non_blank(address.number.as_deref()) {
        Some(number) => format!("Address: {}, {}", street, number),
        None => format!("Address: {}", street),
    };
    b.wrapped("", &first);

    if let Some(complement) = non_blank(address.complement.as_deref()) {
        b.wrapped("  ", complement);
    }

    let area: Vec<&str> = [address.neighborhood.as_deref(), address.city.as_deref()]
        .into_iter()
        .filter_map(non_blank)
        .collect();
    if !area.is_empty() {
        b.wrapped("  ", &area.join(" - "));
    }

    if let Some(reference) = non_blank(address.reference.as_deref()) {
        b.wrapped("  ", &format!("Ref: {}", reference));
    }
}

/// Merge equivalent items, preserving first-seen order.
///
/// Items that would print identically in the same category are merged too,
/// otherwise the adjacent-duplicate pass would swallow one of them.
fn merge_items(items: &[OrderItem]) -> Vec<MergedItem<'_>> {
    let mut merged: Vec<MergedItem<'_>> = Vec::with_capacity(items.len());
    let mut by_key: HashMap<MergeKey, usize> = HashMap::with_capacity(items.len());
    let mut by_print: HashMap<(&str, String, String), usize> = HashMap::with_capacity(items.len());

    for item in items {
        let key = item.merge_key();
        let printed = (
            category_of(item),
            display_name(item).to_string(),
            item_details(item).join(DETAIL_DELIMITER),
        );

        match by_key.get(&key).or_else(|| by_print.get(&printed)).copied() {
            Some(idx) => {
                let entry = &mut merged[idx];
                entry.quantity = entry.quantity.saturating_add(item.quantity);
                by_key.entry(key).or_insert(idx);
                by_print.entry(printed).or_insert(idx);
            }
            None => {
                let idx = merged.len();
                merged.push(MergedItem {
                    item,
                    quantity: item.quantity,
                });
                by_key.insert(key, idx);
                by_print.insert(printed, idx);
            }
        }
    }

    merged
}

fn category_of(item: &OrderItem) -> &str {
    non_blank(item.category.as_deref()).unwrap_or(DEFAULT_CATEGORY)
}

fn display_name(item: &OrderItem) -> &str {
    non_blank(Some(item.name.as_str())).unwrap_or("(unnamed item)")
}

/// Group merged items by category, categories in first-seen order
fn group_by_category<'m, 'a>(
    items: &'m [MergedItem<'a>],
) -> Vec<(String, Vec<&'m MergedItem<'a>>)> {
    let mut groups: Vec<(String, Vec<&MergedItem<'a>>)> = Vec::new();

    for merged in items {
        let category = category_of(merged.item).to_string();
        match groups.iter_mut().find(|(name, _)| *name == category) {
            Some((_, group)) => group.push(merged),
            None => groups.push((category, vec![merged])),
        }
    }

    groups
}

/// Drop exact duplicate non-blank lines that follow each other.
///
/// Rule lines, blank lines and the first line of each item (`keep`, sorted
/// indices) are kept as they are: an item line always stands for real food.
fn dedupe_adjacent(lines: Vec<String>, keep: &[usize]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (idx, line) in lines.into_iter().enumerate() {
        let duplicate = out.last().is_some_and(|prev| *prev == line)
            && !line.trim().is_empty()
            && !is_rule_line(&line)
            && keep.binary_search(&idx).is_err();
        if !duplicate {
            out.push(line);
        }
    }
    out
}

/// Format unix timestamp (millis) as `dd/mm/YYYY HH:MM` in the given timezone
fn format_timestamp(ts: i64, tz: Tz) -> String {
    match chrono::DateTime::from_timestamp_millis(ts) {
        Some(dt) => dt.with_timezone(&tz).format("%d/%m/%Y %H:%M").to_string(),
        None => "--/--/---- --:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::order::{DeliveryType, OrderStatus};

    fn order_with(items: Vec<OrderItem>) -> Order {
        Order {
            id: "ord-1".to_string(),
            number: Some(42),
            customer_name: "Ana".to_string(),
            customer_phone: Some("11 99999-0000".to_string()),
            delivery_type: DeliveryType::Delivery,
            address: Some(DeliveryAddress {
                street: "Rua das Flores".to_string(),
                number: Some("120".to_string()),
                complement: Some("Apt 3".to_string()),
                neighborhood: Some("Centro".to_string()),
                city: Some("Sao Paulo".to_string()),
                reference: None,
            }),
            payment_method: PaymentMethod::Cash,
            change_for: Some(dec!(50)),
            items,
            subtotal: dec!(30.00),
            delivery_fee: dec!(5.00),
            total: dec!(35.00),
            status: OrderStatus::Preparing,
            prep_time_minutes: Some(25),
            created_at: 1_705_912_335_000, // 2024-01-22 08:32:15 UTC
        }
    }

    fn burger() -> OrderItem {
        OrderItem::new("X-Burger", 1, dec!(15.00))
    }

    #[test]
    fn test_equivalent_items_merge_into_one_line() {
        let order = order_with(vec![burger(), burger()]);
        let text = ReceiptFormatter::default().format(&order, PrintJobKind::Kitchen);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.iter().filter(|l| **l == "2x X-Burger").count(), 1);
        assert!(!lines.iter().any(|l| *l == "1x X-Burger"));
        for pair in lines.windows(2) {
            if !pair[0].trim().is_empty() && !is_rule_line(pair[0]) {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_items_printing_alike_are_never_dropped() {
        let order = order_with(vec![
            burger(),
            OrderItem::new("X-Burger ", 1, dec!(15.00)),
            burger().with_extra("Bacon", dec!(3)),
            burger().with_extra("Bacon", dec!(4)),
            burger().with_removed("Onion"),
            burger().with_unavailable("Onion"),
        ]);
        let text = ReceiptFormatter::default().format(&order, PrintJobKind::Kitchen);
        let lines: Vec<&str> = text.lines().collect();

        let quantities: Vec<&str> = lines
            .iter()
            .filter(|l| l.ends_with("x X-Burger"))
            .copied()
            .collect();
        assert_eq!(quantities, vec!["2x X-Burger", "2x X-Burger", "2x X-Burger"]);
        assert_eq!(lines.iter().filter(|l| **l == "   + Bacon").count(), 1);
        assert_eq!(lines.iter().filter(|l| **l == "   Remove: Onion").count(), 1);
    }

    #[test]
    fn test_different_notes_do_not_merge() {
        let order = order_with(vec![burger(), burger().with_note("well done")]);
        let text = ReceiptFormatter::default().format(&order, PrintJobKind::Kitchen);
        assert_eq!(text.matches("1x X-Burger").count(), 2);
        assert!(text.contains("   Note: well done"));
    }

    #[test]
    fn test_detail_line_order_and_delimiter() {
        let item = burger()
            .with_extra("Bacon", dec!(3))
            .with_extra("Cheddar", dec!(2))
            .with_removed("Onion")
            .with_unavailable("Tomato")
            .with_unavailable("Onion")
            .with_note("no salt");
        let formatter = ReceiptFormatter::new(ReceiptConfig {
            width: 80,
            ..Default::default()
        });
        let text = formatter.format(&order_with(vec![item]), PrintJobKind::Kitchen);
        assert!(text.contains("1x X-Burger\n   + Bacon, Cheddar | Remove: Onion, Tomato | Note: no salt\n"));
    }

    #[test]
    fn test_no_detail_line_without_parts() {
        let text = ReceiptFormatter::default().format(&order_with(vec![burger()]), PrintJobKind::Kitchen);
        let after = text.split("1x X-Burger\n").nth(1).unwrap();
        assert!(!after.starts_with(DETAIL_INDENT));
    }

    #[test]
    fn test_categories_in_first_seen_order() {
        let order = order_with(vec![
            OrderItem::new("Coke", 1, dec!(5)).with_category("Drinks"),
            burger().with_category("Burgers"),
            OrderItem::new("Fries", 1, dec!(8)),
            OrderItem::new("Juice", 1, dec!(6)).with_category("Drinks"),
        ]);
        let text = ReceiptFormatter::default().format(&order, PrintJobKind::Kitchen);

        let drinks = text.find("[Drinks]").unwrap();
        let burgers = text.find("[Burgers]").unwrap();
        let items = text.find("[Items]").unwrap();
        assert!(drinks < burgers && burgers < items);

        // Juice is grouped with Coke, before the Burgers section
        let juice = text.find("1x Juice").unwrap();
        assert!(juice < burgers);
        assert_eq!(text.matches("[Drinks]").count(), 1);
    }

    #[test]
    fn test_kitchen_ticket_hides_money() {
        let text = ReceiptFormatter::default().format(&order_with(vec![burger()]), PrintJobKind::Kitchen);
        assert!(text.contains("KITCHEN"));
        assert!(text.contains("Payment: Cash"));
        assert!(text.contains("Ready in: 25 min"));
        assert!(!text.contains("R$"));
        assert!(!text.contains("Total"));
    }

    #[test]
    fn test_courier_ticket_shows_totals_and_address() {
        let text = ReceiptFormatter::default().format(&order_with(vec![burger()]), PrintJobKind::Courier);
        assert!(text.contains("DELIVERY"));
        assert!(text.contains("Order #42"));
        assert!(text.contains("Date: 22/01/2024 05:32"));
        assert!(text.contains("Customer: Ana"));
        assert!(text.contains("Phone: 11 99999-0000"));
        assert!(text.contains("Address: Rua das Flores, 120"));
        assert!(text.contains("  Apt 3"));
        assert!(text.contains("  Centro - Sao Paulo"));
        assert!(text.lines().any(|l| l.starts_with("Total") && l.ends_with("R$ 35.00")));
        assert!(text.lines().any(|l| l.starts_with("Change due") && l.ends_with("R$ 15.00")));
        assert!(!text.contains("Ready in"));
    }

    #[test]
    fn test_rule_lines_are_full_width_and_preserved() {
        let text = ReceiptFormatter::default().format(&order_with(vec![burger()]), PrintJobKind::Courier);
        let rules: Vec<&str> = text.lines().filter(|l| is_rule_line(l)).collect();
        assert!(rules.len() >= 3);
        assert!(rules.iter().all(|l| l.chars().count() == 42));
    }

    #[test]
    fn test_malformed_fields_fall_back() {
        let mut order = order_with(vec![OrderItem::new("  ", 1, dec!(1))]);
        order.customer_name = String::new();
        order.customer_phone = Some("   ".to_string());
        order.address = None;
        order.created_at = i64::MAX;

        let text = ReceiptFormatter::default().format(&order, PrintJobKind::Courier);
        assert!(text.contains("Customer: -"));
        assert!(!text.contains("Phone:"));
        assert!(text.contains("Address: (address missing)"));
        assert!(text.contains("Date: --/--/---- --:--"));
        assert!(text.contains("1x (unnamed item)"));
    }

    #[test]
    fn test_pickup_has_no_address() {
        let mut order = order_with(vec![burger()]);
        order.delivery_type = DeliveryType::Pickup;
        let text = ReceiptFormatter::default().format(&order, PrintJobKind::Kitchen);
        assert!(text.contains("Type: Pickup"));
        assert!(!text.contains("Address:"));
    }

    #[test]
    fn test_dedupe_adjacent_keeps_rules_and_blanks() {
        let lines = vec![
            "a".to_string(),
            "a".to_string(),
            String::new(),
            String::new(),
            "-----".to_string(),
            "-----".to_string(),
            "a".to_string(),
        ];
        assert_eq!(
            dedupe_adjacent(lines.clone(), &[]),
            vec!["a", "", "", "-----", "-----", "a"]
        );
        assert_eq!(
            dedupe_adjacent(lines, &[1]),
            vec!["a", "a", "", "", "-----", "-----", "a"]
        );
    }

    #[test]
    fn test_long_detail_line_wraps_with_indent() {
        let item = burger().with_note("please cut in half and pack the sauce separately");
        let formatter = ReceiptFormatter::new(ReceiptConfig {
            width: 32,
            ..Default::default()
        });
        let text = formatter.format(&order_with(vec![item]), PrintJobKind::Kitchen);
        let detail: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != "1x X-Burger")
            .skip(1)
            .take_while(|l| l.starts_with(DETAIL_INDENT))
            .collect();
        assert!(detail.len() >= 2);
        assert!(detail.iter().all(|l| l.chars().count() <= 32));
    }
}
