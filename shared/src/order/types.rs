//! Order snapshot types
//!
//! The order store owns these records. The core only reads snapshots,
//! validates them and writes the status field.

use super::OrderStatus;
use crate::error::{ValidationError, ValidationResult};
use crate::util::non_blank;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Enumerations
// ============================================================================

/// 配送方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// 自取
    #[default]
    Pickup,
    /// 外送
    Delivery,
    /// 堂食
    DineIn,
}

impl DeliveryType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pickup => "Pickup",
            Self::Delivery => "Delivery",
            Self::DineIn => "Dine-in",
        }
    }
}

/// 支付方式
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
    Other(String),
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => f.write_str("Cash"),
            Self::Card => f.write_str("Card"),
            Self::Pix => f.write_str("Pix"),
            Self::Other(name) => match non_blank(Some(name.as_str())) {
                Some(name) => f.write_str(name),
                None => f.write_str("Other"),
            },
        }
    }
}

// ============================================================================
// Item Types
// ============================================================================

/// Added extra (priced)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemExtra {
    pub name: String,
    pub price: Decimal,
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Product name
    pub name: String,
    /// Quantity (>= 1)
    pub quantity: u32,
    /// Unit price before extras
    pub unit_price: Decimal,
    /// Category tag used to group the receipt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Added extras
    #[serde(default)]
    pub extras: Vec<ItemExtra>,
    /// Removed ingredients (never priced)
    #[serde(default)]
    pub removed: Vec<String>,
    /// Ingredients unavailable today
    #[serde(default)]
    pub unavailable: Vec<String>,
    /// Free-text note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Identity of an item for quantity merging.
///
/// Two items are equivalent iff trimmed name, sorted extras, sorted removals
/// and trimmed note are all identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    name: String,
    extras: Vec<(String, Decimal)>,
    removed: Vec<String>,
    note: String,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            category: None,
            extras: Vec::new(),
            removed: Vec::new(),
            unavailable: Vec::new(),
            note: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, price: Decimal) -> Self {
        self.extras.push(ItemExtra {
            name: name.into(),
            price,
        });
        self
    }

    pub fn with_removed(mut self, ingredient: impl Into<String>) -> Self {
        self.removed.push(ingredient.into());
        self
    }

    pub fn with_unavailable(mut self, ingredient: impl Into<String>) -> Self {
        self.unavailable.push(ingredient.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Blank names are ignored and the rest compared trimmed, so items that
    /// print the same also merge. Unavailable ingredients count as removals.
    pub fn merge_key(&self) -> MergeKey {
        let mut extras: Vec<(String, Decimal)> = self
            .extras
            .iter()
            .filter_map(|e| non_blank(Some(e.name.as_str())).map(|name| (name.to_string(), e.price)))
            .collect();
        extras.sort();

        let mut removed: Vec<String> = self
            .removed
            .iter()
            .chain(self.unavailable.iter())
            .filter_map(|r| non_blank(Some(r.as_str())).map(str::to_string))
            .collect();
        removed.sort();
        removed.dedup();

        MergeKey {
            name: self.name.trim().to_string(),
            extras,
            removed,
            note: non_blank(self.note.as_deref()).unwrap_or_default().to_string(),
        }
    }

    pub fn is_equivalent(&self, other: &OrderItem) -> bool {
        self.merge_key() == other.merge_key()
    }

    /// Unit price plus all extras, times quantity
    pub fn line_total(&self) -> Decimal {
        let extras: Decimal = self.extras.iter().map(|e| e.price).sum();
        (self.unit_price + extras) * Decimal::from(self.quantity)
    }
}

// ============================================================================
// Order
// ============================================================================

/// 配送地址
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeliveryAddress {
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Landmark / reference point for the courier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Order snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by the order store)
    pub id: String,
    /// Human-facing order number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub delivery_type: DeliveryType,
    /// Required iff `delivery_type` is `Delivery`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<DeliveryAddress>,
    pub payment_method: PaymentMethod,
    /// Cash handed over, when the customer needs change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_for: Option<Decimal>,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub delivery_fee: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    /// Preparation estimate (minutes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    /// Creation timestamp (unix millis)
    pub created_at: i64,
}

impl Order {
    pub fn is_delivery(&self) -> bool {
        self.delivery_type == DeliveryType::Delivery
    }

    /// Display number: explicit number, else the ID
    pub fn display_number(&self) -> String {
        match self.number {
            Some(n) => n.to_string(),
            None => self.id.clone(),
        }
    }

    /// Check the snapshot invariants
    pub fn validate(&self) -> ValidationResult<()> {
        if non_blank(Some(self.id.as_str())).is_none() {
            return Err(ValidationError::field("id", "must not be blank"));
        }
        if non_blank(Some(self.customer_name.as_str())).is_none() {
            return Err(ValidationError::field("customer_name", "must not be blank"));
        }
        if self.items.is_empty() {
            return Err(ValidationError::field("items", "order has no items"));
        }

        for item in &self.items {
            if non_blank(Some(item.name.as_str())).is_none() {
                return Err(ValidationError::field("items.name", "must not be blank"));
            }
            if item.quantity == 0 {
                return Err(ValidationError::field(
                    "items.quantity",
                    format!("{} has quantity 0", item.name),
                ));
            }
            if item.unit_price.is_sign_negative() {
                return Err(ValidationError::field(
                    "items.unit_price",
                    format!("{} has a negative price", item.name),
                ));
            }
            if item.extras.iter().any(|e| e.price.is_sign_negative()) {
                return Err(ValidationError::field(
                    "items.extras",
                    format!("{} has an extra with a negative price", item.name),
                ));
            }
        }

        if self.is_delivery() {
            let street = self.address.as_ref().map(|a| a.street.as_str());
            if non_blank(street).is_none() {
                return Err(ValidationError::field(
                    "address",
                    "delivery orders require an address",
                ));
            }
        } else if !self.delivery_fee.is_zero() {
            return Err(ValidationError::field(
                "delivery_fee",
                format!("must be 0 for {} orders", self.delivery_type.label()),
            ));
        }

        if self.delivery_fee.is_sign_negative() {
            return Err(ValidationError::field("delivery_fee", "must not be negative"));
        }
        if self.total != self.subtotal + self.delivery_fee {
            return Err(ValidationError::field(
                "total",
                format!(
                    "{} != subtotal {} + delivery fee {}",
                    self.total, self.subtotal, self.delivery_fee
                ),
            ));
        }

        if let Some(change_for) = self.change_for
            && self.payment_method == PaymentMethod::Cash
            && change_for < self.total
        {
            return Err(ValidationError::field(
                "change_for",
                format!("{} is less than the total {}", change_for, self.total),
            ));
        }

        Ok(())
    }
}
