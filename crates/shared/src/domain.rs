use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend-assigned identifier. Opaque to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKindError {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Task,
    Recurring,
    ShoppingItem,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [ItemType::Task, ItemType::Recurring, ItemType::ShoppingItem];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Task => "task",
            ItemType::Recurring => "recurring",
            ItemType::ShoppingItem => "shopping_item",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "task" => Ok(ItemType::Task),
            "recurring" => Ok(ItemType::Recurring),
            "shopping_item" | "shopping" => Ok(ItemType::ShoppingItem),
            _ => Err(ParseKindError {
                kind: "item type",
                value: s.to_string(),
            }),
        }
    }
}

/// Recurrence unit for [`ItemKind::Recurring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }

    /// Label used when rendering "every N <unit>".
    pub fn plural(self) -> &'static str {
        match self {
            Period::Day => "days",
            Period::Week => "weeks",
            Period::Month => "months",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Period::Day),
            "week" | "weeks" => Ok(Period::Week),
            "month" | "months" => Ok(Period::Month),
            _ => Err(ParseKindError {
                kind: "period",
                value: s.to_string(),
            }),
        }
    }
}

pub const DEFAULT_AMOUNT: NonZeroU32 = NonZeroU32::MIN;

fn default_amount() -> NonZeroU32 {
    DEFAULT_AMOUNT
}

/// Type-specific payload of an [`Item`]. Only the fields relevant to the
/// variant exist, so a finalized item never carries data of another type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Task {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<NaiveDate>,
    },
    Recurring {
        frequency: NonZeroU32,
        #[serde(default)]
        period: Period,
    },
    ShoppingItem {
        #[serde(default = "default_amount")]
        amount: NonZeroU32,
    },
}

impl ItemKind {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemKind::Task { .. } => ItemType::Task,
            ItemKind::Recurring { .. } => ItemType::Recurring,
            ItemKind::ShoppingItem { .. } => ItemType::ShoppingItem,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub label: String,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn new(label: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: None,
            label: label.into(),
            kind,
        }
    }

    pub fn task(label: impl Into<String>) -> Self {
        Self::new(label, ItemKind::Task { deadline: None })
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    pub fn has_label(&self) -> bool {
        label_is_present(&self.label)
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)?;
        match &self.kind {
            ItemKind::Task {
                deadline: Some(deadline),
            } => write!(f, " (due {deadline})"),
            ItemKind::Task { deadline: None } => Ok(()),
            ItemKind::Recurring { frequency, period } => {
                if frequency.get() == 1 {
                    write!(f, " (every {period})")
                } else {
                    write!(f, " (every {frequency} {})", period.plural())
                }
            }
            ItemKind::ShoppingItem { amount } => write!(f, " x{amount}"),
        }
    }
}

/// Whitespace-only labels count as empty.
pub fn label_is_present(label: &str) -> bool {
    !label.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shopping_item_wire_shape_is_flat() {
        let item = Item::new(
            "Milk",
            ItemKind::ShoppingItem {
                amount: NonZeroU32::new(2).expect("non-zero"),
            },
        )
        .with_id("7");
        let json = serde_json::to_value(&item).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"id": "7", "label": "Milk", "type": "shopping_item", "amount": 2})
        );
    }

    #[test]
    fn unsaved_task_omits_id_and_deadline() {
        let json = serde_json::to_value(Item::task("An item")).expect("json");
        assert_eq!(json, serde_json::json!({"label": "An item", "type": "task"}));
    }

    #[test]
    fn missing_defaults_are_filled_on_decode() {
        let recurring: Item =
            serde_json::from_str(r#"{"label":"Gym","type":"recurring","frequency":3}"#)
                .expect("recurring");
        assert_eq!(
            recurring.kind,
            ItemKind::Recurring {
                frequency: NonZeroU32::new(3).expect("non-zero"),
                period: Period::Day,
            }
        );

        let shopping: Item = serde_json::from_str(r#"{"label":"Eggs","type":"shopping_item"}"#)
            .expect("shopping");
        assert_eq!(
            shopping.kind,
            ItemKind::ShoppingItem {
                amount: DEFAULT_AMOUNT
            }
        );
    }

    #[test]
    fn zero_frequency_is_rejected_on_decode() {
        let decoded =
            serde_json::from_str::<Item>(r#"{"label":"Gym","type":"recurring","frequency":0}"#);
        assert!(decoded.is_err());
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("shopping-item".parse(), Ok(ItemType::ShoppingItem));
        assert_eq!("Recurring".parse(), Ok(ItemType::Recurring));
        assert_eq!("weeks".parse(), Ok(Period::Week));
        assert!("fortnight".parse::<Period>().is_err());
    }

    #[test]
    fn whitespace_label_is_not_present() {
        assert!(!Item::task("   ").has_label());
        assert!(Item::task("x").has_label());
    }
}
