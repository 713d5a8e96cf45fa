//! Draft editing for a single to-do item.
//!
//! [`ItemForm`] owns one [`DraftItem`] and knows which inputs are relevant for
//! the selected [`ItemType`]. Inputs for other types are hidden and cannot be
//! written, so a submitted [`Item`] only ever carries data of its own type.

use std::{fmt, num::NonZeroU32};

use chrono::NaiveDate;
use shared::domain::{label_is_present, Item, ItemKind, ItemType, Period, DEFAULT_AMOUNT};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Label,
    Deadline,
    Frequency,
    Period,
    Amount,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Label => "label",
            Field::Deadline => "deadline",
            Field::Frequency => "frequency",
            Field::Period => "period",
            Field::Amount => "amount",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

pub fn visible_fields(item_type: ItemType) -> &'static [Field] {
    match item_type {
        ItemType::Task => &[Field::Label, Field::Deadline],
        ItemType::Recurring => &[Field::Label, Field::Frequency, Field::Period],
        ItemType::ShoppingItem => &[Field::Label, Field::Amount],
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{field} is not shown for {item_type} items")]
    FieldHidden { field: Field, item_type: ItemType },
    #[error("item cannot be submitted: {reason}")]
    NotSubmittable { reason: &'static str },
}

/// Form state before submission. Holds every field for every type; only the
/// ones visible for `item_type` end up in the submitted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub label: String,
    pub item_type: ItemType,
    pub deadline: Option<NaiveDate>,
    /// `None` until the user enters a positive number.
    pub frequency: Option<NonZeroU32>,
    pub period: Period,
    pub amount: NonZeroU32,
}

impl Default for DraftItem {
    fn default() -> Self {
        Self {
            label: String::new(),
            item_type: ItemType::default(),
            deadline: None,
            frequency: None,
            period: Period::default(),
            amount: DEFAULT_AMOUNT,
        }
    }
}

#[derive(Debug, Default)]
pub struct ItemForm {
    draft: DraftItem,
}

impl ItemForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &DraftItem {
        &self.draft
    }

    pub fn item_type(&self) -> ItemType {
        self.draft.item_type
    }

    pub fn visible_fields(&self) -> &'static [Field] {
        visible_fields(self.draft.item_type)
    }

    pub fn is_visible(&self, field: Field) -> bool {
        self.visible_fields().contains(&field)
    }

    pub fn is_submittable(&self) -> bool {
        self.blocking_reason().is_none()
    }

    /// Switching to another type keeps the label and resets everything else.
    pub fn set_type(&mut self, item_type: ItemType) {
        if self.draft.item_type == item_type {
            return;
        }
        let label = std::mem::take(&mut self.draft.label);
        self.draft = DraftItem {
            label,
            item_type,
            ..DraftItem::default()
        };
        debug!(%item_type, "draft type changed");
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.draft.label = label.into();
    }

    pub fn set_amount(&mut self, amount: NonZeroU32) -> Result<(), FormError> {
        self.require_visible(Field::Amount)?;
        self.draft.amount = amount;
        Ok(())
    }

    /// Zero is treated as "no frequency entered".
    pub fn set_frequency(&mut self, frequency: u32) -> Result<(), FormError> {
        self.require_visible(Field::Frequency)?;
        self.draft.frequency = NonZeroU32::new(frequency);
        Ok(())
    }

    pub fn clear_frequency(&mut self) -> Result<(), FormError> {
        self.require_visible(Field::Frequency)?;
        self.draft.frequency = None;
        Ok(())
    }

    pub fn set_period(&mut self, period: Period) -> Result<(), FormError> {
        self.require_visible(Field::Period)?;
        self.draft.period = period;
        Ok(())
    }

    pub fn set_deadline(&mut self, deadline: Option<NaiveDate>) -> Result<(), FormError> {
        self.require_visible(Field::Deadline)?;
        self.draft.deadline = deadline;
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Item, FormError> {
        if let Some(reason) = self.blocking_reason() {
            return Err(FormError::NotSubmittable { reason });
        }
        let draft = std::mem::take(&mut self.draft);
        let kind = match draft.item_type {
            ItemType::Task => ItemKind::Task {
                deadline: draft.deadline,
            },
            ItemType::Recurring => ItemKind::Recurring {
                frequency: draft.frequency.ok_or(FormError::NotSubmittable {
                    reason: "frequency is required",
                })?,
                period: draft.period,
            },
            ItemType::ShoppingItem => ItemKind::ShoppingItem {
                amount: draft.amount,
            },
        };
        Ok(Item::new(draft.label, kind))
    }

    fn blocking_reason(&self) -> Option<&'static str> {
        if !label_is_present(&self.draft.label) {
            return Some("label is empty");
        }
        if self.draft.item_type == ItemType::Recurring && self.draft.frequency.is_none() {
            return Some("frequency is required");
        }
        None
    }

    fn require_visible(&self, field: Field) -> Result<(), FormError> {
        if self.is_visible(field) {
            Ok(())
        } else {
            Err(FormError::FieldHidden {
                field,
                item_type: self.draft.item_type,
            })
        }
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
