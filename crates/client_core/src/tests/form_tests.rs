use super::*;

fn nz(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).expect("non-zero")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

#[test]
fn new_form_starts_with_empty_task_draft() {
    let form = ItemForm::new();
    assert_eq!(form.draft(), &DraftItem::default());
    assert_eq!(form.item_type(), ItemType::Task);
    assert_eq!(form.draft().amount.get(), 1);
    assert_eq!(form.draft().period, Period::Day);
    assert!(!form.is_submittable());
}

#[test]
fn visible_fields_follow_item_type() {
    let mut form = ItemForm::new();
    assert_eq!(form.visible_fields(), &[Field::Label, Field::Deadline]);

    form.set_type(ItemType::Recurring);
    assert_eq!(
        form.visible_fields(),
        &[Field::Label, Field::Frequency, Field::Period]
    );
    assert!(!form.is_visible(Field::Amount));

    form.set_type(ItemType::ShoppingItem);
    assert_eq!(form.visible_fields(), &[Field::Label, Field::Amount]);
    assert!(!form.is_visible(Field::Deadline));
}

#[test]
fn empty_or_blank_label_blocks_every_type() {
    for item_type in ItemType::ALL {
        let mut form = ItemForm::new();
        form.set_type(item_type);
        if item_type == ItemType::Recurring {
            form.set_frequency(3).expect("frequency");
        }
        assert!(!form.is_submittable(), "{item_type} with empty label");

        form.set_label("   ");
        assert!(!form.is_submittable(), "{item_type} with blank label");

        form.set_label("Something");
        assert!(form.is_submittable(), "{item_type} with label");
    }
}

#[test]
fn recurring_requires_positive_frequency() {
    let mut form = ItemForm::new();
    form.set_type(ItemType::Recurring);
    form.set_label("Water plants");
    assert!(!form.is_submittable());

    form.set_frequency(0).expect("frequency");
    assert!(!form.is_submittable());

    form.set_frequency(2).expect("frequency");
    assert!(form.is_submittable());

    form.clear_frequency().expect("clear");
    assert!(!form.is_submittable());
}

#[test]
fn hidden_fields_are_rejected_and_draft_is_unchanged() {
    let mut form = ItemForm::new();
    form.set_label("Milk");
    let before = form.draft().clone();

    assert_eq!(
        form.set_amount(nz(4)),
        Err(FormError::FieldHidden {
            field: Field::Amount,
            item_type: ItemType::Task,
        })
    );
    assert!(matches!(
        form.set_frequency(2),
        Err(FormError::FieldHidden {
            field: Field::Frequency,
            ..
        })
    ));
    assert!(form.set_period(Period::Week).is_err());
    assert_eq!(form.draft(), &before);

    form.set_type(ItemType::ShoppingItem);
    assert!(form.set_deadline(Some(date(2030, 1, 1))).is_err());
    assert_eq!(form.draft().deadline, None);
}

#[test]
fn switching_type_keeps_label_and_resets_other_fields() {
    let mut form = ItemForm::new();
    form.set_label("Pay rent");
    form.set_deadline(Some(date(2030, 5, 1))).expect("deadline");

    form.set_type(ItemType::Recurring);
    assert_eq!(form.draft().label, "Pay rent");
    assert_eq!(form.draft().deadline, None);
    assert_eq!(form.draft().frequency, None);
    assert_eq!(form.draft().period, Period::Day);

    form.set_frequency(1).expect("frequency");
    form.set_period(Period::Month).expect("period");
    form.set_type(ItemType::Recurring);
    assert_eq!(form.draft().period, Period::Month, "same type is a no-op");

    form.set_type(ItemType::ShoppingItem);
    assert_eq!(form.draft().frequency, None);
    assert_eq!(form.draft().period, Period::Day);
    assert_eq!(form.draft().amount.get(), 1);
}

#[test]
fn submit_builds_item_of_selected_type_and_resets_draft() {
    let mut form = ItemForm::new();
    form.set_type(ItemType::ShoppingItem);
    form.set_label("Eggs");
    form.set_amount(nz(12)).expect("amount");

    let item = form.submit().expect("submit");
    assert_eq!(item.id, None);
    assert_eq!(item.label, "Eggs");
    assert_eq!(item.kind, ItemKind::ShoppingItem { amount: nz(12) });

    assert_eq!(form.draft(), &DraftItem::default());
    assert_eq!(form.draft().label, "");
    assert_eq!(form.draft().amount.get(), 1);
    assert_eq!(form.draft().frequency, None);
    assert_eq!(form.draft().deadline, None);
}

#[test]
fn task_submission_carries_deadline() {
    let mut form = ItemForm::new();
    form.set_label("Taxes");
    form.set_deadline(Some(date(2031, 4, 15))).expect("deadline");

    let item = form.submit().expect("submit");
    assert_eq!(
        item.kind,
        ItemKind::Task {
            deadline: Some(date(2031, 4, 15))
        }
    );
}

#[test]
fn recurring_after_recurring_submit_presents_default_period() {
    let mut form = ItemForm::new();
    form.set_type(ItemType::Recurring);
    form.set_label("Gym");
    form.set_frequency(3).expect("frequency");
    form.set_period(Period::Week).expect("period");

    let item = form.submit().expect("submit");
    assert_eq!(
        item.kind,
        ItemKind::Recurring {
            frequency: nz(3),
            period: Period::Week
        }
    );

    form.set_type(ItemType::Recurring);
    assert_eq!(form.draft().period, Period::Day);
    assert_eq!(form.draft().frequency, None);
}

#[test]
fn submit_refuses_invalid_draft_and_keeps_it() {
    let mut form = ItemForm::new();
    form.set_type(ItemType::Recurring);
    form.set_label("Stretch");
    form.set_period(Period::Week).expect("period");
    let before = form.draft().clone();

    assert!(matches!(
        form.submit(),
        Err(FormError::NotSubmittable { .. })
    ));
    assert_eq!(form.draft(), &before);
}
