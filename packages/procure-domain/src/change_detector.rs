use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy)]
pub struct NoticeSnapshot<'a> {
	pub deadline_date: Option<OffsetDateTime>,
	pub value_amount: Option<Decimal>,
	pub notice_type: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeadlineChange {
	pub old: String,
	pub new: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValueChange {
	pub old: Decimal,
	pub new: Decimal,
	pub diff_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypeChange {
	pub old: String,
	pub new: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
	pub deadline: Option<DeadlineChange>,
	pub value: Option<ValueChange>,
	pub notice_type: Option<TypeChange>,
}

impl Changes {
	pub fn is_empty(&self) -> bool {
		self.deadline.is_none() && self.value.is_none() && self.notice_type.is_none()
	}

	/// Keys in the same order the alert service walks them, for use in
	/// human-readable messages and `risk_flags`-style maps.
	pub fn keys(&self) -> Vec<&'static str> {
		let mut keys = Vec::new();

		if self.deadline.is_some() {
			keys.push("deadline");
		}
		if self.value.is_some() {
			keys.push("value");
		}
		if self.notice_type.is_some() {
			keys.push("type");
		}

		keys
	}
}

/// Diffs a stored notice against an incoming revision. A non-null pair that
/// differs on deadline is material; value change is material only past the
/// configured ratio of the old value; any notice-type change is material.
pub fn diff(old: NoticeSnapshot<'_>, new: NoticeSnapshot<'_>, value_change_ratio: f32) -> Changes {
	let mut changes = Changes::default();

	if let (Some(old_deadline), Some(new_deadline)) = (old.deadline_date, new.deadline_date)
		&& old_deadline != new_deadline
	{
		changes.deadline = Some(DeadlineChange {
			old: old_deadline.to_string(),
			new: new_deadline.to_string(),
		});
	}

	if let (Some(old_value), Some(new_value)) = (old.value_amount, new.value_amount)
		&& !old_value.is_zero()
	{
		let diff_pct = ((new_value - old_value) / old_value).abs();
		let threshold = Decimal::from_f32_retain(value_change_ratio).unwrap_or_default();

		if diff_pct > threshold {
			changes.value = Some(ValueChange {
				old: old_value,
				new: new_value,
				diff_pct: diff_pct.to_string().parse().unwrap_or(0.0),
			});
		}
	}

	if old.notice_type != new.notice_type {
		changes.notice_type = Some(TypeChange {
			old: old.notice_type.to_string(),
			new: new.notice_type.to_string(),
		});
	}

	changes
}

/// Human-readable alert messages, keyed the way the alert service emits
/// them, one per changed field.
pub fn messages(changes: &Changes) -> BTreeMap<&'static str, String> {
	let mut messages = BTreeMap::new();

	if let Some(deadline) = &changes.deadline {
		messages.insert(
			"deadline",
			format!("Deadline changed from {} to {}.", deadline.old, deadline.new),
		);
	}
	if let Some(value) = &changes.value {
		messages.insert(
			"value",
			format!(
				"Value changed by {:.1}% (now {}).",
				value.diff_pct * 100.0,
				value.new
			),
		);
	}
	if let Some(notice_type) = &changes.notice_type {
		messages.insert("type", format!("Notice type changed to {}.", notice_type.new));
	}

	messages
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn no_change_yields_empty_set() {
		let snapshot = NoticeSnapshot {
			deadline_date: Some(datetime!(2024-03-01 0:00 UTC)),
			value_amount: Some(Decimal::new(100_000, 0)),
			notice_type: "contractNotice",
		};

		let changes = diff(snapshot, snapshot, 0.10);

		assert!(changes.is_empty());
	}

	#[test]
	fn deadline_change_is_material() {
		let old = NoticeSnapshot {
			deadline_date: Some(datetime!(2024-03-01 0:00 UTC)),
			value_amount: None,
			notice_type: "contractNotice",
		};
		let new = NoticeSnapshot { deadline_date: Some(datetime!(2024-04-01 0:00 UTC)), ..old };

		assert!(diff(old, new, 0.10).deadline.is_some());
	}

	#[test]
	fn value_change_under_threshold_is_not_material() {
		let old = NoticeSnapshot {
			deadline_date: None,
			value_amount: Some(Decimal::new(100_000, 0)),
			notice_type: "contractNotice",
		};
		let new = NoticeSnapshot { value_amount: Some(Decimal::new(105_000, 0)), ..old };

		assert!(diff(old, new, 0.10).value.is_none());
	}

	#[test]
	fn value_change_over_threshold_is_material() {
		let old = NoticeSnapshot {
			deadline_date: None,
			value_amount: Some(Decimal::new(100_000, 0)),
			notice_type: "contractNotice",
		};
		let new = NoticeSnapshot { value_amount: Some(Decimal::new(115_000, 0)), ..old };

		let changes = diff(old, new, 0.10);

		assert!(changes.value.is_some());
	}

	#[test]
	fn notice_type_change_is_material() {
		let old = NoticeSnapshot {
			deadline_date: None,
			value_amount: None,
			notice_type: "contractNotice",
		};
		let new = NoticeSnapshot { notice_type: "contractAward", ..old };

		assert!(diff(old, new, 0.10).notice_type.is_some());
	}
}
