//! Alert Service: turns a `Changes` set from the Change
//! Detector into persisted alerts, fans them out to every match tied to the
//! notice, and demotes GO matches on a material value swing.

use procure_domain::Changes;
use procure_domain::change_messages;
use procure_storage::models::AlertRow;
use procure_storage::queries;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::Result;

/// Persists one `MATERIAL_CHANGE` alert per changed field and annotates
/// every match tied to `ocid`, all within the caller's transaction. A
/// `value` change on a currently-GO match demotes it to REVIEW;
/// `deadline`/`type` changes never demote.
pub async fn process(tx: &mut Transaction<'_, Postgres>, ocid: &str, changes: &Changes) -> Result<()> {
	if changes.is_empty() {
		return Ok(());
	}

	let messages = change_messages(changes);
	let matches = queries::matches_for_notice(&mut **tx, ocid).await?;

	for (field, message) in &messages {
		let demote_to_review = *field == "value";

		for existing in &matches {
			let alert = AlertRow {
				alert_id: Uuid::new_v4(),
				org_id: existing.org_id,
				ocid: ocid.to_string(),
				r#type: "MATERIAL_CHANGE".to_string(),
				severity: "warning".to_string(),
				message: message.clone(),
				details: serde_json::json!({ "field": field }),
				read: false,
				created_at: time::OffsetDateTime::now_utc(),
			};

			queries::insert_alert(&mut **tx, &alert).await?;
			queries::annotate_match_for_alert(&mut **tx, existing.org_id, ocid, message, demote_to_review).await?;
		}
	}

	Ok(())
}
