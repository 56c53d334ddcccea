//! Feed/Tracking surface: the ranked match feed, unread
//! alerts, tracking toggles, and alert acknowledgement. Thin wrappers over
//! storage queries; no scoring or gating logic lives here.

use procure_storage::db::Db;
use procure_storage::models::{AlertRow, NoticeMatchRow};
use procure_storage::queries;
use uuid::Uuid;

use crate::Result;

/// Matches ordered tracked-first, then score descending.
pub async fn ranked_feed(db: &Db, org_id: Uuid, limit: i64) -> Result<Vec<NoticeMatchRow>> {
	Ok(queries::ranked_feed(&db.pool, org_id, limit).await?)
}

pub async fn unread_alerts(db: &Db, org_id: Uuid) -> Result<Vec<AlertRow>> {
	Ok(queries::unread_alerts(&db.pool, org_id).await?)
}

/// Sets a match's tracked flag explicitly, rather than toggling blind —
/// callers already have the current state from the feed they rendered.
pub async fn set_tracked(db: &Db, org_id: Uuid, ocid: &str, tracked: bool) -> Result<()> {
	queries::set_tracked(&db.pool, org_id, ocid, tracked).await?;
	Ok(())
}

pub async fn mark_alert_read(db: &Db, alert_id: Uuid) -> Result<()> {
	queries::mark_alert_read(&db.pool, alert_id).await?;
	Ok(())
}
