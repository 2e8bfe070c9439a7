use futures::channel::mpsc::{self, UnboundedSender};
use futures_util::StreamExt;
use once_cell::sync::OnceCell;
use serde::Serialize;
use sqlx::MySqlPool;
use strum_macros::{Display, EnumString};
use tracing::{info, warn};

/// Semantic events the engine emits for the audit/notification side.
/// Emission is fire-and-forget: the primary state transition never waits
/// on, or fails because of, event handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    TeamTransferInitiated,
    TeamTransferCompleted,
    TeamTransferCancelled,
    MissedCheckInDetected,
}

/// Why a pending transfer was cancelled; recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum CancelReason {
    Explicit,
    RoleChanged,
    Deactivation,
    SameTeam,
    TeamDeactivated,
    TargetTeamInactive,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub company_id: u64,
    pub worker_id: u64,
    pub detail: serde_json::Value,
}

static SENDER: OnceCell<UnboundedSender<Event>> = OnceCell::new();

/// Start the drain task. Called once from main after the pool exists;
/// events emitted before init are dropped with a warning.
pub fn init(pool: MySqlPool) {
    let (tx, mut rx) = mpsc::unbounded::<Event>();
    if SENDER.set(tx).is_err() {
        warn!("Event dispatcher initialized twice; keeping the first");
        return;
    }

    actix_web::rt::spawn(async move {
        while let Some(event) = rx.next().await {
            let kind = event.kind.to_string();
            let detail = event.detail.to_string();
            let result = sqlx::query(
                r#"
                INSERT INTO audit_events (company_id, worker_id, kind, detail)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(event.company_id)
            .bind(event.worker_id)
            .bind(&kind)
            .bind(&detail)
            .execute(&pool)
            .await;

            match result {
                Ok(_) => info!(kind = %kind, worker_id = event.worker_id, "Event recorded"),
                // Side-effect failures are logged here and go no further.
                Err(e) => warn!(error = %e, kind = %kind, "Failed to record event"),
            }
        }
    });
}

/// Hand an event to the drain task without blocking the caller.
pub fn emit(event: Event) {
    match SENDER.get() {
        Some(tx) => {
            if tx.unbounded_send(event).is_err() {
                warn!("Event channel closed; event dropped");
            }
        }
        None => warn!("Event dispatcher not initialized; event dropped"),
    }
}

pub fn transfer_cancelled(company_id: u64, worker_id: u64, reason: CancelReason) -> Event {
    Event {
        kind: EventKind::TeamTransferCancelled,
        company_id,
        worker_id,
        detail: serde_json::json!({ "reason": reason.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn event_kinds_serialize_screaming_snake() {
        assert_eq!(
            EventKind::TeamTransferInitiated.to_string(),
            "TEAM_TRANSFER_INITIATED"
        );
        assert_eq!(
            EventKind::MissedCheckInDetected.to_string(),
            "MISSED_CHECK_IN_DETECTED"
        );
    }

    #[test]
    fn cancel_reasons_round_trip() {
        for reason in [
            CancelReason::Explicit,
            CancelReason::RoleChanged,
            CancelReason::Deactivation,
            CancelReason::SameTeam,
            CancelReason::TeamDeactivated,
            CancelReason::TargetTeamInactive,
        ] {
            let text = reason.to_string();
            assert_eq!(CancelReason::from_str(&text).unwrap(), reason);
        }
        assert_eq!(CancelReason::TargetTeamInactive.to_string(), "target_team_inactive");
        assert_eq!(CancelReason::TeamDeactivated.to_string(), "team_deactivated");
        assert_eq!(CancelReason::Deactivation.to_string(), "deactivation");
    }

    #[test]
    fn cancellation_event_carries_reason_detail() {
        let event = transfer_cancelled(1, 42, CancelReason::Deactivation);
        assert_eq!(event.kind, EventKind::TeamTransferCancelled);
        assert_eq!(event.detail["reason"], "deactivation");
    }
}
