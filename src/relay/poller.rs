use anyhow::Result;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Relay, RelayState, queries_match};
use crate::capture::Delivery;
use crate::channel::ReplyTarget;
use crate::consts::format_duration;
use crate::extract::{TaskResultPayload, extract};

/// What one poll iteration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub fetched: usize,
    pub already_seen: usize,
    pub blank: usize,
    pub unparseable: usize,
    pub unmatched: usize,
    /// Pending tasks resolved by a delivery.
    pub matched: usize,
    /// Pending tasks dropped by the expiry sweep.
    pub expired: usize,
    /// Ledger ids dropped by compaction.
    pub compacted: usize,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery has no content")]
    Blank,
    #[error("delivery is not a valid result payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("delivery does not echo its query")]
    MissingQuery,
}

/// A reply produced while the state lock was held, sent after release.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub task_id: String,
    pub reply_to: ReplyTarget,
    pub text: String,
}

/// Parse a captured delivery into a payload that echoes its query.
pub fn parse_delivery(delivery: &Delivery) -> Result<TaskResultPayload, DeliveryError> {
    if delivery.is_blank() {
        return Err(DeliveryError::Blank);
    }
    let content = delivery.content.as_deref().unwrap_or_default();
    let payload: TaskResultPayload = serde_json::from_str(content)?;
    if payload.query().is_none() {
        return Err(DeliveryError::MissingQuery);
    }
    Ok(payload)
}

/// Match fresh deliveries against pending tasks.
///
/// Every delivery not yet in the ledger is recorded there whatever the
/// outcome. A delivery resolves every pending task it matches; each
/// resolved task is removed from the store. The ledger is compacted at
/// the end.
pub fn correlate(
    state: &mut RelayState,
    deliveries: &[Delivery],
    report: &mut PollReport,
) -> Vec<Outgoing> {
    let mut outgoing = Vec::new();

    for delivery in deliveries {
        if state.ledger.contains(&delivery.id) {
            report.already_seen += 1;
            continue;
        }

        match parse_delivery(delivery) {
            Ok(payload) => {
                let echoed = payload.query().unwrap_or_default();
                let matched: Vec<String> = state
                    .store
                    .iter()
                    .filter(|task| queries_match(&task.query, echoed))
                    .map(|task| task.task_id.clone())
                    .collect();

                if matched.is_empty() {
                    debug!(delivery_id = %delivery.id, "delivery matched no pending task");
                    report.unmatched += 1;
                }

                for task_id in matched {
                    let Some(task) = state.store.remove(&task_id) else {
                        continue;
                    };
                    info!(
                        %task_id,
                        delivery_id = %delivery.id,
                        category = %task.category,
                        "result matched"
                    );
                    report.matched += 1;
                    outgoing.push(Outgoing {
                        text: extract(&payload, task.category),
                        task_id: task.task_id,
                        reply_to: task.reply_to,
                    });
                }
            }
            Err(DeliveryError::Blank) => {
                debug!(delivery_id = %delivery.id, "skipping blank delivery");
                report.blank += 1;
            }
            Err(e) => {
                warn!(delivery_id = %delivery.id, error = %e, "skipping delivery");
                report.unparseable += 1;
            }
        }

        state.ledger.insert(delivery.id.clone());
    }

    report.compacted = state.ledger.compact();
    outgoing
}

impl Relay {
    /// One poll iteration: expire, fetch, correlate, reply.
    ///
    /// The expiry sweep runs even when the fetch fails; a fetch failure
    /// leaves the ledger and the remaining pending tasks untouched.
    pub async fn poll_once(&self) -> Result<PollReport> {
        let mut report = PollReport::default();
        let mut outgoing = {
            let mut state = self.state.lock().await;
            self.expire_pending(&mut state, &mut report)
        };

        let fetched = self.capture.fetch().await;
        if let Ok(deliveries) = &fetched {
            report.fetched = deliveries.len();
            let mut state = self.state.lock().await;
            outgoing.extend(correlate(&mut state, deliveries, &mut report));
        }

        let sends = outgoing.iter().map(|out| async move {
            debug!(task_id = %out.task_id, "posting result");
            self.reply_chunked(&out.reply_to, &out.text).await;
        });
        futures::future::join_all(sends).await;

        fetched.map(|_| report)
    }

    fn expire_pending(&self, state: &mut RelayState, report: &mut PollReport) -> Vec<Outgoing> {
        let ttl = self.config.context_ttl;
        let expired = state.store.expire(ttl, Instant::now());
        report.expired = expired.len();

        expired
            .into_iter()
            .map(|task| {
                info!(task_id = %task.task_id, "pending task expired");
                Outgoing {
                    text: format!(
                        "⌛ No result arrived for task `{}` within {}. Giving up on it.",
                        task.task_id,
                        format_duration(ttl)
                    ),
                    task_id: task.task_id,
                    reply_to: task.reply_to,
                }
            })
            .collect()
    }

    /// Poll on a fixed schedule until `shutdown` is cancelled. Failed
    /// iterations are logged and retried on the next tick.
    pub async fn run_poller(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.poll_once().await {
                Ok(report) => debug!(?report, "poll complete"),
                Err(e) => warn!(error = %e, "poll failed, retrying next tick"),
            }
        }
        debug!("poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::store::{DedupLedger, PendingTask};

    fn task(id: &str, query: &str, category: Category) -> PendingTask {
        PendingTask::new(id, query, category, ReplyTarget::new("c", format!("msg-{id}")))
    }

    fn result(query: &str) -> String {
        format!(
            r#"{{"input":{{"query_post":"{query}"}},"task_output":[{{"name":"s1","result":"A"}},{{"name":"s2","result":"B"}}]}}"#
        )
    }

    #[test]
    fn parse_delivery_outcomes() {
        assert!(matches!(
            parse_delivery(&Delivery::new("d", "  ")),
            Err(DeliveryError::Blank)
        ));
        let empty = Delivery {
            id: "d".to_string(),
            content: None,
        };
        assert!(matches!(parse_delivery(&empty), Err(DeliveryError::Blank)));
        assert!(matches!(
            parse_delivery(&Delivery::new("d", "not json")),
            Err(DeliveryError::Parse(_))
        ));
        assert!(matches!(
            parse_delivery(&Delivery::new("d", r#"{"result":"x"}"#)),
            Err(DeliveryError::MissingQuery)
        ));
        assert!(parse_delivery(&Delivery::new("d", &result("tea"))).is_ok());
    }

    #[test]
    fn matching_delivery_resolves_task() {
        let mut state = RelayState::default();
        state.store.insert(task("T1", "research tea history", Category::Research));
        let mut report = PollReport::default();

        let out = correlate(
            &mut state,
            &[Delivery::new("d1", &result("research tea history"))],
            &mut report,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].task_id, "T1");
        assert_eq!(out[0].reply_to.message_id, "msg-T1");
        assert!(out[0].text.contains("A") && out[0].text.contains("B"));
        assert!(state.store.is_empty());
        assert!(state.ledger.contains("d1"));
        assert_eq!(report.matched, 1);
    }

    #[test]
    fn one_delivery_can_resolve_several_tasks() {
        let mut state = RelayState::default();
        state.store.insert(task("T1", "tea", Category::General));
        state.store.insert(task("T2", "TEA HISTORY", Category::General));
        state.store.insert(task("T3", "coffee", Category::General));
        let mut report = PollReport::default();

        let out = correlate(&mut state, &[Delivery::new("d1", &result("tea history"))], &mut report);

        let ids: Vec<_> = out.iter().map(|o| o.task_id.as_str()).collect();
        assert_eq!(ids, ["T1", "T2"]);
        assert!(state.store.contains("T3"));
        assert_eq!(state.store.len(), 1);
    }

    #[test]
    fn resolved_task_is_consumed_once() {
        let mut state = RelayState::default();
        state.store.insert(task("T1", "tea", Category::General));
        let mut report = PollReport::default();

        let out = correlate(
            &mut state,
            &[
                Delivery::new("d2", &result("tea")),
                Delivery::new("d1", &result("tea")),
            ],
            &mut report,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(report.unmatched, 1);
        assert!(state.ledger.contains("d1") && state.ledger.contains("d2"));
    }

    #[test]
    fn bad_deliveries_are_marked_processed() {
        let mut state = RelayState::default();
        state.store.insert(task("T1", "tea", Category::General));
        let mut report = PollReport::default();

        let out = correlate(
            &mut state,
            &[
                Delivery::new("blank", ""),
                Delivery::new("garbage", "{not json"),
                Delivery::new("noquery", r#"{"result":"tea"}"#),
            ],
            &mut report,
        );

        assert!(out.is_empty());
        assert_eq!(report.blank, 1);
        assert_eq!(report.unparseable, 2);
        assert_eq!(state.ledger.len(), 3);
        assert!(state.store.contains("T1"));
    }

    #[test]
    fn seen_deliveries_are_skipped() {
        let mut state = RelayState::default();
        state.ledger.insert("d1");
        state.store.insert(task("T1", "tea", Category::General));
        let mut report = PollReport::default();

        let out = correlate(&mut state, &[Delivery::new("d1", &result("tea"))], &mut report);

        assert!(out.is_empty());
        assert_eq!(report.already_seen, 1);
        assert!(state.store.contains("T1"));
    }

    #[test]
    fn duplicate_ids_in_one_batch_are_processed_once() {
        let mut state = RelayState::default();
        let mut report = PollReport::default();

        correlate(
            &mut state,
            &[Delivery::new("d1", "x"), Delivery::new("d1", "x")],
            &mut report,
        );

        assert_eq!(report.unparseable, 1);
        assert_eq!(report.already_seen, 1);
        assert_eq!(state.ledger.len(), 1);
    }

    #[test]
    fn ledger_is_compacted_after_batch() {
        let mut state = RelayState {
            ledger: DedupLedger::with_limits(4, 2),
            ..RelayState::default()
        };
        let deliveries: Vec<_> = (0..5).map(|i| Delivery::new(format!("d{i}"), "")).collect();
        let mut report = PollReport::default();

        correlate(&mut state, &deliveries, &mut report);

        assert_eq!(report.compacted, 3);
        assert_eq!(state.ledger.len(), 2);
        assert!(state.ledger.contains("d3") && state.ledger.contains("d4"));
    }
}
