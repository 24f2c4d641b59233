//! Durable outbound queue for submissions the backend has not acknowledged yet.
//!
//! Events live in one queue, weekly summaries and person creations in another. An
//! item leaves its queue only after a retry is accepted; every failed retry bumps
//! `attempts` and leaves the item where it was relative to the others. Dedup is the
//! backend's job, keyed on the event id, so replays are harmless.

use crate::api_client::{ApiClient, EVENTS_PATH, PEOPLE_PATH, WEEKLY_PATH};
use crate::database::Database;
use eyre::Result;
use serde::Serialize;
use tally_common::api::ApiResponse;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const EVENT_QUEUE_KEY: &str = "tally.queue";
pub const WEEKLY_QUEUE_KEY: &str = "tally.weeklyQueue";

const FLUSH_LEASE: &str = "flush";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Event,
    Weekly,
    #[serde(alias = "people")]
    Person,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Event => "event",
            QueueKind::Weekly => "weekly",
            QueueKind::Person => "person",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            QueueKind::Event => EVENTS_PATH,
            QueueKind::Weekly => WEEKLY_PATH,
            QueueKind::Person => PEOPLE_PATH,
        }
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            QueueKind::Event => EVENT_QUEUE_KEY,
            QueueKind::Weekly | QueueKind::Person => WEEKLY_QUEUE_KEY,
        }
    }

    /// Whether the backend's answer means the item can be dropped. A duplicate is as
    /// good as a success for events and people, but not for weekly summaries.
    pub fn accepts(&self, res: &ApiResponse) -> bool {
        match self {
            QueueKind::Event | QueueKind::Person => res.is_ok() || res.is_duplicate(),
            QueueKind::Weekly => res.is_ok(),
        }
    }
}

impl std::fmt::Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueueItem {
    pub id: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: QueueKind,
    pub payload: serde_json::Value,
    pub created_at: String,
    pub attempts: u32,
}

impl QueueItem {
    pub fn new(kind: QueueKind, payload: serde_json::Value) -> Result<Self> {
        let now = OffsetDateTime::now_utc();
        let id = payload
            .get("event_id")
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("{}-{}", kind.as_str(), Uuid::new_v4().simple()));

        Ok(Self {
            id,
            kind,
            payload,
            created_at: now.format(&Rfc3339)?,
            attempts: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Items the backend accepted and that were removed.
    pub sent: usize,
    /// Items still waiting after this pass.
    pub retained: usize,
    /// Another flush held the lease, nothing was attempted.
    pub skipped: bool,
}

pub struct OutboundQueue<'a> {
    db: &'a Database,
}

impl<'a> OutboundQueue<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn enqueue<T: Serialize>(&self, kind: QueueKind, payload: &T) -> Result<QueueItem> {
        let item = QueueItem::new(kind, serde_json::to_value(payload)?)?;
        let queued = item.clone();
        let len = self
            .db
            .update_json(kind.storage_key(), |items: &mut Vec<QueueItem>| {
                items.push(queued);
                items.len()
            })
            .await?;

        info!(id = %item.id, kind = %kind, queued = len, "queued submission");
        Ok(item)
    }

    pub async fn items(&self, key: &str) -> Result<Vec<QueueItem>> {
        Ok(self.db.get_json(key).await?.unwrap_or_default())
    }

    /// Items across both queues, events first.
    pub async fn all(&self) -> Result<Vec<QueueItem>> {
        let mut items = self.items(EVENT_QUEUE_KEY).await?;
        items.extend(self.items(WEEKLY_QUEUE_KEY).await?);
        Ok(items)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }

    /// Retry everything in both queues, one request at a time and in insertion
    /// order. Only one flush runs at a time across processes; a flush that finds
    /// the lease taken returns a skipped report without touching the network.
    ///
    /// The lease is renewed before every request, so `lease` has to outlast a
    /// single request. A pass that loses the lease stops where it is.
    pub async fn flush(&self, client: &ApiClient, lease: time::Duration) -> Result<FlushReport> {
        let holder = Uuid::new_v4().to_string();
        if !self.db.try_acquire_lease(FLUSH_LEASE, &holder, lease).await? {
            debug!("another flush is running, skipping");
            return Ok(FlushReport {
                skipped: true,
                ..Default::default()
            });
        }

        let lease = Lease {
            holder: &holder,
            ttl: lease,
        };
        let result = self.drain_all(client, &lease).await;
        self.db.release_lease(FLUSH_LEASE, &holder).await?;
        result
    }

    async fn drain_all(&self, client: &ApiClient, lease: &Lease<'_>) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        let mut held = true;
        for key in [EVENT_QUEUE_KEY, WEEKLY_QUEUE_KEY] {
            let pass = if held {
                self.drain(key, client, lease).await?
            } else {
                Pass::default()
            };
            held &= !pass.lost_lease;
            report.sent += pass.sent.len();
            report.retained += self.settle(key, &pass).await?;
        }
        Ok(report)
    }

    async fn drain(&self, key: &str, client: &ApiClient, lease: &Lease<'_>) -> Result<Pass> {
        let mut pass = Pass::default();

        for item in self.items(key).await? {
            if !self
                .db
                .try_acquire_lease(FLUSH_LEASE, lease.holder, lease.ttl)
                .await?
            {
                warn!("flush lease lost, stopping");
                pass.lost_lease = true;
                break;
            }

            match client.post_json(item.kind.endpoint(), &item.payload).await {
                Ok(res) if item.kind.accepts(&res) => {
                    debug!(id = %item.id, status = %res.status, "queued item delivered");
                    pass.sent.push(item.id);
                }
                Ok(res) => {
                    warn!(id = %item.id, status = %res.status, attempts = item.attempts + 1, "queued item rejected");
                    pass.failed.push(item.id);
                }
                Err(e) => {
                    warn!(id = %item.id, attempts = item.attempts + 1, "queued item failed: {e}");
                    pass.failed.push(item.id);
                }
            }
        }

        Ok(pass)
    }

    /// Apply a pass to what is stored now rather than to the snapshot it started
    /// from, so items enqueued meanwhile keep their place.
    async fn settle(&self, key: &str, pass: &Pass) -> Result<usize> {
        if pass.sent.is_empty() && pass.failed.is_empty() {
            return Ok(self.items(key).await?.len());
        }

        self.db
            .update_json(key, |current: &mut Vec<QueueItem>| {
                current.retain(|item| !pass.sent.contains(&item.id));
                for item in current.iter_mut() {
                    if pass.failed.contains(&item.id) {
                        item.attempts += 1;
                    }
                }
                current.len()
            })
            .await
    }
}

struct Lease<'a> {
    holder: &'a str,
    ttl: time::Duration,
}

/// Ids touched by one pass over a queue.
#[derive(Default)]
struct Pass {
    sent: Vec<String>,
    failed: Vec<String>,
    lost_lease: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Credentials;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn memory_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn client(uri: &str) -> ApiClient {
        ApiClient::new(&Credentials::new(uri, "secret", ""), Duration::from_secs(5)).unwrap()
    }

    fn status(value: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "status": value }))
    }

    #[test]
    fn item_id_comes_from_event_id() {
        let item = QueueItem::new(QueueKind::Event, json!({ "event_id": "e-1" })).unwrap();
        assert_eq!(item.id, "e-1");
        assert_eq!(item.attempts, 0);

        let item = QueueItem::new(QueueKind::Weekly, json!({ "notes": "" })).unwrap();
        assert!(item.id.starts_with("weekly-"));
        let again = QueueItem::new(QueueKind::Weekly, json!({ "notes": "" })).unwrap();
        assert_ne!(item.id, again.id);
    }

    #[test]
    fn legacy_people_kind_is_read() {
        let item: QueueItem = serde_json::from_value(json!({
            "id": "people-1",
            "type": "people",
            "payload": {},
            "created_at": "2024-01-01T00:00:00Z",
            "attempts": 2
        }))
        .unwrap();
        assert_eq!(item.kind, QueueKind::Person);
    }

    #[tokio::test]
    async fn enqueue_routes_by_kind() {
        let db = memory_db().await;
        let queue = OutboundQueue::new(&db);

        queue.enqueue(QueueKind::Event, &json!({ "event_id": "e1" })).await.unwrap();
        queue.enqueue(QueueKind::Weekly, &json!({ "notes": "w" })).await.unwrap();
        queue.enqueue(QueueKind::Person, &json!({ "person_id": "P1" })).await.unwrap();

        assert_eq!(queue.items(EVENT_QUEUE_KEY).await.unwrap().len(), 1);
        let weekly = queue.items(WEEKLY_QUEUE_KEY).await.unwrap();
        assert_eq!(
            weekly.iter().map(|i| i.kind).collect::<Vec<_>>(),
            vec![QueueKind::Weekly, QueueKind::Person]
        );
        assert_eq!(queue.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn flush_drops_accepted_and_keeps_failed_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/events"))
            .and(body_partial_json(json!({ "event_id": "e1" })))
            .respond_with(status("ok"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/events"))
            .and(body_partial_json(json!({ "event_id": "e2" })))
            .respond_with(status("error"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/events"))
            .and(body_partial_json(json!({ "event_id": "e3" })))
            .respond_with(status("duplicate_ignored"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/events"))
            .and(body_partial_json(json!({ "event_id": "e4" })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let db = memory_db().await;
        let queue = OutboundQueue::new(&db);
        for id in ["e1", "e2", "e3", "e4"] {
            queue.enqueue(QueueKind::Event, &json!({ "event_id": id })).await.unwrap();
        }

        let report = queue
            .flush(&client(&server.uri()), time::Duration::minutes(2))
            .await
            .unwrap();
        assert_eq!(
            report,
            FlushReport {
                sent: 2,
                retained: 2,
                skipped: false
            }
        );

        let left = queue.items(EVENT_QUEUE_KEY).await.unwrap();
        assert_eq!(
            left.iter().map(|i| (i.id.as_str(), i.attempts)).collect::<Vec<_>>(),
            vec![("e2", 1), ("e4", 1)]
        );
    }

    #[tokio::test]
    async fn weekly_queue_routes_and_only_people_accept_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/weekly"))
            .respond_with(status("duplicate_ignored"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/people"))
            .respond_with(status("duplicate_ignored"))
            .expect(1)
            .mount(&server)
            .await;

        let db = memory_db().await;
        let queue = OutboundQueue::new(&db);
        queue.enqueue(QueueKind::Weekly, &json!({ "notes": "w" })).await.unwrap();
        queue.enqueue(QueueKind::Person, &json!({ "person_id": "P1" })).await.unwrap();

        let report = queue
            .flush(&client(&server.uri()), time::Duration::minutes(2))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);

        let left = queue.items(WEEKLY_QUEUE_KEY).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].kind, QueueKind::Weekly);
        assert_eq!(left[0].attempts, 1);
    }

    #[tokio::test]
    async fn attempts_accumulate_across_flushes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let db = memory_db().await;
        let queue = OutboundQueue::new(&db);
        queue.enqueue(QueueKind::Event, &json!({ "event_id": "e1" })).await.unwrap();

        let client = client(&server.uri());
        for _ in 0..3 {
            queue.flush(&client, time::Duration::minutes(2)).await.unwrap();
        }

        let left = queue.items(EVENT_QUEUE_KEY).await.unwrap();
        assert_eq!(left[0].attempts, 3);
    }

    #[tokio::test]
    async fn held_lease_skips_flush() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(status("ok"))
            .expect(0)
            .mount(&server)
            .await;

        let db = memory_db().await;
        let queue = OutboundQueue::new(&db);
        queue.enqueue(QueueKind::Event, &json!({ "event_id": "e1" })).await.unwrap();
        assert!(db
            .try_acquire_lease(FLUSH_LEASE, "someone-else", time::Duration::minutes(2))
            .await
            .unwrap());

        let report = queue
            .flush(&client(&server.uri()), time::Duration::minutes(2))
            .await
            .unwrap();
        assert!(report.skipped);
        assert_eq!(queue.items(EVENT_QUEUE_KEY).await.unwrap()[0].attempts, 0);
    }

    async fn shared_file_dbs(dir: &tempfile::TempDir) -> (Database, Database) {
        let path = dir.path().join("tally.db");
        let first = Database::new(&path).await.unwrap();
        let second = Database::new(&path).await.unwrap();
        (first, second)
    }

    fn posted_ids(requests: Vec<wiremock::Request>) -> Vec<String> {
        requests
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["event_id"].as_str().unwrap_or_default().to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn lease_is_renewed_while_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/events"))
            .respond_with(status("ok").set_delay(Duration::from_millis(600)))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let (db_a, db_b) = shared_file_dbs(&dir).await;
        let lease = time::Duration::seconds(1);
        let client = client(&server.uri());

        for id in ["e1", "e2", "e3"] {
            OutboundQueue::new(&db_a)
                .enqueue(QueueKind::Event, &json!({ "event_id": id }))
                .await
                .unwrap();
        }

        let first = async { OutboundQueue::new(&db_a).flush(&client, lease).await.unwrap() };
        let second = async {
            tokio::time::sleep(Duration::from_millis(900)).await;
            OutboundQueue::new(&db_b)
                .enqueue(QueueKind::Event, &json!({ "event_id": "e4" }))
                .await
                .unwrap();
            // Past the first lease's original expiry, before the pass ends.
            tokio::time::sleep(Duration::from_millis(400)).await;
            OutboundQueue::new(&db_b).flush(&client, lease).await.unwrap()
        };
        let (first, second) = tokio::join!(first, second);

        assert!(second.skipped);
        assert_eq!(first.sent, 3);
        assert_eq!(first.retained, 1);

        let posted = posted_ids(server.received_requests().await.unwrap());
        assert_eq!(posted, vec!["e1", "e2", "e3"]);

        let left = OutboundQueue::new(&db_a).items(EVENT_QUEUE_KEY).await.unwrap();
        assert_eq!(
            left.iter().map(|i| (i.id.as_str(), i.attempts)).collect::<Vec<_>>(),
            vec![("e4", 0)]
        );
    }

    #[tokio::test]
    async fn lost_lease_stops_the_pass_and_keeps_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/events"))
            .respond_with(status("ok").set_delay(Duration::from_millis(1200)))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let (db_a, db_b) = shared_file_dbs(&dir).await;
        let client = client(&server.uri());

        for id in ["e1", "e2"] {
            OutboundQueue::new(&db_a)
                .enqueue(QueueKind::Event, &json!({ "event_id": id }))
                .await
                .unwrap();
        }

        let first = async {
            OutboundQueue::new(&db_a)
                .flush(&client, time::Duration::seconds(1))
                .await
                .unwrap()
        };
        let takeover = async {
            tokio::time::sleep(Duration::from_millis(1100)).await;
            db_b.try_acquire_lease(FLUSH_LEASE, "other", time::Duration::minutes(2))
                .await
                .unwrap()
        };
        let (first, taken) = tokio::join!(first, takeover);

        assert!(taken);
        assert_eq!(first.sent, 1);
        assert_eq!(posted_ids(server.received_requests().await.unwrap()), vec!["e1"]);

        let left = OutboundQueue::new(&db_a).items(EVENT_QUEUE_KEY).await.unwrap();
        assert_eq!(
            left.iter().map(|i| (i.id.as_str(), i.attempts)).collect::<Vec<_>>(),
            vec![("e2", 0)]
        );
    }
}
