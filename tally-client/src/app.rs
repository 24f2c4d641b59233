//! Application context: owns settings, the local store and credentials, and exposes
//! the operations the CLI performs. Everything it persists is written as soon as it
//! changes, so a killed process resumes from the store on the next start.

use crate::api_client::ApiClient;
use crate::config_cache::{ConfigCache, LoadedConfig};
use crate::connection::{test_connection, ConnectionStatus, Connectivity};
use crate::database::Database;
use crate::datetime::ReferenceClock;
use crate::favorites::Favorites;
use crate::form::{EventForm, EventInput, PersonDraft, ValidationError, WeeklyDraft};
use crate::queue::{FlushReport, OutboundQueue, QueueKind};
use crate::settings::{Credentials, Settings};
use eyre::Result;
use tally_common::api::{EventPayload, Person, PersonPayload, WeeklyPayload};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The backend accepted it.
    Sent,
    /// It is waiting in the outbound queue.
    Queued,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersonOutcome {
    Created(Person),
    Queued(PersonPayload),
}

pub struct App {
    pub settings: Settings,
    pub db: Database,
    pub clock: ReferenceClock,
    pub connectivity: Connectivity,
    credentials: Credentials,
}

impl App {
    pub async fn new(settings: Settings, connectivity: Connectivity) -> Result<Self> {
        let db = Database::new(&settings.db_path).await?;
        Self::with_database(settings, db, connectivity).await
    }

    pub async fn with_database(
        settings: Settings,
        db: Database,
        connectivity: Connectivity,
    ) -> Result<Self> {
        let clock = ReferenceClock::new(settings.reference_offset_minutes)?;
        let credentials = Credentials::load(&db).await?;

        Ok(Self {
            settings,
            db,
            clock,
            connectivity,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn save_credentials(&mut self, credentials: Credentials) -> Result<()> {
        credentials.save(&self.db).await?;
        self.credentials = credentials;
        Ok(())
    }

    pub fn favorites(&self) -> Favorites<'_> {
        Favorites::new(&self.db)
    }

    pub fn queue(&self) -> OutboundQueue<'_> {
        OutboundQueue::new(&self.db)
    }

    pub fn config_cache(&self) -> ConfigCache<'_> {
        ConfigCache::new(&self.db)
    }

    pub async fn is_online(&self) -> bool {
        self.connectivity.is_online(&self.credentials).await
    }

    /// A client when credentials are set, `None` otherwise.
    fn client(&self) -> Result<Option<ApiClient>> {
        if !self.credentials.is_complete() {
            return Ok(None);
        }
        Ok(Some(ApiClient::new(
            &self.credentials,
            self.settings.request_timeout(),
        )?))
    }

    /// A client only when credentials are set and the network is reachable.
    async fn online_client(&self) -> Result<Option<ApiClient>> {
        let Some(client) = self.client()? else {
            return Ok(None);
        };
        if !self.is_online().await {
            debug!("offline");
            return Ok(None);
        }
        Ok(Some(client))
    }

    /// Current reference-timezone wall clock as a backdate input.
    pub fn default_backdate(&self) -> String {
        self.clock.default_backdate(OffsetDateTime::now_utc())
    }

    pub async fn load_config(&self, force: bool) -> Result<LoadedConfig> {
        let client = if force || self.config_cache().cached().await?.is_none() {
            self.online_client().await?
        } else {
            None
        };
        self.config_cache().load(client.as_ref(), force).await
    }

    /// Form for a tile, with the current favorites applied to the person picker.
    pub async fn event_form(&self, tile_id: &str) -> Result<Option<EventForm>> {
        let Some(config) = self.load_config(false).await?.config else {
            return Ok(None);
        };
        let Some(tile) = crate::catalog::find_tile(&config, tile_id) else {
            return Ok(None);
        };
        let favorites = self.favorites().list().await?;
        Ok(Some(EventForm::new(tile, &config, &favorites)))
    }

    /// Validate and submit an event from a tile form.
    pub async fn log_event(
        &self,
        form: &EventForm,
        input: &EventInput,
    ) -> Result<std::result::Result<SubmitOutcome, ValidationError>> {
        let payload = match form.build(input, &self.clock, OffsetDateTime::now_utc()) {
            Ok(payload) => payload,
            Err(e) => return Ok(Err(e)),
        };
        Ok(Ok(self.submit_event(&payload).await?))
    }

    pub async fn submit_event(&self, payload: &EventPayload) -> Result<SubmitOutcome> {
        if let Some(client) = self.online_client().await? {
            match client.post_event(payload).await {
                Ok(res) if QueueKind::Event.accepts(&res) => {
                    info!(event_id = %payload.event_id, status = %res.status, "event logged");
                    return Ok(SubmitOutcome::Sent);
                }
                Ok(res) => warn!(status = %res.status, "event rejected, queueing"),
                Err(e) => warn!("event submit failed, queueing: {e}"),
            }
        }

        self.queue().enqueue(QueueKind::Event, payload).await?;
        Ok(SubmitOutcome::Queued)
    }

    pub async fn submit_weekly(
        &self,
        draft: &WeeklyDraft,
    ) -> Result<std::result::Result<SubmitOutcome, ValidationError>> {
        let payload = match draft.build(&self.clock) {
            Ok(payload) => payload,
            Err(e) => return Ok(Err(e)),
        };
        Ok(Ok(self.submit_weekly_payload(&payload).await?))
    }

    pub async fn submit_weekly_payload(&self, payload: &WeeklyPayload) -> Result<SubmitOutcome> {
        if let Some(client) = self.online_client().await? {
            match client.post_weekly(payload).await {
                Ok(res) if QueueKind::Weekly.accepts(&res) => {
                    info!(week_start = %payload.week_start, "weekly saved");
                    return Ok(SubmitOutcome::Sent);
                }
                Ok(res) => warn!(status = %res.status, "weekly rejected, queueing"),
                Err(e) => warn!("weekly submit failed, queueing: {e}"),
            }
        }

        self.queue().enqueue(QueueKind::Weekly, payload).await?;
        Ok(SubmitOutcome::Queued)
    }

    /// Create a person. An accepted person is added to the cached config so it can
    /// be picked right away; otherwise the request is queued.
    pub async fn create_person(
        &self,
        draft: &PersonDraft,
    ) -> Result<std::result::Result<PersonOutcome, ValidationError>> {
        let payload = match draft.build(&self.clock) {
            Ok(payload) => payload,
            Err(e) => return Ok(Err(e)),
        };

        if let Some(client) = self.online_client().await? {
            match client.post_person(&payload).await {
                Ok(res) if QueueKind::Person.accepts(&res) => {
                    let mut person = Person::from(&payload);
                    if let Some(id) = res.person_id.filter(|id| !id.is_empty()) {
                        person.person_id = id;
                    }
                    info!(person_id = %person.person_id, "person created");
                    self.config_cache().append_person(person.clone()).await?;
                    return Ok(Ok(PersonOutcome::Created(person)));
                }
                Ok(res) => warn!(status = %res.status, "person rejected, queueing"),
                Err(e) => warn!("person create failed, queueing: {e}"),
            }
        }

        self.queue().enqueue(QueueKind::Person, &payload).await?;
        Ok(Ok(PersonOutcome::Queued(payload)))
    }

    /// Retry both queues. Does nothing while offline or without credentials.
    pub async fn flush(&self, manual: bool) -> Result<FlushReport> {
        let Some(client) = self.online_client().await? else {
            debug!("flush skipped: offline or missing credentials");
            return Ok(FlushReport {
                retained: self.queue().len().await?,
                ..Default::default()
            });
        };

        let report = self
            .queue()
            .flush(&client, self.settings.flush_lease())
            .await?;
        if manual && report.sent > 0 {
            info!(sent = report.sent, retained = report.retained, "queue flushed");
        }
        Ok(report)
    }

    pub async fn test_connection(&self, credentials: &Credentials) -> ConnectionStatus {
        test_connection(credentials, self.settings.request_timeout()).await
    }
}
