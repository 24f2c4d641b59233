use crate::api_client::ApiClient;
use crate::database::Database;
use eyre::Result;
use tally_common::api::{ConfigDocument, Person};
use tracing::{debug, info, warn};

pub const CONFIG_KEY: &str = "tally.config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched from the backend just now.
    Fresh,
    /// Last document that was fetched successfully.
    Cached,
    /// Nothing fetched, nothing cached.
    Unavailable,
}

/// Best config currently available, and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Option<ConfigDocument>,
    pub freshness: Freshness,
}

impl LoadedConfig {
    fn from_cache(config: Option<ConfigDocument>) -> Self {
        let freshness = if config.is_some() {
            Freshness::Cached
        } else {
            Freshness::Unavailable
        };
        Self { config, freshness }
    }
}

pub struct ConfigCache<'a> {
    db: &'a Database,
}

impl<'a> ConfigCache<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn cached(&self) -> Result<Option<ConfigDocument>> {
        self.db.get_json(CONFIG_KEY).await
    }

    pub async fn store(&self, config: &ConfigDocument) -> Result<()> {
        self.db.put_json(CONFIG_KEY, config).await
    }

    /// Returns the cache straight away unless `force` is set or there is no cache.
    /// A fetch only replaces the cache when the backend accepts it; any failure
    /// falls back to the cache. `client` is `None` when credentials are missing,
    /// in which case nothing is fetched.
    pub async fn load(&self, client: Option<&ApiClient>, force: bool) -> Result<LoadedConfig> {
        let cached = self.cached().await?;

        let Some(client) = client else {
            debug!("no credentials, using cached config only");
            return Ok(LoadedConfig::from_cache(cached));
        };

        if !force && cached.is_some() {
            return Ok(LoadedConfig::from_cache(cached));
        }

        match client.config().await {
            Ok(config) => {
                self.store(&config).await?;
                info!(
                    tiles = config.tile_catalog.len(),
                    people = config.people.len(),
                    "config loaded"
                );
                Ok(LoadedConfig {
                    config: Some(config),
                    freshness: Freshness::Fresh,
                })
            }
            Err(e) => {
                warn!("config fetch failed: {e}");
                Ok(LoadedConfig::from_cache(cached))
            }
        }
    }

    /// Add a person the backend just accepted so later lookups can select them.
    pub async fn append_person(&self, person: Person) -> Result<()> {
        let Some(mut config) = self.cached().await? else {
            return Ok(());
        };
        if config.people.iter().any(|p| p.person_id == person.person_id) {
            return Ok(());
        }
        config.people.push(person);
        self.store(&config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Credentials;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_config() -> serde_json::Value {
        json!({
            "status": "ok",
            "tile_catalog": [{ "TileID": "T_MEET", "MetricCode": "SOCIAL_MEET", "Active?": true }],
            "people": [{ "PersonID": "P1", "Name": "Ann", "Type": "Social" }]
        })
    }

    fn cached_config() -> ConfigDocument {
        ConfigDocument {
            status: "ok".into(),
            people: vec![Person {
                person_id: "P0".into(),
                name: "Old".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn client(uri: &str) -> ApiClient {
        ApiClient::new(&Credentials::new(uri, "secret", ""), Duration::from_secs(5)).unwrap()
    }

    async fn memory_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn without_credentials_only_cache_is_used() {
        let db = memory_db().await;
        let cache = ConfigCache::new(&db);

        let loaded = cache.load(None, true).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Unavailable);
        assert!(loaded.config.is_none());

        cache.store(&cached_config()).await.unwrap();
        let loaded = cache.load(None, true).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Cached);
        assert_eq!(loaded.config.unwrap().people[0].person_id, "P0");
    }

    #[tokio::test]
    async fn cached_config_is_returned_without_fetch_unless_forced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote_config()))
            .expect(1)
            .mount(&server)
            .await;

        let db = memory_db().await;
        let cache = ConfigCache::new(&db);
        cache.store(&cached_config()).await.unwrap();
        let client = client(&server.uri());

        let loaded = cache.load(Some(&client), false).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Cached);

        let loaded = cache.load(Some(&client), true).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Fresh);
        assert_eq!(loaded.config.unwrap().people[0].person_id, "P1");

        let stored = cache.cached().await.unwrap().unwrap();
        assert_eq!(stored.tile_catalog[0].tile_id, "T_MEET");
    }

    #[tokio::test]
    async fn empty_cache_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote_config()))
            .expect(1)
            .mount(&server)
            .await;

        let db = memory_db().await;
        let cache = ConfigCache::new(&db);
        let loaded = cache.load(Some(&client(&server.uri())), false).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn failures_fall_back_to_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let db = memory_db().await;
        let cache = ConfigCache::new(&db);
        let client = client(&server.uri());

        let loaded = cache.load(Some(&client), true).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Unavailable);

        cache.store(&cached_config()).await.unwrap();
        let loaded = cache.load(Some(&client), true).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Cached);
        assert_eq!(loaded.config.unwrap().people[0].person_id, "P0");
    }

    #[tokio::test]
    async fn rejected_status_keeps_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "error", "message": "bad token" })),
            )
            .mount(&server)
            .await;

        let db = memory_db().await;
        let cache = ConfigCache::new(&db);
        cache.store(&cached_config()).await.unwrap();

        let loaded = cache.load(Some(&client(&server.uri())), true).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Cached);
        assert_eq!(cache.cached().await.unwrap().unwrap(), cached_config());
    }

    #[tokio::test]
    async fn malformed_cache_is_absent() {
        let db = memory_db().await;
        db.put_raw(CONFIG_KEY, "[1, 2").await.unwrap();

        let loaded = ConfigCache::new(&db).load(None, false).await.unwrap();
        assert_eq!(loaded.freshness, Freshness::Unavailable);
    }

    #[tokio::test]
    async fn appended_person_is_cached_once() {
        let db = memory_db().await;
        let cache = ConfigCache::new(&db);
        cache.store(&cached_config()).await.unwrap();

        let person = Person {
            person_id: "PABC123".into(),
            name: "New".into(),
            kind: "Social".into(),
            first_met: String::new(),
        };
        cache.append_person(person.clone()).await.unwrap();
        cache.append_person(person).await.unwrap();

        let stored = cache.cached().await.unwrap().unwrap();
        assert_eq!(stored.people.len(), 2);
        assert_eq!(stored.people[1].person_id, "PABC123");
    }
}
