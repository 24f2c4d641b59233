use eyre::{eyre, Result};
use serde_json::json;
use tally_client::app::App;
use tally_client::connection::Connectivity;
use tally_client::database::Database;
use tally_client::settings::{Credentials, Settings};
use wiremock::MockServer;

pub struct TestApp {
    pub app: App,
    pub server: MockServer,
}

impl TestApp {
    /// App backed by an in-memory store, pointed at a fresh mock backend.
    pub async fn build(online: bool) -> Result<Self> {
        let server = MockServer::start().await;
        let mut app = build_app("sqlite::memory:", Connectivity::Forced(online)).await?;
        app.save_credentials(Credentials::new(&server.uri(), "secret", ""))
            .await?;

        Ok(Self { app, server })
    }

    /// App with no backend credentials stored.
    pub async fn unconfigured() -> Result<Self> {
        let server = MockServer::start().await;
        let app = build_app("sqlite::memory:", Connectivity::Forced(true)).await?;
        Ok(Self { app, server })
    }
}

pub async fn build_app(db_path: &str, connectivity: Connectivity) -> Result<App> {
    let settings: Settings = Settings::build_default()?
        .set_default("db_path", db_path)?
        .set_default("request_timeout_secs", 5)?
        .build()?
        .try_deserialize()
        .map_err(|e| eyre!("Failed to deserialize {e}"))?;

    let db = Database::new(&settings.db_path).await?;
    App::with_database(settings, db, connectivity).await
}

pub fn config_document() -> serde_json::Value {
    json!({
        "status": "ok",
        "metric_catalog": [
            { "MetricCode": "SOCIAL_MEET", "MetricName": "Meet", "Category": "Social",
              "NeedsPerson?": true },
            { "MetricCode": "WATER", "MetricName": "Water", "Category": "Health",
              "DefaultUnit": "ml", "DefaultStep": 250 },
            { "MetricCode": "ALCOHOL", "MetricName": "Alcohol", "Category": "Health",
              "NeedsTemplate?": true },
            { "MetricCode": "MOOD", "MetricName": "Mood", "Category": "Mind",
              "Presets": "calm, tense" }
        ],
        "tile_catalog": [
            { "TileID": "T_MEET", "DisplayName": "Meet", "MetricCode": "SOCIAL_MEET",
              "WidgetType": "person_toggle", "DefaultValue": 1, "Active?": true, "Order": 1 },
            { "TileID": "T_WATER", "DisplayName": "Water", "MetricCode": "WATER",
              "WidgetType": "stepper", "DefaultValue": 250, "Active?": true, "Order": 2 },
            { "TileID": "T_DRINK", "DisplayName": "Drink", "MetricCode": "ALCOHOL",
              "WidgetType": "template_stepper", "DefaultValue": 1, "Active?": true, "Order": 3 },
            { "TileID": "T_MOOD", "DisplayName": "Mood", "MetricCode": "MOOD",
              "WidgetType": "tag_toggle", "Active?": "TRUE", "Order": 4 }
        ],
        "people": [
            { "PersonID": "P000001", "Name": "Ann", "Type": "Social" },
            { "PersonID": "P000002", "Name": "Bob", "Type": "Pro" }
        ],
        "drink_templates": [
            { "DrinkTemplateID": "D1", "Name": "Beer" }
        ]
    })
}

pub fn status(status: &str) -> serde_json::Value {
    json!({ "status": status })
}
