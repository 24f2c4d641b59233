use crate::domain::WidgetKind;
use crate::lenient;

/// Fixed source tag identifying this client to the backend.
pub const SOURCE_TAG: &str = "pwa";

pub const STATUS_OK: &str = "ok";
pub const STATUS_DUPLICATE: &str = "duplicate_ignored";

/// Body every endpoint answers with. Only `status` is always present.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiResponse {
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn is_duplicate(&self) -> bool {
        self.status == STATUS_DUPLICATE
    }
}

/// Response of `GET /v1/config`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigDocument {
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub metric_catalog: Vec<Metric>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub tile_catalog: Vec<Tile>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub people: Vec<Person>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub drink_templates: Vec<DrinkTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    #[serde(rename = "TileID", default, deserialize_with = "lenient::string")]
    pub tile_id: String,
    #[serde(rename = "DisplayName", default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(rename = "MetricCode", default, deserialize_with = "lenient::string")]
    pub metric_code: String,
    #[serde(rename = "WidgetType", default)]
    pub widget_type: WidgetKind,
    #[serde(rename = "DefaultValue", default, deserialize_with = "lenient::number")]
    pub default_value: Option<f64>,
    #[serde(rename = "Step", default, deserialize_with = "lenient::number")]
    pub step: Option<f64>,
    #[serde(rename = "Presets", default, deserialize_with = "lenient::string")]
    pub presets: String,
    #[serde(rename = "Unit", default, deserialize_with = "lenient::string")]
    pub unit: String,
    #[serde(rename = "Active?", default, deserialize_with = "lenient::flag")]
    pub active: bool,
    #[serde(rename = "Order", default, deserialize_with = "lenient::number")]
    pub order: Option<f64>,
    #[serde(rename = "NeedsPerson?", default, deserialize_with = "lenient::flag")]
    pub needs_person: bool,
    #[serde(rename = "NeedsTemplate?", default, deserialize_with = "lenient::flag")]
    pub needs_template: bool,
}

impl Tile {
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.tile_id
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Metric {
    #[serde(rename = "MetricCode", default, deserialize_with = "lenient::string")]
    pub metric_code: String,
    #[serde(rename = "MetricName", default, deserialize_with = "lenient::string")]
    pub metric_name: String,
    #[serde(rename = "Category", default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(rename = "DefaultUnit", default, deserialize_with = "lenient::string")]
    pub default_unit: String,
    #[serde(rename = "DefaultStep", default, deserialize_with = "lenient::number")]
    pub default_step: Option<f64>,
    #[serde(rename = "Presets", default, deserialize_with = "lenient::string")]
    pub presets: String,
    #[serde(rename = "NeedsPerson?", default, deserialize_with = "lenient::flag")]
    pub needs_person: bool,
    #[serde(rename = "NeedsTemplate?", default, deserialize_with = "lenient::flag")]
    pub needs_template: bool,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Person {
    #[serde(rename = "PersonID", default, deserialize_with = "lenient::string")]
    pub person_id: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "Type", default, deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(rename = "FirstMet", default, deserialize_with = "lenient::string")]
    pub first_met: String,
}

impl Person {
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.person_id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DrinkTemplate {
    #[serde(rename = "DrinkTemplateID", default, deserialize_with = "lenient::string")]
    pub drink_template_id: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient::string")]
    pub name: String,
}

/// Body of `POST /v1/events`. `event_id` lets the backend drop replays.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventPayload {
    pub event_id: String,
    pub occurred_at: String,
    pub metric_code: String,
    #[serde(serialize_with = "lenient::serialize_number")]
    pub value: f64,
    pub unit: String,
    pub person_id: Option<String>,
    pub drink_template_id: Option<String>,
    pub notes: String,
    pub tags: String,
    pub starred: u8,
    pub source: String,
}

/// Body of `POST /v1/weekly`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeeklyPayload {
    pub week_start: String,
    #[serde(
        serialize_with = "lenient::serialize_blank_if_none",
        deserialize_with = "lenient::number"
    )]
    pub work_hours: Option<f64>,
    #[serde(
        serialize_with = "lenient::serialize_blank_if_none",
        deserialize_with = "lenient::number"
    )]
    pub expenses_personal_rub: Option<f64>,
    #[serde(
        serialize_with = "lenient::serialize_blank_if_none",
        deserialize_with = "lenient::number"
    )]
    pub excluded_renovation_rub: Option<f64>,
    #[serde(
        serialize_with = "lenient::serialize_blank_if_none",
        deserialize_with = "lenient::number"
    )]
    pub net_worth_rub: Option<f64>,
    pub deal_spike_flag: u8,
    pub notes: String,
    pub source: String,
}

/// Body of `POST /v1/people`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersonPayload {
    pub person_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub first_met: Option<String>,
}

/// The config entry a person becomes once the backend accepts it.
impl From<&PersonPayload> for Person {
    fn from(payload: &PersonPayload) -> Self {
        Person {
            person_id: payload.person_id.clone(),
            name: payload.name.clone(),
            kind: payload.kind.clone(),
            first_met: payload.first_met.clone().unwrap_or_default(),
        }
    }
}
