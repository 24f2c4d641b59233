//! What a tile asks for before it can be logged, and how the answers become a payload.

use crate::catalog;
use crate::datetime::ReferenceClock;
use crate::utils::{generate_event_id, generate_person_id};
use tally_common::api::{
    ConfigDocument, DrinkTemplate, EventPayload, Metric, Person, PersonPayload, Tile,
    WeeklyPayload, SOURCE_TAG,
};
use tally_common::domain::{PersonType, WidgetKind};
use time::OffsetDateTime;

const FALLBACK_VALUE: f64 = 1.0;
const FALLBACK_STEP: f64 = 1.0;

/// Reasons a submission is refused before anything is sent or queued.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Tags required for this tile")]
    MissingTags,

    #[error("Select a person")]
    MissingPerson,

    #[error("Choose a template")]
    MissingTemplate,

    #[error("Use dd/mm/yyyy HH:MM for backdate")]
    InvalidBackdate,

    #[error("Add a name first")]
    MissingName,

    #[error("Use dd/mm/yyyy for First met")]
    InvalidFirstMet,

    #[error("Use dd/mm/yyyy for week start")]
    InvalidWeekStart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueInput {
    /// The user picks the number, starting from `default`.
    Adjustable {
        default: f64,
        step: f64,
        presets: Vec<String>,
    },
    /// The tile always logs this value.
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonChoice {
    pub person: Person,
    pub favorite: bool,
}

/// People offered for a metric: narrowed to the type the metric implies,
/// favorites first, config order otherwise.
pub fn people_for_metric(
    config: &ConfigDocument,
    metric_code: &str,
    favorites: &[String],
) -> Vec<PersonChoice> {
    let wanted = PersonType::for_metric(metric_code);
    let candidates: Vec<&Person> = catalog::people(config)
        .filter(|p| wanted.map_or(true, |t| p.kind == t.as_str()))
        .collect();

    let (favored, others): (Vec<&Person>, Vec<&Person>) = candidates
        .into_iter()
        .partition(|p| favorites.contains(&p.person_id));

    favored
        .into_iter()
        .map(|p| PersonChoice {
            person: p.clone(),
            favorite: true,
        })
        .chain(others.into_iter().map(|p| PersonChoice {
            person: p.clone(),
            favorite: false,
        }))
        .collect()
}

fn split_presets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// What the user entered for a tile.
#[derive(Debug, Clone, Default)]
pub struct EventInput {
    pub value: Option<f64>,
    pub person_id: Option<String>,
    pub drink_template_id: Option<String>,
    pub tags: String,
    pub notes: String,
    /// `dd/mm/yyyy HH:MM` when backdating is turned on.
    pub backdate: Option<String>,
}

/// The inputs one tile needs.
#[derive(Debug, Clone)]
pub struct EventForm {
    pub tile: Tile,
    pub metric: Metric,
    pub unit: String,
    pub value: ValueInput,
    /// Present when a person must be picked.
    pub people: Option<Vec<PersonChoice>>,
    /// Present when a drink template must be picked.
    pub templates: Option<Vec<DrinkTemplate>>,
    /// Present for tag tiles; holds suggested tags.
    pub tags: Option<Vec<String>>,
}

impl EventForm {
    pub fn new(tile: &Tile, config: &ConfigDocument, favorites: &[String]) -> Self {
        let metric = catalog::metric(config, &tile.metric_code)
            .cloned()
            .unwrap_or_default();

        let default = tile.default_value.unwrap_or(FALLBACK_VALUE);
        let presets = if tile.presets.trim().is_empty() {
            split_presets(&metric.presets)
        } else {
            split_presets(&tile.presets)
        };
        let unit = if tile.unit.is_empty() {
            metric.default_unit.clone()
        } else {
            tile.unit.clone()
        };

        let value = if tile.widget_type.has_value_control() {
            ValueInput::Adjustable {
                default,
                step: tile.step.or(metric.default_step).unwrap_or(FALLBACK_STEP),
                presets: presets.clone(),
            }
        } else {
            ValueInput::Fixed(default)
        };

        let needs_person = tile.needs_person
            || metric.needs_person
            || tile.widget_type == WidgetKind::PersonToggle;
        let needs_template = tile.needs_template
            || metric.needs_template
            || tile.widget_type == WidgetKind::TemplateStepper;

        let people = needs_person.then(|| people_for_metric(config, &tile.metric_code, favorites));
        let templates = needs_template.then(|| catalog::drink_templates(config));
        let tags = (tile.widget_type == WidgetKind::TagToggle).then_some(presets);

        Self {
            tile: tile.clone(),
            metric,
            unit,
            value,
            people,
            templates,
            tags,
        }
    }

    pub fn requires_person(&self) -> bool {
        self.people.is_some()
    }

    pub fn requires_template(&self) -> bool {
        self.templates.is_some()
    }

    pub fn requires_tags(&self) -> bool {
        self.tags.is_some()
    }

    /// Validate the input and assemble the event. Checks run in a fixed order:
    /// tags, person, template, backdate.
    pub fn build(
        &self,
        input: &EventInput,
        clock: &ReferenceClock,
        now: OffsetDateTime,
    ) -> Result<EventPayload, ValidationError> {
        let person_id = non_empty(input.person_id.as_deref());
        let drink_template_id = non_empty(input.drink_template_id.as_deref());

        if self.requires_tags() && input.tags.trim().is_empty() {
            return Err(ValidationError::MissingTags);
        }
        if self.requires_person() && person_id.is_none() {
            return Err(ValidationError::MissingPerson);
        }
        if self.requires_template() && drink_template_id.is_none() {
            return Err(ValidationError::MissingTemplate);
        }

        let occurred = match &input.backdate {
            Some(raw) => clock
                .parse_date_time_input(raw)
                .ok_or(ValidationError::InvalidBackdate)?,
            None => now,
        };

        let value = match &self.value {
            ValueInput::Adjustable { default, .. } => {
                input.value.filter(|v| v.is_finite()).unwrap_or(*default)
            }
            ValueInput::Fixed(value) => *value,
        };

        Ok(EventPayload {
            event_id: generate_event_id(),
            occurred_at: clock.to_iso_with_offset(occurred),
            metric_code: self.tile.metric_code.clone(),
            value,
            unit: self.unit.clone(),
            person_id: person_id.filter(|_| self.requires_person()),
            drink_template_id: drink_template_id.filter(|_| self.requires_template()),
            notes: input.notes.clone(),
            tags: if self.requires_tags() {
                input.tags.clone()
            } else {
                String::new()
            },
            starred: 0,
            source: SOURCE_TAG.into(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// A person created inline from the client.
#[derive(Debug, Clone)]
pub struct PersonDraft {
    pub name: String,
    pub kind: PersonType,
    /// `dd/mm/yyyy`, optional.
    pub first_met: Option<String>,
}

impl PersonDraft {
    pub fn build(&self, clock: &ReferenceClock) -> Result<PersonPayload, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let first_met = match non_empty(self.first_met.as_deref()) {
            Some(raw) => {
                let parsed = clock
                    .parse_date_input(&raw)
                    .ok_or(ValidationError::InvalidFirstMet)?;
                Some(clock.to_iso_with_offset(parsed))
            }
            None => None,
        };

        Ok(PersonPayload {
            person_id: generate_person_id(),
            name: name.to_string(),
            kind: self.kind.as_str().to_string(),
            first_met,
        })
    }
}

/// The weekly summary form.
#[derive(Debug, Clone, Default)]
pub struct WeeklyDraft {
    /// `dd/mm/yyyy`.
    pub week_start: String,
    pub work_hours: Option<f64>,
    pub expenses_personal: Option<f64>,
    pub excluded_renovation: Option<f64>,
    pub net_worth: Option<f64>,
    pub deal_spike: bool,
    pub notes: String,
}

impl WeeklyDraft {
    pub fn build(&self, clock: &ReferenceClock) -> Result<WeeklyPayload, ValidationError> {
        let week_start = clock
            .parse_date_input(&self.week_start)
            .ok_or(ValidationError::InvalidWeekStart)?;

        Ok(WeeklyPayload {
            week_start: clock.to_iso_with_offset(week_start),
            work_hours: self.work_hours,
            expenses_personal_rub: self.expenses_personal,
            excluded_renovation_rub: self.excluded_renovation,
            net_worth_rub: self.net_worth,
            deal_spike_flag: u8::from(self.deal_spike),
            notes: self.notes.clone(),
            source: SOURCE_TAG.into(),
        })
    }
}
