use std::str::FromStr;

/// Relationship type of a person. The backend owns the list; these are the ones the
/// client can create and filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PersonType {
    Social,
    Pro,
    Romance,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Social => "Social",
            PersonType::Pro => "Pro",
            PersonType::Romance => "Romance",
        }
    }

    /// People offered for a metric are narrowed to the type the metric implies.
    /// Metrics without an entry offer everyone.
    pub fn for_metric(metric_code: &str) -> Option<Self> {
        match metric_code {
            "SOCIAL_MEET" => Some(PersonType::Social),
            "PRO_CONTACT_ADDED" | "RELEVANT_CONTACT_APPROACH" | "STAKEHOLDER_CHAT" => {
                Some(PersonType::Pro)
            }
            "DATE" | "SEX" | "RELATIONSHIP_START" | "RELATIONSHIP_END" | "PARTNER_QUALITY_TIME" => {
                Some(PersonType::Romance)
            }
            _ => None,
        }
    }
}

impl FromStr for PersonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "social" => Ok(Self::Social),
            "pro" => Ok(Self::Pro),
            "romance" => Ok(Self::Romance),
            _ => Err(format!("unknown person type '{s}', expected Social, Pro or Romance")),
        }
    }
}

impl std::fmt::Display for PersonType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input style of a tile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WidgetKind {
    Stepper,
    MinutePicker,
    DurationPicker,
    TemplateStepper,
    #[default]
    Fixed,
    TagToggle,
    PersonToggle,
    Other(String),
}

impl WidgetKind {
    pub fn as_str(&self) -> &str {
        match self {
            WidgetKind::Stepper => "stepper",
            WidgetKind::MinutePicker => "minute_picker",
            WidgetKind::DurationPicker => "duration_picker",
            WidgetKind::TemplateStepper => "template_stepper",
            WidgetKind::Fixed => "fixed",
            WidgetKind::TagToggle => "tag_toggle",
            WidgetKind::PersonToggle => "person_toggle",
            WidgetKind::Other(v) => v.as_str(),
        }
    }

    /// Kinds that let the user adjust the number. Everything else logs the tile default.
    pub fn has_value_control(&self) -> bool {
        matches!(
            self,
            WidgetKind::Stepper
                | WidgetKind::MinutePicker
                | WidgetKind::DurationPicker
                | WidgetKind::TemplateStepper
        )
    }
}

impl From<String> for WidgetKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stepper" => Self::Stepper,
            "minute_picker" => Self::MinutePicker,
            "duration_picker" => Self::DurationPicker,
            "template_stepper" => Self::TemplateStepper,
            "fixed" => Self::Fixed,
            "tag_toggle" => Self::TagToggle,
            "person_toggle" => Self::PersonToggle,
            _ => Self::Other(value),
        }
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for WidgetKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for WidgetKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::lenient::string(deserializer).map(WidgetKind::from)
    }
}
