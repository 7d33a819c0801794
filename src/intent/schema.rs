//! Closed intent set and the output schema handed to the model

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Property the model must fill with its classification
pub const EVALUATION_FIELD: &str = "evaluation";

/// A recognized user-command category
///
/// Deserializing never fails on an unfamiliar label: anything outside the
/// set resolves to [`Intent::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Intent {
    #[serde(rename = "turn_on_light")]
    LightsOn,
    #[serde(rename = "turn_off_light")]
    LightsOff,
    #[serde(rename = "set_alarm")]
    SetAlarm,
    #[serde(rename = "check_weather")]
    CheckWeather,
    #[serde(rename = "talk")]
    Talk,
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "notforme")]
    NotForMe,
}

const INTENT_LABELS: [&str; 7] = [
    "turn_on_light",
    "turn_off_light",
    "set_alarm",
    "check_weather",
    "talk",
    "unknown",
    "notforme",
];

impl Intent {
    /// Every intent, in prompt order
    pub const ALL: [Self; 7] = [
        Self::LightsOn,
        Self::LightsOff,
        Self::SetAlarm,
        Self::CheckWeather,
        Self::Talk,
        Self::Unknown,
        Self::NotForMe,
    ];

    /// Wire label for this intent
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LightsOn => INTENT_LABELS[0],
            Self::LightsOff => INTENT_LABELS[1],
            Self::SetAlarm => INTENT_LABELS[2],
            Self::CheckWeather => INTENT_LABELS[3],
            Self::Talk => INTENT_LABELS[4],
            Self::Unknown => INTENT_LABELS[5],
            Self::NotForMe => INTENT_LABELS[6],
        }
    }

    /// Resolve a model label, falling back to `Unknown`
    ///
    /// Surrounding whitespace is ignored and letters compare case-insensitively,
    /// so `" Turn_On_Light\n"` still resolves.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Self::Unknown)
    }

    /// Whether `label` names a member of the set
    #[must_use]
    pub fn is_known_label(label: &str) -> bool {
        let label = label.trim();
        INTENT_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

impl From<String> for Intent {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire labels of every intent, stable for the process lifetime
#[must_use]
pub fn enumerated_intents() -> &'static [&'static str] {
    &INTENT_LABELS
}

/// JSON schema primitive types used by the output constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    String,
}

/// Constraint on a single string property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(rename = "enum")]
    pub allowed: Vec<String>,
}

/// Structured-output constraint sent as the request `format`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

/// Schema requiring one `evaluation` string drawn from the intent set
#[must_use]
pub fn output_schema() -> OutputSchema {
    let evaluation = PropertySchema {
        kind: SchemaType::String,
        allowed: enumerated_intents()
            .iter()
            .map(ToString::to_string)
            .collect(),
    };

    OutputSchema {
        kind: SchemaType::Object,
        properties: BTreeMap::from([(EVALUATION_FIELD.to_string(), evaluation)]),
        required: vec![EVALUATION_FIELD.to_string()],
    }
}
