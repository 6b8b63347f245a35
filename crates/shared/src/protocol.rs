use serde::{Deserialize, Serialize};

/// Body of a button press on the counter page.
///
/// `displayed` is the value the page currently shows; it is echoed back
/// untouched when the action fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default, with = "i64_text")]
    pub displayed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Neutral,
    Positive,
    Negative,
}

impl StatusTone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

/// Everything the page needs to redraw itself after load or a button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub counter_name: String,
    /// Sent as a decimal string so browsers keep all 64 bits.
    #[serde(with = "i64_text")]
    pub value: i64,
    pub status: String,
    pub tone: StatusTone,
    /// Milliseconds after which the status line goes back to "Ready".
    /// Absent when the status must stay until the next action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_after_ms: Option<u64>,
}

/// `i64` as a JSON string. Plain numbers are still accepted on input.
mod i64_text {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(i64),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(value) => Ok(value),
            Wire::Text(text) => text.trim().parse().map_err(de::Error::custom),
        }
    }
}
