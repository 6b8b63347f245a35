use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest counter name accepted anywhere in the system, in characters.
pub const MAX_COUNTER_NAME_CHARS: usize = 100;

/// Name of the counter shown on the page when nothing else is configured.
pub const DEFAULT_COUNTER_NAME: &str = "main_counter";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CounterId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: CounterId,
    pub name: String,
    pub value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterCreate {
    pub name: String,
    #[serde(default)]
    pub value: i64,
}

impl CounterCreate {
    pub fn new(name: impl Into<String>, value: i64) -> Result<Self, NameError> {
        let name = name.into();
        validate_counter_name(&name)?;
        Ok(Self { name, value })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterUpdate {
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("counter name must not be empty")]
    Empty,
    #[error("counter name is {len} characters, limit is {MAX_COUNTER_NAME_CHARS}")]
    TooLong { len: usize },
}

pub fn validate_counter_name(name: &str) -> Result<(), NameError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(NameError::Empty);
    }
    if len > MAX_COUNTER_NAME_CHARS {
        return Err(NameError::TooLong { len });
    }
    Ok(())
}

/// The three buttons on the counter page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterAction {
    Increment,
    Decrement,
    Reset,
}

impl CounterAction {
    pub const ALL: [CounterAction; 3] = [Self::Increment, Self::Decrement, Self::Reset];

    /// Amount added to the stored value. `None` means the value is set to 0.
    pub fn delta(self) -> Option<i64> {
        match self {
            Self::Increment => Some(1),
            Self::Decrement => Some(-1),
            Self::Reset => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::Reset => "reset",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Self::Increment => "Incremented! ✅",
            Self::Decrement => "Decremented! ⬇️",
            Self::Reset => "Reset to zero! 🔄",
        }
    }
}

impl fmt::Display for CounterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown counter action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for CounterAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increment" => Ok(Self::Increment),
            "decrement" => Ok(Self::Decrement),
            "reset" => Ok(Self::Reset),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
