//! Per-view state of the counter page.
//!
//! A page instance only remembers what the store last told it. Reloading the
//! page starts over from [`CounterPage::load`].

use std::time::Duration;

use shared::{
    domain::CounterAction,
    error::ApiError,
    protocol::{PageView, StatusTone},
};
use tracing::info;

use crate::{apply_action, store_error, ApiContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Ready,
    /// Shown after a successful action until [`CounterPage::revert_status`].
    Updated(CounterAction),
    /// Stays until the next action.
    Error(String),
}

impl PageStatus {
    pub fn text(&self) -> String {
        match self {
            Self::Ready => "Ready".to_string(),
            Self::Updated(action) => action.success_message().to_string(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            Self::Ready => StatusTone::Neutral,
            Self::Updated(_) => StatusTone::Positive,
            Self::Error(_) => StatusTone::Negative,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CounterPage {
    counter_name: String,
    display_value: i64,
    status: PageStatus,
}

impl CounterPage {
    /// Fetches (or creates) the context's counter and starts in `Ready`.
    pub async fn load(ctx: &ApiContext) -> Result<Self, ApiError> {
        let counter = ctx
            .store
            .get_or_create(&ctx.counter_name)
            .await
            .map_err(store_error)?;
        info!(counter = %counter.name, value = counter.value, "counter page loaded");
        Ok(Self {
            counter_name: counter.name,
            display_value: counter.value,
            status: PageStatus::Ready,
        })
    }

    /// Picks up a page that is already showing `displayed`.
    pub fn resume(counter_name: impl Into<String>, displayed: i64) -> Self {
        Self {
            counter_name: counter_name.into(),
            display_value: displayed,
            status: PageStatus::Ready,
        }
    }

    /// Runs one button press against the store. The display only changes
    /// when the store call succeeds.
    pub async fn apply(&mut self, ctx: &ApiContext, action: CounterAction) -> &PageStatus {
        self.status = match apply_action(ctx, &self.counter_name, action).await {
            Ok(counter) => {
                self.display_value = counter.value;
                PageStatus::Updated(action)
            }
            Err(err) => PageStatus::Error(err.message),
        };
        &self.status
    }

    /// Timer expiry: a success message goes back to `Ready`, errors stay.
    pub fn revert_status(&mut self) {
        if matches!(self.status, PageStatus::Updated(_)) {
            self.status = PageStatus::Ready;
        }
    }

    pub fn counter_name(&self) -> &str {
        &self.counter_name
    }

    pub fn display_value(&self) -> i64 {
        self.display_value
    }

    pub fn status(&self) -> &PageStatus {
        &self.status
    }

    pub fn view(&self, revert_after: Duration) -> PageView {
        let revert_after_ms = match self.status {
            PageStatus::Updated(_) => {
                Some(u64::try_from(revert_after.as_millis()).unwrap_or(u64::MAX))
            }
            PageStatus::Ready | PageStatus::Error(_) => None,
        };
        PageView {
            counter_name: self.counter_name.clone(),
            value: self.display_value,
            status: self.status.text(),
            tone: self.status.tone(),
            revert_after_ms,
        }
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
