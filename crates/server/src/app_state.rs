use std::time::Duration;

use server_api::ApiContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    /// How long a success message stays before the page shows "Ready" again.
    pub(crate) status_revert: Duration,
}
