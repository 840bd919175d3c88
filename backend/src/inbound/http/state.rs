//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` so they depend only on the
//! processor and the notification port, never on a concrete store.

use std::sync::Arc;

use crate::domain::OverdueNotificationProcessor;
use crate::domain::ports::NotificationRepository;

/// Dependency bundle for notification handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Processor shared with the scheduler; passes are serialised inside it.
    pub processor: Arc<OverdueNotificationProcessor>,
    /// Read access to notification records.
    pub notifications: Arc<dyn NotificationRepository>,
}

impl HttpState {
    /// Bundle the handler dependencies.
    pub fn new(
        processor: Arc<OverdueNotificationProcessor>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            processor,
            notifications,
        }
    }
}
