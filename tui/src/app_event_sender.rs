use tokio::sync::mpsc::UnboundedSender;

use crate::app_event::AppEvent;

/// Cloneable handle used by widgets and background tasks to report back to the event loop.
#[derive(Clone, Debug)]
pub struct AppEventSender {
    app_event_tx: UnboundedSender<AppEvent>,
}

impl AppEventSender {
    pub fn new(app_event_tx: UnboundedSender<AppEvent>) -> Self {
        Self { app_event_tx }
    }

    /// Send an event to the app event channel. If the receiver is gone (the loop already exited),
    /// the event is dropped after logging.
    pub fn send(&self, event: AppEvent) {
        if let Err(err) = self.app_event_tx.send(event) {
            tracing::debug!("dropping app event after event loop exit: {err}");
        }
    }
}
