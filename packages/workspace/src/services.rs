//! Host services the workspace exposes to code actions.
//!
//! Hosts plug in their own notification surface and navigation handler. The
//! defaults log through `tracing` and accept every navigation request.

use crate::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
}

/// A user-facing message raised by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub title: String,
    pub severity: NotificationSeverity,
}

pub trait NotificationService: Send + Sync {
    fn send_notification(&self, message: &str, title: &str, severity: NotificationSeverity);
}

pub trait NavigationService: Send + Sync {
    /// Move the user's caret to `position` in `document_id`.
    fn try_navigate(&self, document_id: DocumentId, position: usize) -> bool;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LoggingNotificationService;

impl NotificationService for LoggingNotificationService {
    fn send_notification(&self, message: &str, title: &str, severity: NotificationSeverity) {
        match severity {
            NotificationSeverity::Info => info!(%title, "{message}"),
            NotificationSeverity::Warning => warn!(%title, "{message}"),
            NotificationSeverity::Error => error!(%title, "{message}"),
        }
    }
}

/// Keeps every notification so hosts can drain them later
#[derive(Debug, Default)]
pub struct RecordingNotificationService {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(
            &mut *self
                .notifications
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl NotificationService for RecordingNotificationService {
    fn send_notification(&self, message: &str, title: &str, severity: NotificationSeverity) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                message: message.to_string(),
                title: title.to_string(),
                severity,
            });
    }
}

#[derive(Debug, Default)]
pub struct AcceptingNavigationService;

impl NavigationService for AcceptingNavigationService {
    fn try_navigate(&self, _document_id: DocumentId, _position: usize) -> bool {
        true
    }
}

/// Services registered with a workspace
#[derive(Clone)]
pub struct HostServices {
    pub notifications: Arc<dyn NotificationService>,
    pub navigation: Arc<dyn NavigationService>,
}

impl HostServices {
    pub fn new(
        notifications: Arc<dyn NotificationService>,
        navigation: Arc<dyn NavigationService>,
    ) -> Self {
        Self {
            notifications,
            navigation,
        }
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationService>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_navigation(mut self, navigation: Arc<dyn NavigationService>) -> Self {
        self.navigation = navigation;
        self
    }
}

impl Default for HostServices {
    fn default() -> Self {
        Self::new(
            Arc::new(LoggingNotificationService),
            Arc::new(AcceptingNavigationService),
        )
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
