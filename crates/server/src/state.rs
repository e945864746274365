//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::{
    DashboardService, IdentityProvider, LifecycleService, MessagingService, ProfileService,
};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services are built on demand and borrow the
/// store for the duration of one request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// The hosted (or local) identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn lifecycle(&self) -> LifecycleService<'_> {
        LifecycleService::new(self.store())
    }

    #[must_use]
    pub fn messaging(&self) -> MessagingService<'_> {
        MessagingService::new(self.store())
    }

    #[must_use]
    pub fn dashboards(&self) -> DashboardService<'_> {
        DashboardService::new(self.store())
    }

    #[must_use]
    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self.store())
    }
}
