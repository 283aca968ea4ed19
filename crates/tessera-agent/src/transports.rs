// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use tessera_core::{ServiceKind, Transport};

/// Per-service transport handles.
///
/// Each service runs on its own bot identity, so a customer is only ever
/// reachable through the bot their chat belongs to. Workers and log
/// providers always talk to the primary (food) bot.
#[derive(Clone)]
pub struct TransportMap {
    primary: Arc<dyn Transport>,
    by_service: HashMap<ServiceKind, Arc<dyn Transport>>,
}

impl TransportMap {
    pub fn new(primary: Arc<dyn Transport>) -> Self {
        let mut by_service = HashMap::new();
        by_service.insert(ServiceKind::Food, primary.clone());
        Self {
            primary,
            by_service,
        }
    }

    /// All services through one transport. Handy for tests and single-bot
    /// deployments.
    pub fn single(transport: Arc<dyn Transport>) -> Self {
        let mut map = Self::new(transport.clone());
        map.register(ServiceKind::Flight, transport.clone());
        map.register(ServiceKind::Hotel, transport);
        map
    }

    pub fn register(&mut self, service: ServiceKind, transport: Arc<dyn Transport>) {
        self.by_service.insert(service, transport);
    }

    pub fn has(&self, service: ServiceKind) -> bool {
        self.by_service.contains_key(&service)
    }

    /// The bot operators interact with.
    pub fn primary(&self) -> &dyn Transport {
        self.primary.as_ref()
    }

    /// The service's own bot, falling back to the primary when the service
    /// is not configured.
    pub fn for_service(&self, service: ServiceKind) -> &dyn Transport {
        self.by_service
            .get(&service)
            .map(|t| t.as_ref())
            .unwrap_or_else(|| self.primary.as_ref())
    }
}
