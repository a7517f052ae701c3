use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::{ChatApi, ClientFactory};

/// Token→client cache so repeated deliveries into the same workspace reuse
/// one Web API client.
///
/// No eviction: tokens are few relative to process lifetime. A rotated
/// token keys a fresh entry; the stale one just goes unused. Owned by the
/// service instance, never a process-wide singleton, so parallel service
/// instances (and tests) do not share state.
pub struct ClientPool {
    factory: Arc<dyn ClientFactory>,
    clients: Mutex<HashMap<String, Arc<dyn ChatApi>>>,
}

impl ClientPool {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory, clients: Mutex::new(HashMap::new()) }
    }

    /// Returns the pooled client for `token`, constructing it on first use.
    pub fn get_or_create(&self, token: &str) -> Arc<dyn ChatApi> {
        let mut clients = self.clients.lock().expect("client pool poisoned");
        if let Some(existing) = clients.get(token) {
            return Arc::clone(existing);
        }

        let client = self.factory.build(token);
        clients.insert(token.to_owned(), Arc::clone(&client));
        client
    }

    pub fn len(&self) -> usize {
        self.clients.lock().expect("client pool poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
