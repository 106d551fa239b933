//! Shared test helpers

use geometa::origin::AsyncHttpClient;
use geometa::MetaError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Mock HTTP client with canned responses per URL.
///
/// Unknown URLs answer with an empty JSON array. Every request is recorded.
/// A gated client holds each request until a permit is released.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    responses: Arc<Mutex<HashMap<String, Result<Vec<u8>, String>>>>,
    requests: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Semaphore>>,
}

#[allow(dead_code)]
impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn respond(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(reason.to_string()));
    }

    /// Let `n` held requests complete
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl AsyncHttpClient for ScriptedClient {
    async fn get(&self, url: &str) -> geometa::Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| MetaError::Http(e.to_string()))?
                .forget();
        }

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(Ok(body)) => Ok(body),
            Some(Err(reason)) => Err(MetaError::Http(reason)),
            None => Ok(b"[]".to_vec()),
        }
    }
}

/// Give spawned fetch tasks a chance to run on a current-thread runtime
pub async fn settle_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
