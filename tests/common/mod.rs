#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dora_mcp::errors::{DoraError, Result};
use dora_mcp::mcp::McpServer;
use dora_mcp::repository::{PublicationRepository, SearchResult};
use serde_json::Value;

/// What the fake repository does when called.
pub enum Behavior {
    Records(Vec<Value>),
    Unavailable,
    Status(u16, &'static str),
}

/// In-process repository that counts calls and records their arguments.
pub struct FakeRepository {
    behavior: Behavior,
    slow_term: Option<(String, Duration)>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRepository {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self::build(behavior, None))
    }

    /// Delays every search for `term` by `delay`.
    pub fn with_slow_term(behavior: Behavior, term: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(behavior, Some((term.to_string(), delay))))
    }

    fn build(behavior: Behavior, slow_term: Option<(String, Duration)>) -> Self {
        Self {
            behavior,
            slow_term,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Vec<String>)> {
        self.seen.lock().unwrap().clone()
    }

    async fn respond(&self, key: &str, filters: &[String]) -> Result<SearchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((key.to_string(), filters.to_vec()));

        if let Some((term, delay)) = &self.slow_term {
            if term == key {
                tokio::time::sleep(*delay).await;
            }
        }

        match &self.behavior {
            Behavior::Records(records) => Ok(records.clone()),
            Behavior::Unavailable => Err(DoraError::UpstreamUnavailable {
                message: "request timed out after 30s".to_string(),
            }),
            Behavior::Status(status, body) => Err(DoraError::upstream_status(*status, body)),
        }
    }
}

#[async_trait]
impl PublicationRepository for FakeRepository {
    async fn search(&self, term: &str) -> Result<SearchResult> {
        self.respond(term, &[]).await
    }

    async fn search_by_filter(&self, query: &str, filters: &[String]) -> Result<SearchResult> {
        self.respond(query, filters).await
    }
}

pub fn server_with(repo: &Arc<FakeRepository>) -> McpServer {
    McpServer::new(repo.clone())
}

pub fn three_records() -> Vec<Value> {
    vec![
        serde_json::json!({"pid": "empa:1001", "citation": "Heuberger, M. (2019) Friction."}),
        serde_json::json!({"pid": "empa:1002", "citation": "Heuberger, M. (2020) Surfaces."}),
        serde_json::json!({"pid": "empa:1003", "citation": "Heuberger, M. (2021) Polymers."}),
    ]
}
