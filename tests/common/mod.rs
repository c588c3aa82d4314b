//! In-process API double shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use seforim_ingest::adapters::encode_title;
use seforim_ingest::{Fetcher, IngestError};

/// Serves canned bodies by path and tracks request concurrency
#[derive(Default)]
pub struct MockFetcher {
    routes: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(2),
            ..Default::default()
        }
    }

    pub fn route(&mut self, path: impl Into<String>, body: Value) -> &mut Self {
        self.routes.insert(path.into(), body.to_string());
        self
    }

    pub fn remove(&mut self, path: &str) {
        self.routes.remove(path);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Routes for a simple book: shape, schema and one text per verse
    pub fn book(&mut self, title: &str, chapters: &[u32], schema: Value) -> &mut Self {
        let encoded = encode_title(title);
        let talmud = schema["schema"]["addressTypes"]
            .as_array()
            .is_some_and(|types| types.iter().any(|t| t == "Talmud"));
        let offsetting = schema["schema"].get("index_offsets_by_depth").is_some();

        self.route(
            format!("/shape/{}", encoded),
            json!([{
                "section": "Test",
                "title": title,
                "heTitle": format!("{} (he)", title),
                "book": title,
                "chapters": chapters,
            }]),
        );
        self.route(format!("/v2/raw/index/{}", encoded), schema);

        let mut offset = 0;
        for (index, &count) in chapters.iter().enumerate() {
            let label = seforim_ingest::core::daf::chapter_label(index as u32, talmud);
            for verse in 1..=count {
                let number = if offsetting { verse + offset } else { verse };
                self.route(
                    format!("/v3/texts/{}%20{}.{}", encoded, label, number),
                    json!({"versions": [{"text": verse_text(title, index as u32 + 1, number)}]}),
                );
            }
            offset += count;
        }
        self
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, path: &str) -> Result<String, IngestError> {
        self.requests.lock().unwrap().push(path.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.routes
            .get(path)
            .cloned()
            .ok_or_else(|| IngestError::Network {
                path: path.to_string(),
                message: "404 Not Found".to_string(),
            })
    }
}

pub fn verse_text(title: &str, chapter: u32, number: u32) -> String {
    format!("{} {}:{}", title, chapter, number)
}

pub fn plain_schema() -> Value {
    json!({
        "schema": {"addressTypes": ["Integer", "Integer"], "sectionNames": ["Chapter", "Verse"]},
        "categories": ["Test"]
    })
}

pub fn offset_schema() -> Value {
    json!({
        "schema": {
            "addressTypes": ["Integer", "Integer"],
            "sectionNames": ["Chapter", "Verse"],
            "index_offsets_by_depth": {"1": [0, 10, 15]}
        }
    })
}

pub fn talmud_schema() -> Value {
    json!({
        "schema": {"addressTypes": ["Talmud", "Integer"], "sectionNames": ["Daf", "Line"]},
        "categories": ["Talmud", "Bavli"]
    })
}
