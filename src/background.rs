use crate::{logi, logok, logw};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Queries tried after the hint and the title, in this order.
pub const GENERIC_QUERIES: [&str; 3] = [
    "abstract technology background",
    "minimal gradient",
    "office workflow b-roll",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundReference {
    pub source_url: String,
    /// Pixel width reported by the source; 0 when unknown.
    pub width_hint: u32,
}

impl BackgroundReference {
    pub fn curated(url: impl Into<String>) -> Self {
        Self {
            source_url: url.into(),
            width_hint: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub keywords: Vec<String>,
    pub urls: Vec<String>,
}

/// Keyword groups are matched in order; the candidates of every matching
/// group are concatenated and the first one wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedTable {
    pub groups: Vec<KeywordGroup>,
    pub default_url: String,
}

const LEAN_A: &str = "https://player.vimeo.com/external/357479265.sd.mp4?s=9a18c1a7b09f3f5c6e237ef55ff29ce7cbe9da9a&profile_id=164";
const LEAN_B: &str = "https://player.vimeo.com/external/214857965.sd.mp4?s=3b7627a6d4a485a4f33a61f54e63a60b9d2e6cda&profile_id=164";
const PROCESS_A: &str = "https://player.vimeo.com/external/357478777.sd.mp4?s=4f4c3ee6c52777c3339f6f1a6fcba6d8b49e6c38&profile_id=164";
const AI_A: &str = "https://player.vimeo.com/external/331695260.sd.mp4?s=6f1b8a8b3022c1b3b3c9f94d0d8de7b4d8b3b3a0&profile_id=164";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CuratedTable {
    fn default() -> Self {
        Self {
            groups: vec![
                KeywordGroup {
                    keywords: strings(&["lean", "six sigma", "kaizen", "dmaic", "process"]),
                    urls: strings(&[LEAN_A, LEAN_B, PROCESS_A]),
                },
                KeywordGroup {
                    keywords: strings(&["ai", "analytics", "data", "automation", "mining"]),
                    urls: strings(&[AI_A]),
                },
            ],
            default_url: LEAN_A.to_string(),
        }
    }
}

impl CuratedTable {
    /// Substring match against an already lowercased query.
    pub fn candidates(&self, query: &str) -> Vec<&str> {
        let mut out = Vec::new();
        for group in &self.groups {
            if group.keywords.iter().any(|k| query.contains(k.as_str())) {
                out.extend(group.urls.iter().map(String::as_str));
            }
        }
        out
    }

    pub fn pick(&self, query: &str) -> BackgroundReference {
        let url = self
            .candidates(query)
            .into_iter()
            .find(|u| !u.trim().is_empty())
            .unwrap_or(self.default_url.as_str());
        BackgroundReference::curated(url)
    }
}

/// Stock-footage search. Transport and parse failures are reported as `None`.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str) -> Option<BackgroundReference>;
}

pub struct BackgroundSelector {
    table: CuratedTable,
    search: Option<Box<dyn VideoSearch>>,
}

impl BackgroundSelector {
    pub fn new(table: CuratedTable) -> Self {
        Self {
            table,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Box<dyn VideoSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn build_query(title: &str, body: &str, topic_hint: Option<&str>) -> String {
        [topic_hint.unwrap_or(""), title, body]
            .into_iter()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_lowercase()
    }

    pub async fn pick_background(
        &self,
        title: &str,
        body: &str,
        topic_hint: Option<&str>,
    ) -> BackgroundReference {
        if let Some(search) = &self.search {
            let queries = [topic_hint.unwrap_or(""), title]
                .into_iter()
                .chain(GENERIC_QUERIES)
                .map(str::trim)
                .filter(|q| !q.is_empty());

            for query in queries {
                if let Some(found) = search.search(query).await {
                    logok(format!(
                        "Background from search \"{}\" ({}px): {}",
                        query, found.width_hint, found.source_url
                    ));
                    return found;
                }
                logi(format!("No search result for \"{}\"", query));
            }
            logw("Video search produced nothing; using curated backgrounds.");
        }

        let query = Self::build_query(title, body, topic_hint);
        let picked = self.table.pick(&query);
        logi(format!("Curated background: {}", picked.source_url));
        picked
    }
}
