//! Elasticsearch bulk-indexing sink.
//!
//! Documents are written through the `_bulk` NDJSON API into one index per
//! UTC day (`<prefix>-YYYY.MM.DD`). Construction pings the cluster and
//! installs an index template; either failing is fatal, so a misconfigured
//! backend is caught at startup rather than at the first batch.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use report::CspReport;

use crate::error::StorageError;
use crate::Storage;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Elasticsearch sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster node base URLs, used round-robin.
    pub addresses: Vec<String>,
    pub username: String,
    pub password: String,
    /// Daily indices are named `<index_prefix>-YYYY.MM.DD`.
    pub index_prefix: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["http://localhost:9200".to_string()],
            username: String::new(),
            password: String::new(),
            index_prefix: "csp-reports".to_string(),
        }
    }
}

/// Bulk-indexing sink backed by an Elasticsearch cluster.
pub struct ElasticsearchStorage {
    client: Client,
    config: ElasticsearchConfig,
    cursor: AtomicUsize,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
}

impl ElasticsearchStorage {
    /// Connect to the cluster and install the index template.
    ///
    /// # Errors
    ///
    /// Fails when no address is configured, the cluster does not answer the
    /// info request, or the template cannot be installed. All of these are
    /// startup-fatal for the service.
    pub async fn connect(config: ElasticsearchConfig) -> Result<Self, StorageError> {
        if config.addresses.is_empty() {
            return Err(StorageError::Config(
                "at least one elasticsearch address is required".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let storage = Self {
            client,
            config,
            cursor: AtomicUsize::new(0),
        };

        storage.ping().await?;
        storage.ensure_index_template().await?;

        info!(
            addresses = ?storage.config.addresses,
            index_prefix = %storage.config.index_prefix,
            "elasticsearch storage ready"
        );
        Ok(storage)
    }

    /// Next base URL, rotating across configured nodes.
    fn next_address(&self) -> String {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.config.addresses[index % self.config.addresses.len()]
            .trim_end_matches('/')
            .to_string()
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if !self.config.username.is_empty() {
            builder = builder.basic_auth(&self.config.username, Some(&self.config.password));
        }
        builder
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let url = format!("{}/", self.next_address());
        let response = self.request(Method::GET, &url).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Unavailable(format!(
                "cluster info returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn ensure_index_template(&self) -> Result<(), StorageError> {
        let url = format!(
            "{}/_index_template/{}-template",
            self.next_address(),
            self.config.index_prefix
        );
        let template = index_template(&self.config.index_prefix);
        let response = self
            .request(Method::PUT, &url)
            .json(&template)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StorageError::Template(format!(
                "template install returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn index_name(&self, timestamp: &DateTime<Utc>) -> String {
        format!("{}-{}", self.config.index_prefix, timestamp.format("%Y.%m.%d"))
    }

    /// Render a batch as an NDJSON `_bulk` body: one action metadata line and
    /// one document line per report.
    fn bulk_body(&self, reports: &[CspReport]) -> Result<String, StorageError> {
        let mut body = String::new();
        for report in reports {
            let action = json!({
                "index": {
                    "_index": self.index_name(&report.timestamp),
                    "_id": report.id,
                }
            });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(report)?);
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl Storage for ElasticsearchStorage {
    async fn store_batch(&self, reports: &[CspReport]) -> Result<(), StorageError> {
        if reports.is_empty() {
            return Ok(());
        }

        let body = self.bulk_body(reports)?;
        let url = format!("{}/_bulk", self.next_address());
        let response = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::UnexpectedStatus(status.as_u16()));
        }

        // Partial per-item failure counts as failure of the whole batch.
        let summary: BulkResponse = response.json().await?;
        if summary.errors {
            return Err(StorageError::BulkRejected);
        }

        debug!(batch_size = reports.len(), "bulk indexed report batch");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Index template fixing the field kinds of the canonical record: exact-match
/// fields as `keyword`, free text as `text`, counters as `integer`, plus the
/// `ip` and `date` specials.
fn index_template(prefix: &str) -> serde_json::Value {
    json!({
        "index_patterns": [format!("{prefix}-*")],
        "template": {
            "settings": {
                "number_of_shards": 1,
                "number_of_replicas": 0,
                "refresh_interval": "30s",
            },
            "mappings": {
                "properties": {
                    "id": { "type": "keyword" },
                    "timestamp": { "type": "date" },
                    "user_agent": {
                        "type": "text",
                        "fields": { "keyword": { "type": "keyword" } },
                    },
                    "remote_addr": { "type": "ip" },
                    "browser_type": { "type": "keyword" },
                    "parsed": {
                        "properties": {
                            "document_uri": { "type": "keyword" },
                            "referrer": { "type": "keyword" },
                            "violated_directive": { "type": "keyword" },
                            "effective_directive": { "type": "keyword" },
                            "original_policy": { "type": "text" },
                            "blocked_uri": { "type": "keyword" },
                            "status_code": { "type": "integer" },
                            "script_sample": { "type": "text" },
                            "line_number": { "type": "integer" },
                            "column_number": { "type": "integer" },
                            "source_file": { "type": "keyword" },
                            "disposition": { "type": "keyword" },
                        },
                    },
                    "human_readable": { "type": "text" },
                    "processing_errors": { "type": "keyword" },
                },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use report::{BrowserType, ParsedViolation};

    fn storage() -> ElasticsearchStorage {
        ElasticsearchStorage {
            client: Client::new(),
            config: ElasticsearchConfig::default(),
            cursor: AtomicUsize::new(0),
        }
    }

    fn sample_report(id: &str, timestamp: DateTime<Utc>) -> CspReport {
        CspReport {
            id: id.to_string(),
            timestamp,
            user_agent: "test".to_string(),
            remote_addr: "203.0.113.7".to_string(),
            browser_type: BrowserType::Chrome,
            parsed: ParsedViolation {
                document_uri: "https://ex.com/".to_string(),
                violated_directive: "script-src".to_string(),
                blocked_uri: "inline".to_string(),
                ..Default::default()
            },
            raw: serde_json::json!({}),
            human_readable: "Violated directive: script-src".to_string(),
            processing_errors: Vec::new(),
        }
    }

    #[test]
    fn index_name_follows_utc_day() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(storage().index_name(&timestamp), "csp-reports-2025.03.09");
    }

    #[test]
    fn bulk_body_interleaves_actions_and_documents() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        let reports = vec![
            sample_report("1", timestamp),
            sample_report("2", timestamp),
        ];

        let body = storage().bulk_body(&reports).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));

        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "csp-reports-2025.03.09");
        assert_eq!(action["index"]["_id"], "1");

        let document: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(document["browser_type"], "chrome");
        assert_eq!(document["parsed"]["blocked_uri"], "inline");
        assert!(document.get("processing_errors").is_none());
    }

    #[test]
    fn addresses_rotate_round_robin() {
        let storage = ElasticsearchStorage {
            client: Client::new(),
            config: ElasticsearchConfig {
                addresses: vec![
                    "http://es-a:9200/".to_string(),
                    "http://es-b:9200".to_string(),
                ],
                ..Default::default()
            },
            cursor: AtomicUsize::new(0),
        };

        assert_eq!(storage.next_address(), "http://es-a:9200");
        assert_eq!(storage.next_address(), "http://es-b:9200");
        assert_eq!(storage.next_address(), "http://es-a:9200");
    }

    #[test]
    fn template_covers_canonical_field_kinds() {
        let template = index_template("csp-reports");
        let properties = &template["template"]["mappings"]["properties"];
        assert_eq!(properties["remote_addr"]["type"], "ip");
        assert_eq!(properties["timestamp"]["type"], "date");
        assert_eq!(properties["parsed"]["properties"]["blocked_uri"]["type"], "keyword");
        assert_eq!(properties["parsed"]["properties"]["line_number"]["type"], "integer");
        assert_eq!(properties["human_readable"]["type"], "text");
        assert_eq!(template["index_patterns"][0], "csp-reports-*");
    }
}
