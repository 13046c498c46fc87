//! Environment-driven service configuration.
//!
//! Every knob is optional and has a default, so a bare `csp-ingest` starts
//! against a local Elasticsearch. Values come from flat environment
//! variables (`SERVER_PORT`, `RATE_LIMIT`, `ELASTICSEARCH_ADDRESSES`, ...).
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use pipeline::PipelineConfig;
use storage::ElasticsearchConfig;

/// Full service configuration, one field per environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Production mode switches the log formatter to JSON.
    #[serde(default)]
    pub production: bool,

    #[serde(default = "default_read_timeout")]
    pub server_read_timeout: u64,

    #[serde(default = "default_write_timeout")]
    pub server_write_timeout: u64,

    #[serde(default = "default_idle_timeout")]
    pub server_idle_timeout: u64,

    /// Token bucket refill rate, requests per second.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Token bucket capacity.
    #[serde(default = "default_rate_burst")]
    pub rate_burst: u32,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Seconds between forced partial-batch flushes.
    #[serde(default = "default_flush_interval")]
    pub flush_interval: u64,

    /// Comma-separated Elasticsearch node URLs.
    #[serde(default = "default_elasticsearch_addresses")]
    pub elasticsearch_addresses: String,

    #[serde(default)]
    pub elasticsearch_username: String,

    #[serde(default)]
    pub elasticsearch_password: String,

    #[serde(default = "default_index_prefix")]
    pub elasticsearch_index_prefix: String,

    /// Numeric log level, 0 (panic) through 6 (trace); out-of-range values
    /// fall back to info.
    #[serde(default = "default_log_level")]
    pub log_level: u8,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server_port: default_server_port(),
            production: false,
            server_read_timeout: default_read_timeout(),
            server_write_timeout: default_write_timeout(),
            server_idle_timeout: default_idle_timeout(),
            rate_limit: default_rate_limit(),
            rate_burst: default_rate_burst(),
            worker_count: default_worker_count(),
            batch_size: default_batch_size(),
            queue_size: default_queue_size(),
            flush_interval: default_flush_interval(),
            elasticsearch_addresses: default_elasticsearch_addresses(),
            elasticsearch_username: String::new(),
            elasticsearch_password: String::new(),
            elasticsearch_index_prefix: default_index_prefix(),
            log_level: default_log_level(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true));

        let service_config: ServiceConfig = builder.build()?.try_deserialize()?;
        service_config.pipeline().validate()?;
        Ok(service_config)
    }

    /// Address the HTTP listener binds to.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("0.0.0.0:{}", self.server_port).parse()?)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            worker_count: self.worker_count,
            batch_size: self.batch_size,
            queue_size: self.queue_size,
            flush_interval: Duration::from_secs(self.flush_interval),
        }
    }

    pub fn elasticsearch(&self) -> ElasticsearchConfig {
        ElasticsearchConfig {
            addresses: self
                .elasticsearch_addresses
                .split(',')
                .map(|address| address.trim().to_string())
                .filter(|address| !address.is_empty())
                .collect(),
            username: self.elasticsearch_username.clone(),
            password: self.elasticsearch_password.clone(),
            index_prefix: self.elasticsearch_index_prefix.clone(),
        }
    }

    /// Map the numeric log level onto a tracing filter directive.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level {
            0 | 1 | 2 => "error",
            3 => "warn",
            5 => "debug",
            6 => "trace",
            _ => "info",
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.server_read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.server_write_timeout)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.server_idle_timeout)
    }
}

fn default_server_port() -> u16 {
    8080
}

fn default_read_timeout() -> u64 {
    30
}

fn default_write_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_rate_limit() -> u32 {
    10_000
}

fn default_rate_burst() -> u32 {
    20_000
}

fn default_worker_count() -> usize {
    10
}

fn default_batch_size() -> usize {
    100
}

fn default_queue_size() -> usize {
    10_000
}

fn default_flush_interval() -> u64 {
    5
}

fn default_elasticsearch_addresses() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_prefix() -> String {
    "csp-reports".to_string()
}

fn default_log_level() -> u8 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let service_config = ServiceConfig::default();
        assert_eq!(service_config.server_port, 8080);
        assert!(!service_config.production);
        assert_eq!(service_config.rate_limit, 10_000);
        assert_eq!(service_config.rate_burst, 20_000);
        assert_eq!(service_config.worker_count, 10);
        assert_eq!(service_config.batch_size, 100);
        assert_eq!(service_config.queue_size, 10_000);
        assert_eq!(service_config.flush_interval, 5);
        assert_eq!(service_config.elasticsearch_index_prefix, "csp-reports");
        assert_eq!(service_config.log_level, 4);
    }

    #[test]
    fn socket_addr_uses_configured_port() {
        let service_config = ServiceConfig {
            server_port: 9999,
            ..Default::default()
        };
        assert_eq!(service_config.socket_addr().unwrap().port(), 9999);
    }

    #[test]
    fn elasticsearch_addresses_are_comma_split() {
        let service_config = ServiceConfig {
            elasticsearch_addresses: "http://es-a:9200, http://es-b:9200 ,".to_string(),
            ..Default::default()
        };
        let elasticsearch = service_config.elasticsearch();
        assert_eq!(
            elasticsearch.addresses,
            vec!["http://es-a:9200".to_string(), "http://es-b:9200".to_string()]
        );
    }

    #[test]
    fn pipeline_config_carries_flush_interval_seconds() {
        let service_config = ServiceConfig {
            flush_interval: 7,
            ..Default::default()
        };
        assert_eq!(
            service_config.pipeline().flush_interval,
            Duration::from_secs(7)
        );
    }

    #[test]
    fn log_level_maps_onto_tracing_filters() {
        let cases = [
            (0, "error"),
            (2, "error"),
            (3, "warn"),
            (4, "info"),
            (5, "debug"),
            (6, "trace"),
            (42, "info"),
        ];
        for (level, expected) in cases {
            let service_config = ServiceConfig {
                log_level: level,
                ..Default::default()
            };
            assert_eq!(service_config.log_filter(), expected);
        }
    }
}
