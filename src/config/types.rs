use serde::Deserialize;

/// Main configuration structure for Folio-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Search listing URL; pages are addressed by appending `page=N`
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Number of listing pages to seed
    #[serde(default = "default_pages")]
    pub pages: u32,

    /// Listing pages before this offset are skipped (seeding starts at offset + 1)
    #[serde(rename = "page-offset", default)]
    pub page_offset: u32,

    /// Lower bound of the randomized pause between requests (milliseconds, inclusive)
    #[serde(rename = "min-delay-ms", default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized pause between requests (milliseconds, exclusive)
    #[serde(rename = "max-delay-ms", default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Per-request timeout applied by the HTTP client (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_pages() -> u32 {
    1
}

fn default_min_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    5000
}

fn default_timeout() -> u64 {
    5
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
