//! Steam community group member discovery.
//!
//! Walks the member list pages of a group, or a random sample of them for
//! groups too large to walk, and turns each member link into a steamID64.
//! Vanity links (`/id/<name>`) are resolved through the profile's XML view.
//! Resolved ids feed the collector's id file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::fetch::PageFetcher;
use crate::storage::{append_line, StorageError};

/// Errors that abort a scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid scrape settings: {0}")]
    Config(#[from] ConfigError),
}

fn member_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("div.member_block_content a").expect("valid member selector"))
}

fn profile_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/profiles/(\d+)").expect("valid profile regex"))
}

fn xml_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<steamID64>\s*(\d+)\s*</steamID64>").expect("valid steamID64 regex")
    })
}

/// Exactly 17 ASCII digits.
pub fn is_steam_id64(value: &str) -> bool {
    value.len() == 17 && value.bytes().all(|b| b.is_ascii_digit())
}

/// URL of one member list page.
pub fn members_page_url(group_url: &str, page: u32) -> String {
    format!("{}/members?p={}", group_url.trim_end_matches('/'), page)
}

/// XML view of a profile link.
pub fn xml_profile_url(href: &str) -> String {
    if href.ends_with("/?xml=1") {
        href.to_string()
    } else {
        format!("{}/?xml=1", href.trim_end_matches('/'))
    }
}

/// Member profile links on a members page, de-duplicated in page order.
pub fn member_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for href in document
        .select(member_link_selector())
        .filter_map(|el| el.value().attr("href"))
    {
        if !links.iter().any(|l| l == href) {
            links.push(href.to_string());
        }
    }

    links
}

/// steamID64 embedded in a `/profiles/<digits>` link.
pub fn steam_id_from_href(href: &str) -> Option<String> {
    profile_id_pattern()
        .captures(href)
        .map(|caps| caps[1].to_string())
        .filter(|id| is_steam_id64(id))
}

/// `<steamID64>` of a profile XML document.
pub fn steam_id_from_xml(xml: &str) -> Option<String> {
    xml_id_pattern()
        .captures(xml)
        .map(|caps| caps[1].to_string())
        .filter(|id| is_steam_id64(id))
}

/// `count` distinct pages drawn from `start..=end`, in ascending order.
pub fn sample_pages<R: Rng + ?Sized>(
    start: u32,
    end: u32,
    count: usize,
    rng: &mut R,
) -> Result<Vec<u32>, ConfigError> {
    let span = if end < start {
        0
    } else {
        (end - start) as usize + 1
    };
    if count == 0 || count > span {
        return Err(ConfigError::ValidationError(format!(
            "Cannot sample {} distinct pages from {}..={}",
            count, start, end
        )));
    }

    let mut pages: Vec<u32> = index::sample(rng, span, count)
        .into_iter()
        .map(|offset| start + offset as u32)
        .collect();
    pages.sort_unstable();
    Ok(pages)
}

/// Inputs of a scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub group_url: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Visit this many random pages of the range instead of all of them
    pub sample: Option<usize>,
    pub page_delay: Duration,
    pub steam_ids_file: PathBuf,
    pub failsafe_file: PathBuf,
}

impl ScrapeOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            group_url: config.scrape.group_url.clone(),
            start_page: config.scrape.start_page,
            end_page: config.scrape.end_page,
            sample: config.scrape.sample_pages,
            page_delay: Duration::from_millis(config.scrape.page_delay_ms),
            steam_ids_file: config.scrape.steam_ids_file.clone(),
            failsafe_file: config.scrape.failsafe_file.clone(),
        }
    }
}

/// Result of a scrape run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    /// Member pages fetched
    pub pages: usize,
    /// Distinct links seen across all pages
    pub links: usize,
    pub resolved: usize,
    /// Links written to the failsafe file
    pub unresolved: usize,
}

/// Scrapes a group's member pages.
pub struct GroupScraper<F: PageFetcher> {
    fetcher: F,
    options: ScrapeOptions,
    rng: StdRng,
}

impl<F: PageFetcher> GroupScraper<F> {
    pub fn new(fetcher: F, options: ScrapeOptions) -> Self {
        Self {
            fetcher,
            options,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fix the page sample for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Pages to visit: the whole range, or a sorted random sample of it.
    pub fn pages(&mut self) -> Result<Vec<u32>, ScrapeError> {
        let (start, end) = (self.options.start_page, self.options.end_page);
        match self.options.sample {
            Some(count) => Ok(sample_pages(start, end, count, &mut self.rng)?),
            None => Ok((start..=end).collect()),
        }
    }

    /// Scrape the configured pages.
    pub async fn run(&mut self) -> Result<ScrapeReport, ScrapeError> {
        let pages = self.pages()?;
        let mut report = ScrapeReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        info!(
            "Scraping {} of {} pages {}..={}",
            pages.len(),
            self.options.group_url,
            self.options.start_page,
            self.options.end_page
        );
        debug!("Pages: {:?}", pages);

        for (position, &page) in pages.iter().enumerate() {
            let url = members_page_url(&self.options.group_url, page);
            let html = match self.fetcher.fetch_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    error!("Failed to fetch members page {}: {}", page, e);
                    continue;
                }
            };
            report.pages += 1;

            let links = member_links(&html);
            info!("Found {} profile links on page {}", links.len(), page);

            for (idx, href) in links.iter().enumerate() {
                if !seen.insert(href.clone()) {
                    debug!("Already processed {}, skipping", href);
                    continue;
                }
                debug!("Processing link {}/{}: {}", idx + 1, links.len(), href);
                report.links += 1;
                match self.resolve(href).await {
                    Some(id) => {
                        append_line(&self.options.steam_ids_file, &id)?;
                        report.resolved += 1;
                    }
                    None => {
                        warn!("No steamID64 for {}, writing to failsafe", href);
                        append_line(&self.options.failsafe_file, href)?;
                        report.unresolved += 1;
                    }
                }
            }

            if position + 1 < pages.len() && !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        }

        info!(
            "Scrape complete: {} pages, {} resolved, {} unresolved",
            report.pages, report.resolved, report.unresolved
        );
        Ok(report)
    }

    /// steamID64 for a member link, from the link itself or the XML profile.
    async fn resolve(&self, href: &str) -> Option<String> {
        if let Some(id) = steam_id_from_href(href) {
            return Some(id);
        }

        match self.fetcher.fetch_text(&xml_profile_url(href)).await {
            Ok(xml) => steam_id_from_xml(&xml),
            Err(e) => {
                warn!("Failed to fetch XML profile for {}: {}", href, e);
                None
            }
        }
    }
}
