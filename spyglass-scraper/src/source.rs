//! Listing sites and the page-by-page scrape loop.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use spyglass_db::{Database, NewServer, ServerKind};
use thiserror::Error;
use tracing::{debug, info};

use crate::extract::{self, ServerRow};
use crate::helpers::now;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("markup error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("store error: {0}")]
    Db(#[from] spyglass_db::DbError),
}

/// One third-party server listing site.
pub struct ListingSource {
    /// URL template with a `{page}` placeholder
    pub url_template: &'static str,
    /// Provenance base, joined with each row's detail link
    pub base_url: &'static str,
    /// Kind every server on this site advertises
    pub kind: ServerKind,
}

pub const MINECRAFT_SERVERS_ORG: ListingSource = ListingSource {
    url_template: "https://minecraftservers.org/index/{page}",
    base_url: "https://minecraftservers.org",
    kind: ServerKind::Java,
};

impl ListingSource {
    pub fn page_url(&self, page: u32) -> String {
        self.url_template.replace("{page}", &page.to_string())
    }

    fn to_server(&self, row: ServerRow) -> NewServer {
        NewServer {
            address: row.address,
            name: Some(row.name),
            kind: self.kind.as_str().to_string(),
            source: format!("{}{}", self.base_url, row.href),
        }
    }
}

/// Walk a listing site page by page, upserting every row and committing
/// once per page. Returns the number of rows seen.
///
/// Already-committed pages survive an interrupt; the page being fetched
/// does not.
pub async fn scrape_source(
    db: &Database,
    source: &ListingSource,
    verbose: bool,
) -> Result<usize, ScrapeError> {
    let client = http_client()?;

    let mut html = fetch_page(&client, source, 1).await?;
    let max_pages = extract::max_page(&html).unwrap_or(1);
    info!(max_pages, source = source.base_url, "starting scrape");

    let mut page = 1;
    let mut total = 0;
    loop {
        let rows = extract::extract_rows(&html)?;
        let servers: Vec<NewServer> = rows
            .into_iter()
            .map(|row| source.to_server(row))
            .collect();

        if verbose {
            for server in &servers {
                info!(address = %server.address, name = ?server.name, "scraped server");
            }
        }

        total += db.upsert_servers(servers, now()).await?;
        info!("page {page}/{max_pages} committed");

        if page >= max_pages {
            break;
        }
        page += 1;
        html = fetch_page(&client, source, page).await?;
    }

    info!(total, "scrape complete");
    Ok(total)
}

fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    // Listing sites answer plain browser traffic, not obvious bots
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/103.0.5060.114 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));

    reqwest::Client::builder().default_headers(headers).build()
}

async fn fetch_page(
    client: &reqwest::Client,
    source: &ListingSource,
    page: u32,
) -> Result<String, ScrapeError> {
    let url = source.page_url(page);
    debug!(%url, "fetching page");
    let html = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(html)
}
