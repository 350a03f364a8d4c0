use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use scenepoints::pagination::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use scenepoints::{Client, HistoryQuery, PaginationPolicy, Summary, collect_points};
use std::error::Error;

#[derive(Debug, Parser)]
#[command(
    name = "scenepoints",
    version,
    about = "Summarise earned Scene+ points by category"
)]
struct Cli {
    /// API bearer token; falls back to SCENE_API_TOKEN env var
    #[arg(long, env = "SCENE_API_TOKEN", hide_env_values = true)]
    token: String,

    /// First day of the report YYYY-MM-DD (default: January 1st of the end date's year)
    #[arg(long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// Last day of the report YYYY-MM-DD (default: today)
    #[arg(long, value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// How to decide that the last page was reached
    #[arg(long, value_enum, default_value = "count")]
    pagination: Pagination,

    /// Transactions requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Give up after this many pages
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Override the API host
    #[arg(long, env = "SCENE_API_BASE_URL")]
    base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pagination {
    /// Trust the item count reported by the server
    Count,
    /// Walk newest first until a page reaches past the start date
    Boundary,
}

impl From<Pagination> for PaginationPolicy {
    fn from(value: Pagination) -> Self {
        match value {
            Pagination::Count => PaginationPolicy::CountBased,
            Pagination::Boundary => PaginationPolicy::BoundaryScan,
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| e.to_string())
}

impl Cli {
    fn query(&self, today: NaiveDate) -> Result<HistoryQuery, Box<dyn Error>> {
        let end = self.end_date.unwrap_or(today);
        let start = match self.start_date {
            Some(start) => start,
            None => NaiveDate::from_ymd_opt(end.year(), 1, 1).ok_or("end date out of range")?,
        };
        let query = HistoryQuery::new(start, end)?
            .with_page_size(self.page_size)?
            .with_max_pages(self.max_pages)?
            .with_policy(self.pagination.into());
        Ok(query)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let query = cli.query(Local::now().date_naive())?;
    let mut client = Client::new(cli.token.as_str())?;
    if let Some(base_url) = cli.base_url.as_deref() {
        client = client.with_base_url(base_url)?;
    }

    let window = query.window();
    log::info!(
        "Summarising earned points from {} to {} ({} pagination)",
        window.from,
        window.to,
        query.policy()
    );
    let tally = collect_points(&client, &query).await?;
    println!("{}", Summary::from_tally(&tally));

    Ok(())
}
