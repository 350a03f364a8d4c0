//! Sequential page walking over the points history endpoint.
//!
//! Two stop rules are supported:
//! - count-based: the server reports `totalItemCount`, pages run until
//!   `ceil(totalItemCount / pageSize)` have been fetched
//! - boundary-scan: pages are requested newest first and the walk ends with
//!   the first page that reaches past the start of the date window

use crate::error::PointsError;
use crate::models::{Category, HistoryPage, PointType, PointsHistoryRequest, SortOrder};
use chrono::NaiveDate;
use log::{debug, warn};
use std::fmt;
use std::future::Future;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched in one run.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Anything that can answer a points history request with one page.
pub trait PageSource {
    fn fetch_page(
        &self,
        request: &PointsHistoryRequest,
    ) -> impl Future<Output = Result<HistoryPage, PointsError>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationPolicy {
    #[default]
    CountBased,
    BoundaryScan,
}

impl fmt::Display for PaginationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self {
            PaginationPolicy::CountBased => "count",
            PaginationPolicy::BoundaryScan => "boundary",
        };
        f.write_str(v)
    }
}

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    window: DateWindow,
    page_size: u32,
    policy: PaginationPolicy,
    max_pages: u32,
}

impl HistoryQuery {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, PointsError> {
        if from > to {
            return Err(PointsError::InvalidDateRange {
                start: from,
                end: to,
            });
        }
        Ok(Self {
            window: DateWindow { from, to },
            page_size: DEFAULT_PAGE_SIZE,
            policy: PaginationPolicy::default(),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, PointsError> {
        if page_size == 0 {
            return Err(PointsError::InvalidParameter(
                "page_size must be a positive integer",
            ));
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Result<Self, PointsError> {
        if max_pages == 0 {
            return Err(PointsError::InvalidParameter(
                "max_pages must be a positive integer",
            ));
        }
        self.max_pages = max_pages;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: PaginationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn policy(&self) -> PaginationPolicy {
        self.policy
    }

    /// Request body for the given 1-based page.
    pub fn request_for(&self, page: u32) -> PointsHistoryRequest {
        let DateWindow { from, to } = self.window;
        let (from_date, to_date, sort, limit) = match self.policy {
            PaginationPolicy::CountBased => (
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string(),
                SortOrder::Asc,
                Some(self.page_size),
            ),
            PaginationPolicy::BoundaryScan => (
                format!("{}T00:00:00Z", from.format("%Y-%m-%d")),
                format!("{}T23:59:59Z", to.format("%Y-%m-%d")),
                SortOrder::Desc,
                None,
            ),
        };
        PointsHistoryRequest {
            types: vec![PointType::Earn],
            categories: vec![Category::All],
            cards: vec!["ALL".to_string()],
            from_date,
            to_date,
            page,
            sort,
            limit,
        }
    }
}

/// Number of pages needed to hold `total_item_count` items.
pub fn total_pages(total_item_count: u64, page_size: u32) -> u64 {
    total_item_count.div_ceil(u64::from(page_size.max(1)))
}

/// Lazily walks the history one page at a time.
pub struct Paginator<'a, S> {
    source: &'a S,
    query: &'a HistoryQuery,
    next: u32,
    total_pages: Option<u64>,
    finished: bool,
}

impl<'a, S: PageSource> Paginator<'a, S> {
    pub fn new(source: &'a S, query: &'a HistoryQuery) -> Self {
        Self {
            source,
            query,
            next: 1,
            total_pages: None,
            finished: false,
        }
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.next - 1
    }

    /// Fetch the next page, or `None` once the stop rule has fired.
    ///
    /// A fetch error ends the walk; later calls return `None`.
    pub async fn next_page(&mut self) -> Result<Option<HistoryPage>, PointsError> {
        if self.finished {
            return Ok(None);
        }
        if let Some(total) = self.total_pages
            && u64::from(self.next) > total
        {
            debug!("All {} pages fetched", total);
            self.finished = true;
            return Ok(None);
        }
        if self.next > self.query.max_pages {
            warn!(
                "Stopping after {} pages, the history did not end",
                self.query.max_pages
            );
            self.finished = true;
            return Ok(None);
        }

        let request = self.query.request_for(self.next);
        debug!(
            "Requesting page {} ({} policy)",
            self.next, self.query.policy
        );
        let page = match self.source.fetch_page(&request).await {
            Ok(page) => page,
            Err(err) => {
                self.finished = true;
                return Err(err);
            }
        };
        if page.page_number != 0 && page.page_number != u64::from(self.next) {
            debug!(
                "Requested page {} but server reported page {}",
                self.next, page.page_number
            );
        }

        match self.query.policy {
            PaginationPolicy::CountBased => {
                let total = total_pages(page.total_item_count, self.query.page_size);
                debug!(
                    "Server reports {} items, {} pages",
                    page.total_item_count, total
                );
                self.total_pages = Some(total);
            }
            PaginationPolicy::BoundaryScan => {
                let from = self.query.window.from;
                if page.transactions.is_empty() {
                    debug!("Page {} is empty, history exhausted", self.next);
                    self.finished = true;
                } else if page
                    .transactions
                    .iter()
                    .any(|txn| txn.date().is_some_and(|date| date < from))
                {
                    debug!("Page {} reaches past {}, stopping", self.next, from);
                    self.finished = true;
                }
            }
        }

        self.next += 1;
        Ok(Some(page))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::Transaction;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves canned pages by 1-based index and records what was asked for.
    pub(crate) struct FakeSource {
        pages: Vec<HistoryPage>,
        fail_on: Option<u32>,
        pub(crate) requests: Mutex<Vec<PointsHistoryRequest>>,
    }

    impl FakeSource {
        pub(crate) fn new(pages: Vec<HistoryPage>) -> Self {
            Self {
                pages,
                fail_on: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing_on(mut self, page: u32) -> Self {
            self.fail_on = Some(page);
            self
        }

        pub(crate) fn requested_pages(&self) -> Vec<u32> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.page)
                .collect()
        }
    }

    impl PageSource for FakeSource {
        async fn fetch_page(
            &self,
            request: &PointsHistoryRequest,
        ) -> Result<HistoryPage, PointsError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_on == Some(request.page) {
                return Err(ApiError::UnexpectedStatus {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".to_string(),
                }
                .into());
            }
            Ok(self
                .pages
                .get(request.page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }
    }

    pub(crate) fn txn(
        id: &str,
        kind: &str,
        points: &str,
        category: &str,
        date: &str,
    ) -> Transaction {
        serde_json::from_value(json!({
            "pointId": id,
            "pointCategory": kind,
            "points": points,
            "categories": [category],
            "transactionDate": date
        }))
        .unwrap()
    }

    pub(crate) fn page(
        number: u64,
        total_item_count: u64,
        transactions: Vec<Transaction>,
    ) -> HistoryPage {
        HistoryPage {
            items_count: transactions.len() as u64,
            transactions,
            total_item_count,
            page_number: number,
            ..HistoryPage::default()
        }
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn drain<S: PageSource>(paginator: &mut Paginator<'_, S>) -> Vec<HistoryPage> {
        let mut pages = Vec::new();
        while let Some(page) = paginator.next_page().await.unwrap() {
            pages.push(page);
        }
        pages
    }

    #[test]
    fn rounds_page_count_up() {
        assert_eq!(total_pages(250, 100), 3);
        assert_eq!(total_pages(200, 100), 2);
        assert_eq!(total_pages(50, 100), 1);
        assert_eq!(total_pages(0, 100), 0);
    }

    #[test]
    fn validates_query() {
        let err = HistoryQuery::new(date(2023, 2, 1), date(2023, 1, 1)).unwrap_err();
        assert!(matches!(err, PointsError::InvalidDateRange { .. }));

        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 1, 1)).unwrap();
        assert!(query.clone().with_page_size(0).is_err());
        assert!(query.with_max_pages(0).is_err());
    }

    #[test]
    fn builds_requests_per_policy() {
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 6, 30)).unwrap();
        let count = query.request_for(3);
        assert_eq!(count.page, 3);
        assert_eq!(count.from_date, "2023-01-01");
        assert_eq!(count.to_date, "2023-06-30");
        assert_eq!(count.sort, SortOrder::Asc);
        assert_eq!(count.limit, Some(DEFAULT_PAGE_SIZE));
        assert_eq!(count.types, vec![PointType::Earn]);

        let scan = query
            .with_policy(PaginationPolicy::BoundaryScan)
            .request_for(1);
        assert_eq!(scan.from_date, "2023-01-01T00:00:00Z");
        assert_eq!(scan.to_date, "2023-06-30T23:59:59Z");
        assert_eq!(scan.sort, SortOrder::Desc);
        assert_eq!(scan.limit, None);
    }

    #[tokio::test]
    async fn count_based_fetches_partial_last_page() {
        let pages = (1..=3)
            .map(|n| page(n, 250, vec![txn("x", "EARN", "1", "GAS", "2023-03-01")]))
            .collect();
        let source = FakeSource::new(pages);
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        let mut paginator = Paginator::new(&source, &query);

        let fetched = drain(&mut paginator).await;
        assert_eq!(fetched.len(), 3);
        assert_eq!(source.requested_pages(), vec![1, 2, 3]);
        assert_eq!(paginator.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn count_based_stops_after_single_short_page() {
        let source = FakeSource::new(vec![page(1, 40, Vec::new())]);
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        let mut paginator = Paginator::new(&source, &query);

        assert_eq!(drain(&mut paginator).await.len(), 1);
        assert_eq!(source.requested_pages(), vec![1]);
    }

    #[tokio::test]
    async fn count_based_with_no_items_fetches_one_page() {
        let source = FakeSource::new(Vec::new());
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        let mut paginator = Paginator::new(&source, &query);

        assert_eq!(drain(&mut paginator).await.len(), 1);
        assert_eq!(source.requested_pages(), vec![1]);
    }

    #[tokio::test]
    async fn boundary_scan_stops_on_page_past_window() {
        let pages = vec![
            page(1, 0, vec![txn("a", "EARN", "10", "DINING", "2023-02-01")]),
            page(
                2,
                0,
                vec![
                    txn("b", "EARN", "10", "DINING", "2023-01-01"),
                    txn("c", "EARN", "10", "DINING", "2022-12-31"),
                ],
            ),
            page(3, 0, vec![txn("d", "EARN", "10", "DINING", "2022-11-01")]),
        ];
        let source = FakeSource::new(pages);
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31))
            .unwrap()
            .with_policy(PaginationPolicy::BoundaryScan);
        let mut paginator = Paginator::new(&source, &query);

        let fetched = drain(&mut paginator).await;
        assert_eq!(fetched.len(), 2);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn boundary_scan_stops_on_empty_page() {
        let pages = vec![page(
            1,
            0,
            vec![txn("a", "EARN", "10", "GAS", "2023-05-01")],
        )];
        let source = FakeSource::new(pages);
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31))
            .unwrap()
            .with_policy(PaginationPolicy::BoundaryScan);
        let mut paginator = Paginator::new(&source, &query);

        assert_eq!(drain(&mut paginator).await.len(), 2);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stops_at_max_pages() {
        let pages = (1..=5)
            .map(|n| page(n, 0, vec![txn("a", "EARN", "1", "GAS", "2023-05-01")]))
            .collect();
        let source = FakeSource::new(pages);
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31))
            .unwrap()
            .with_policy(PaginationPolicy::BoundaryScan)
            .with_max_pages(2)
            .unwrap();
        let mut paginator = Paginator::new(&source, &query);

        assert_eq!(drain(&mut paginator).await.len(), 2);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn fetch_error_ends_the_walk() {
        let pages = (1..=3).map(|n| page(n, 300, Vec::new())).collect();
        let source = FakeSource::new(pages).failing_on(2);
        let query = HistoryQuery::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        let mut paginator = Paginator::new(&source, &query);

        assert!(paginator.next_page().await.unwrap().is_some());
        let err = paginator.next_page().await.unwrap_err();
        assert!(matches!(
            err,
            PointsError::Api(ApiError::UnexpectedStatus { .. })
        ));
        assert!(paginator.next_page().await.unwrap().is_none());
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }
}
