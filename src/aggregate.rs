use crate::error::PointsError;
use crate::models::{Category, HistoryPage, Transaction};
use crate::pagination::{DateWindow, HistoryQuery, PageSource, PaginationPolicy, Paginator};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Earned points accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsTally {
    pub by_category: BTreeMap<Category, i64>,
    pub total: i64,
    /// Transactions that added to the tally.
    pub counted: usize,
    /// Earned transactions dropped because their data could not be read.
    pub skipped: usize,
}

/// What a single transaction did to the tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    Counted(i64),
    NotEarned,
    OutsideWindow,
    UndatedTransaction,
    InvalidPoints,
    Overflow,
}

/// Folds transactions into a [`PointsTally`].
#[derive(Debug, Default)]
pub struct Aggregator {
    window: Option<DateWindow>,
    tally: PointsTally,
}

impl Aggregator {
    /// Aggregator that counts every earned transaction it is given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator that also drops earned transactions dated outside `window`.
    pub fn with_window(window: DateWindow) -> Self {
        Self {
            window: Some(window),
            tally: PointsTally::default(),
        }
    }

    /// Count-based pages are already limited to the window by the server,
    /// boundary-scan pages are not.
    pub fn for_query(query: &HistoryQuery) -> Self {
        match query.policy() {
            PaginationPolicy::CountBased => Self::new(),
            PaginationPolicy::BoundaryScan => Self::with_window(query.window()),
        }
    }

    pub fn ingest(&mut self, txn: &Transaction) -> Contribution {
        if !txn.point_type.is_earn() {
            return Contribution::NotEarned;
        }
        if let Some(window) = self.window {
            match txn.date() {
                Some(date) if !window.contains(date) => return Contribution::OutsideWindow,
                Some(_) => {}
                None => {
                    warn!(
                        "Skipping transaction {}: unreadable date {:?}",
                        txn.point_id, txn.transaction_date
                    );
                    self.tally.skipped += 1;
                    return Contribution::UndatedTransaction;
                }
            }
        }
        let points = match txn.points() {
            Ok(points) => points,
            Err(err) => {
                warn!("Skipping {err}");
                self.tally.skipped += 1;
                return Contribution::InvalidPoints;
            }
        };
        let category = txn.primary_category();
        let current = self.tally.by_category.get(&category).copied();
        let sums = current
            .unwrap_or(0)
            .checked_add(points)
            .zip(self.tally.total.checked_add(points));
        let Some((bucket, total)) = sums else {
            warn!(
                "Skipping transaction {}: {} points would overflow the tally",
                txn.point_id, points
            );
            self.tally.skipped += 1;
            return Contribution::Overflow;
        };
        self.tally.by_category.insert(category, bucket);
        self.tally.total = total;
        self.tally.counted += 1;
        Contribution::Counted(points)
    }

    pub fn ingest_page(&mut self, page: &HistoryPage) {
        for txn in &page.transactions {
            self.ingest(txn);
        }
        debug!(
            "Folded page {}: running total {} points",
            page.page_number, self.tally.total
        );
    }

    pub fn tally(&self) -> &PointsTally {
        &self.tally
    }

    pub fn finish(self) -> PointsTally {
        self.tally
    }
}

/// Walk every page selected by `query` and tally the earned points.
///
/// Returns the first fatal error unchanged; nothing is tallied in that case.
pub async fn collect_points<S: PageSource>(
    source: &S,
    query: &HistoryQuery,
) -> Result<PointsTally, PointsError> {
    let mut paginator = Paginator::new(source, query);
    let mut aggregator = Aggregator::for_query(query);
    while let Some(page) = paginator.next_page().await? {
        aggregator.ingest_page(&page);
    }
    let tally = aggregator.finish();
    info!(
        "Fetched {} pages, counted {} transactions ({} skipped)",
        paginator.pages_fetched(),
        tally.counted,
        tally.skipped
    );
    Ok(tally)
}
