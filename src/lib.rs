//! Summarises earned Scene+ loyalty points by spend category.
//! Walks the paginated points history endpoint, keeps the earned
//! transactions and reports per-category totals with their dollar value.

pub mod aggregate;
pub mod client;
pub mod error;
pub mod models;
pub mod pagination;
pub mod report;

pub use aggregate::{Aggregator, Contribution, PointsTally, collect_points};
pub use client::Client;
pub use error::{ApiError, ErrorKind, InvalidPoints, PointsError};
pub use models::{Category, HistoryPage, PointType, PointsHistoryRequest, Transaction};
pub use pagination::{HistoryQuery, PageSource, PaginationPolicy, Paginator, total_pages};
pub use report::{Summary, format_dollars, format_percentage};
