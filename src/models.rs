use crate::error::{InvalidPoints, PointsError};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Kind of points movement, sent as `pointCategory` by the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PointType {
    All,
    Earn,
    Redeem,
    Adjustment,
    Transfer,
    Reverse,
    Unrecognized(String),
}

impl PointType {
    pub fn as_str(&self) -> &str {
        match self {
            PointType::All => "ALL",
            PointType::Earn => "EARN",
            PointType::Redeem => "REDEEM",
            PointType::Adjustment => "ADJUSTMENT",
            PointType::Transfer => "TRANSFER",
            PointType::Reverse => "REVERSE",
            PointType::Unrecognized(raw) => raw,
        }
    }

    pub fn is_earn(&self) -> bool {
        matches!(self, PointType::Earn)
    }
}

impl Default for PointType {
    fn default() -> Self {
        PointType::Unrecognized(String::new())
    }
}

impl From<&str> for PointType {
    fn from(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ALL" => PointType::All,
            "EARN" => PointType::Earn,
            "REDEEM" => PointType::Redeem,
            "ADJUSTMENT" => PointType::Adjustment,
            "TRANSFER" => PointType::Transfer,
            "REVERSE" => PointType::Reverse,
            _ => PointType::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant or spend classification of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    All,
    Dining,
    Movies,
    Shopping,
    Entertainment,
    Transit,
    Groceries,
    Travel,
    Streaming,
    Gas,
    Other,
    Unrecognized(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::All => "ALL",
            Category::Dining => "DINING",
            Category::Movies => "MOVIES",
            Category::Shopping => "SHOPPING",
            Category::Entertainment => "ENTERTAINMENT",
            Category::Transit => "TRANSIT",
            Category::Groceries => "GROCERIES",
            Category::Travel => "TRAVEL",
            Category::Streaming => "STREAMING",
            Category::Gas => "GAS",
            Category::Other => "OTHER",
            Category::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ALL" => Category::All,
            "DINING" => Category::Dining,
            "MOVIES" => Category::Movies,
            "SHOPPING" => Category::Shopping,
            "ENTERTAINMENT" => Category::Entertainment,
            "TRANSIT" => Category::Transit,
            "GROCERIES" => Category::Groceries,
            "TRAVEL" => Category::Travel,
            "STREAMING" => Category::Streaming,
            "GAS" => Category::Gas,
            "OTHER" => Category::Other,
            _ => Category::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! string_enum_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(<$ty>::from(raw.as_str()))
            }
        }
    };
}

string_enum_serde!(PointType);
string_enum_serde!(Category);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Body of `POST /api/customer/points/history`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PointsHistoryRequest {
    pub types: Vec<PointType>,
    pub categories: Vec<Category>,
    pub cards: Vec<String>,
    pub from_date: String,
    pub to_date: String,
    pub page: u32,
    pub sort: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsHistoryResponse {
    pub data: HistoryPage,
    #[serde(default)]
    pub validation_errors: Value,
}

/// One page of points history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(rename = "pointsHistory", default, deserialize_with = "null_as_default")]
    pub transactions: Vec<Transaction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_item_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page_number: u64,
    #[serde(default)]
    pub error_details: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub point_id: String,
    #[serde(rename = "pointCategory", default, deserialize_with = "null_as_default")]
    pub point_type: PointType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub location: Option<String>,
    #[serde(default)]
    pub brand: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
    pub multiplier: Option<String>,
    pub transaction_amount: Option<String>,
    pub point_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transaction_date: String,
    pub card: Option<String>,
    #[serde(default)]
    pub award_type: Value,
    pub partner_code: Option<String>,
    pub icon_type_code: Option<String>,
}

impl Transaction {
    /// Points amount as an integer.
    pub fn points(&self) -> Result<i64, InvalidPoints> {
        self.points.trim().parse().map_err(|_| InvalidPoints {
            point_id: self.point_id.clone(),
            raw: self.points.clone(),
        })
    }

    /// Calendar date of the transaction, read from the leading `YYYY-MM-DD`.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.transaction_date)
    }

    /// Bucket the transaction is attributed to: its first listed category.
    pub fn primary_category(&self) -> Category {
        self.categories.first().cloned().unwrap_or(Category::Other)
    }
}

/// Reads an explicit JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw: Option<T> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.get(0..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// True for JSON that carries something worth reporting.
pub(crate) fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

pub fn parse_history_response(data: &str) -> Result<PointsHistoryResponse, PointsError> {
    let parsed: PointsHistoryResponse =
        serde_json::from_str(data).map_err(PointsError::InvalidResponse)?;
    debug!(
        "Parsed page {} with {} transactions",
        parsed.data.page_number,
        parsed.data.transactions.len()
    );
    Ok(parsed)
}
