use crate::aggregate::PointsTally;
use crate::models::Category;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Points earned in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: Category,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Nonzero categories, largest first.
    pub categories: Vec<CategoryTotal>,
    pub total_points: i64,
}

impl Summary {
    pub fn from_tally(tally: &PointsTally) -> Self {
        let mut categories: Vec<CategoryTotal> = tally
            .by_category
            .iter()
            .filter(|(_, points)| **points != 0)
            .map(|(category, points)| CategoryTotal {
                category: category.clone(),
                points: *points,
            })
            .collect();
        categories.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });
        Self {
            categories,
            total_points: tally.total,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.categories {
            writeln!(
                f,
                "{} {} {} {}",
                line.category,
                format_percentage(line.points, self.total_points),
                line.points,
                format_dollars(line.points)
            )?;
        }
        write!(
            f,
            "TOTAL {} {}",
            self.total_points,
            format_dollars(self.total_points)
        )
    }
}

/// `part` as a share of `total`, e.g. `"25.00%"`.
pub fn format_percentage(part: i64, total: i64) -> String {
    if total == 0 {
        return "0.00%".to_string();
    }
    let mut share = (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    share.rescale(2);
    format!("{share}%")
}

/// Dollar value of `points`, 100 points to the dollar, e.g. `"$12.34"`.
pub fn format_dollars(points: i64) -> String {
    let dollars = Decimal::new(points, 2);
    if dollars.is_sign_negative() {
        format!("-${}", dollars.abs())
    } else {
        format!("${dollars}")
    }
}
