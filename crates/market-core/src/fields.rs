//! Column catalogue for [`MetricsRecord`] and cell-level conversions used by
//! the durable table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::coerce::{is_placeholder, parse_count_str, parse_number_str};
use crate::types::MetricsRecord;

/// Key column of the durable table
pub const SYMBOL_COLUMN: &str = "symbol";

/// Every non-key field of a [`MetricsRecord`], in table column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricField {
    Price,
    Sector,
    PeRatio,
    PegRatio,
    ReturnOnEquity,
    ProfitMargin,
    QuarterlyEarningsGrowthYoy,
    Beta,
    DividendYield,
    PriceToBookRatio,
    AnalystStrongBuy,
    AnalystBuy,
    AnalystHold,
    AnalystSell,
    AnalystStrongSell,
    Week52High,
    Week52Low,
    MovingAverage50,
    MovingAverage200,
    RevenueGrowth,
    RevenueGrowth5y,
    DebtToEquity,
}

pub type FieldSet = BTreeSet<MetricField>;

impl MetricField {
    pub const ALL: [MetricField; 22] = [
        MetricField::Price,
        MetricField::Sector,
        MetricField::PeRatio,
        MetricField::PegRatio,
        MetricField::ReturnOnEquity,
        MetricField::ProfitMargin,
        MetricField::QuarterlyEarningsGrowthYoy,
        MetricField::Beta,
        MetricField::DividendYield,
        MetricField::PriceToBookRatio,
        MetricField::AnalystStrongBuy,
        MetricField::AnalystBuy,
        MetricField::AnalystHold,
        MetricField::AnalystSell,
        MetricField::AnalystStrongSell,
        MetricField::Week52High,
        MetricField::Week52Low,
        MetricField::MovingAverage50,
        MetricField::MovingAverage200,
        MetricField::RevenueGrowth,
        MetricField::RevenueGrowth5y,
        MetricField::DebtToEquity,
    ];

    pub fn column(self) -> &'static str {
        match self {
            MetricField::Price => "price",
            MetricField::Sector => "sector",
            MetricField::PeRatio => "pe_ratio",
            MetricField::PegRatio => "peg_ratio",
            MetricField::ReturnOnEquity => "return_on_equity_ttm",
            MetricField::ProfitMargin => "profit_margin",
            MetricField::QuarterlyEarningsGrowthYoy => "quarterly_earnings_growth_yoy",
            MetricField::Beta => "beta",
            MetricField::DividendYield => "dividend_yield",
            MetricField::PriceToBookRatio => "price_to_book_ratio",
            MetricField::AnalystStrongBuy => "analyst_rating_strong_buy",
            MetricField::AnalystBuy => "analyst_rating_buy",
            MetricField::AnalystHold => "analyst_rating_hold",
            MetricField::AnalystSell => "analyst_rating_sell",
            MetricField::AnalystStrongSell => "analyst_rating_strong_sell",
            MetricField::Week52High => "week_52_high",
            MetricField::Week52Low => "week_52_low",
            MetricField::MovingAverage50 => "moving_average_50",
            MetricField::MovingAverage200 => "moving_average_200",
            MetricField::RevenueGrowth => "revenue_growth",
            MetricField::RevenueGrowth5y => "revenue_growth_5y",
            MetricField::DebtToEquity => "debt_to_equity",
        }
    }

    pub fn is_count(self) -> bool {
        matches!(
            self,
            MetricField::AnalystStrongBuy
                | MetricField::AnalystBuy
                | MetricField::AnalystHold
                | MetricField::AnalystSell
                | MetricField::AnalystStrongSell
        )
    }

    pub fn from_column(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|f| f.column() == name)
    }
}

fn format_number(v: f64) -> String {
    format!("{}", v)
}

impl MetricsRecord {
    /// Cell text for the durable table. `None` for an absent optional field.
    pub fn cell(&self, field: MetricField) -> Option<String> {
        let r = &self.analyst_ratings;
        match field {
            MetricField::Price => Some(format_number(self.price)),
            MetricField::Sector => Some(self.sector.clone()),
            MetricField::PeRatio => Some(format_number(self.pe_ratio)),
            MetricField::PegRatio => Some(format_number(self.peg_ratio)),
            MetricField::ReturnOnEquity => Some(format_number(self.return_on_equity)),
            MetricField::ProfitMargin => Some(format_number(self.profit_margin)),
            MetricField::QuarterlyEarningsGrowthYoy => {
                Some(format_number(self.quarterly_earnings_growth_yoy))
            }
            MetricField::Beta => Some(format_number(self.beta)),
            MetricField::DividendYield => Some(format_number(self.dividend_yield)),
            MetricField::PriceToBookRatio => Some(format_number(self.price_to_book_ratio)),
            MetricField::AnalystStrongBuy => Some(r.strong_buy.to_string()),
            MetricField::AnalystBuy => Some(r.buy.to_string()),
            MetricField::AnalystHold => Some(r.hold.to_string()),
            MetricField::AnalystSell => Some(r.sell.to_string()),
            MetricField::AnalystStrongSell => Some(r.strong_sell.to_string()),
            MetricField::Week52High => Some(format_number(self.week_52_high)),
            MetricField::Week52Low => Some(format_number(self.week_52_low)),
            MetricField::MovingAverage50 => Some(format_number(self.moving_average_50)),
            MetricField::MovingAverage200 => Some(format_number(self.moving_average_200)),
            MetricField::RevenueGrowth => self.revenue_growth.map(format_number),
            MetricField::RevenueGrowth5y => self.revenue_growth_5y.map(format_number),
            MetricField::DebtToEquity => self.debt_to_equity.map(format_number),
        }
    }

    /// Applies a table cell. Unusable text leaves the field untouched and
    /// returns `false`.
    pub fn apply_cell(&mut self, field: MetricField, raw: &str) -> bool {
        if field == MetricField::Sector {
            if is_placeholder(raw) {
                return false;
            }
            self.sector = raw.trim().to_string();
            return true;
        }

        let parsed = if field.is_count() {
            parse_count_str(raw).map(f64::from)
        } else {
            parse_number_str(raw)
        };
        match parsed {
            Some(v) => self.set_number(field, v),
            None => false,
        }
    }

    /// Sets a numeric field. Counts are truncated and floored at zero.
    /// Returns `false` for `Sector` and for non-finite input.
    pub fn set_number(&mut self, field: MetricField, v: f64) -> bool {
        if !v.is_finite() {
            return false;
        }
        let count = v.max(0.0).trunc().min(u32::MAX as f64) as u32;
        let ratings = &mut self.analyst_ratings;
        match field {
            MetricField::Price => self.price = v,
            MetricField::PeRatio => self.pe_ratio = v,
            MetricField::PegRatio => self.peg_ratio = v,
            MetricField::ReturnOnEquity => self.return_on_equity = v,
            MetricField::ProfitMargin => self.profit_margin = v,
            MetricField::QuarterlyEarningsGrowthYoy => self.quarterly_earnings_growth_yoy = v,
            MetricField::Beta => self.beta = v,
            MetricField::DividendYield => self.dividend_yield = v,
            MetricField::PriceToBookRatio => self.price_to_book_ratio = v,
            MetricField::AnalystStrongBuy => ratings.strong_buy = count,
            MetricField::AnalystBuy => ratings.buy = count,
            MetricField::AnalystHold => ratings.hold = count,
            MetricField::AnalystSell => ratings.sell = count,
            MetricField::AnalystStrongSell => ratings.strong_sell = count,
            MetricField::Week52High => self.week_52_high = v,
            MetricField::Week52Low => self.week_52_low = v,
            MetricField::MovingAverage50 => self.moving_average_50 = v,
            MetricField::MovingAverage200 => self.moving_average_200 = v,
            MetricField::RevenueGrowth => self.revenue_growth = Some(v),
            MetricField::RevenueGrowth5y => self.revenue_growth_5y = Some(v),
            MetricField::DebtToEquity => self.debt_to_equity = Some(v),
            MetricField::Sector => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_unique_and_reversible() {
        let mut seen = std::collections::HashSet::new();
        for field in MetricField::ALL {
            assert!(seen.insert(field.column()), "duplicate column {}", field.column());
            assert_eq!(MetricField::from_column(field.column()), Some(field));
        }
        assert!(MetricField::from_column(SYMBOL_COLUMN).is_none());
    }

    #[test]
    fn test_cell_round_trip_through_text() {
        let mut source = MetricsRecord::new("KO").unwrap();
        source.price = 61.25;
        source.sector = "Consumer Defensive".to_string();
        source.dividend_yield = 0.031;
        source.analyst_ratings.buy = 7;
        source.debt_to_equity = Some(1.6);

        let mut rebuilt = MetricsRecord::new("KO").unwrap();
        for field in MetricField::ALL {
            if let Some(text) = source.cell(field) {
                rebuilt.apply_cell(field, &text);
            }
        }
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_apply_cell_ignores_placeholders() {
        let mut record = MetricsRecord::new("T").unwrap();
        record.pe_ratio = 9.0;
        assert!(!record.apply_cell(MetricField::PeRatio, "None"));
        assert!(!record.apply_cell(MetricField::Sector, ""));
        assert!(!record.apply_cell(MetricField::AnalystHold, "-"));
        assert_eq!(record.pe_ratio, 9.0);
        assert_eq!(record.sector, "Unknown");
        assert!(record.cell(MetricField::RevenueGrowth).is_none());
    }

    #[test]
    fn test_set_number() {
        let mut record = MetricsRecord::new("T").unwrap();
        assert!(record.set_number(MetricField::AnalystBuy, 4.7));
        assert_eq!(record.analyst_ratings.buy, 4);
        assert!(record.set_number(MetricField::AnalystSell, -3.0));
        assert_eq!(record.analyst_ratings.sell, 0);
        assert!(!record.set_number(MetricField::Sector, 1.0));
        assert!(!record.set_number(MetricField::Beta, f64::NAN));
        assert_eq!(record.beta, 1.0);
        assert!(record.set_number(MetricField::DebtToEquity, 0.0));
        assert_eq!(record.debt_to_equity, Some(0.0));
    }
}
