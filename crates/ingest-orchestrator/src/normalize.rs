//! Provider payload → canonical [`MetricsRecord`].
//!
//! Every coercion is total. A field only counts as supplied when the
//! provider sent a usable value for it; placeholders and missing keys leave
//! the record default in place and are not reported, so a later upsert does
//! not overwrite stored data with defaults.

use market_core::{
    is_placeholder, parse_float, parse_fraction, Bar, FieldSet, JsonObject, MetricField,
    MetricsRecord, NormalizedMetrics, ProviderKind, RawPayload,
};
use serde_json::Value;

/// Trading days in a year, the window for the 52-week range
const YEAR_BARS: usize = 252;

struct Collector {
    record: MetricsRecord,
    supplied: FieldSet,
}

impl Collector {
    fn set(&mut self, field: MetricField, value: Option<f64>) {
        if let Some(v) = value {
            if self.record.set_number(field, v) {
                self.supplied.insert(field);
            }
        }
    }

    fn number(&mut self, field: MetricField, value: Option<&Value>) {
        self.set(field, value.and_then(parse_float));
    }

    fn fraction(&mut self, field: MetricField, value: Option<&Value>) {
        self.set(field, value.and_then(parse_fraction));
    }

    fn count(&mut self, field: MetricField, value: Option<&Value>) {
        // negative counts are garbage, not zero
        self.set(field, value.and_then(parse_float).filter(|v| *v >= 0.0));
    }

    fn sector(&mut self, value: Option<&Value>) {
        if let Some(Value::String(s)) = value {
            if !is_placeholder(s) {
                self.record.sector = s.trim().to_string();
                self.supplied.insert(MetricField::Sector);
            }
        }
    }
}

/// Converts a raw payload into a canonical record for `symbol`.
///
/// Returns `None` only when `symbol` is blank.
pub fn normalize(payload: &RawPayload, provider: ProviderKind, symbol: &str) -> Option<NormalizedMetrics> {
    MetricsRecord::new(symbol).map(|record| normalize_into(payload, provider, record))
}

/// Applies `payload` on top of `record`, which supplies the symbol and the
/// defaults for anything the provider left out.
pub fn normalize_into(
    payload: &RawPayload,
    provider: ProviderKind,
    record: MetricsRecord,
) -> NormalizedMetrics {
    let mut c = Collector {
        record,
        supplied: FieldSet::new(),
    };

    match payload {
        RawPayload::Overview { overview, quote } => {
            from_overview(&mut c, overview);
            if let Some(quote) = quote {
                c.number(MetricField::Price, quote.get("05. price"));
            }
        }
        RawPayload::Quote(quote) => from_quote(&mut c, quote),
        RawPayload::Fundamentals { growth, ratios } => from_fundamentals(&mut c, growth, ratios),
        RawPayload::Bars(bars) => from_bars(&mut c, bars),
    }

    NormalizedMetrics {
        provider,
        record: c.record,
        supplied: c.supplied,
    }
}

fn from_overview(c: &mut Collector, o: &JsonObject) {
    c.sector(o.get("Sector"));
    c.number(MetricField::PeRatio, o.get("PERatio"));
    c.number(MetricField::PegRatio, o.get("PEGRatio"));
    c.fraction(MetricField::ReturnOnEquity, o.get("ReturnOnEquityTTM"));
    c.fraction(MetricField::ProfitMargin, o.get("ProfitMargin"));
    c.fraction(MetricField::QuarterlyEarningsGrowthYoy, o.get("QuarterlyEarningsGrowthYOY"));
    c.number(MetricField::Beta, o.get("Beta"));
    c.fraction(MetricField::DividendYield, o.get("DividendYield"));
    c.number(MetricField::PriceToBookRatio, o.get("PriceToBookRatio"));
    c.count(MetricField::AnalystStrongBuy, o.get("AnalystRatingStrongBuy"));
    c.count(MetricField::AnalystBuy, o.get("AnalystRatingBuy"));
    c.count(MetricField::AnalystHold, o.get("AnalystRatingHold"));
    c.count(MetricField::AnalystSell, o.get("AnalystRatingSell"));
    c.count(MetricField::AnalystStrongSell, o.get("AnalystRatingStrongSell"));
    c.number(MetricField::Week52High, o.get("52WeekHigh"));
    c.number(MetricField::Week52Low, o.get("52WeekLow"));
    c.number(MetricField::MovingAverage50, o.get("50DayMovingAverage"));
    c.number(MetricField::MovingAverage200, o.get("200DayMovingAverage"));
}

fn from_quote(c: &mut Collector, q: &JsonObject) {
    c.sector(q.get("sector"));
    c.number(MetricField::Price, q.get("regularMarketPrice"));
    c.number(MetricField::PeRatio, q.get("trailingPE"));
    c.number(MetricField::PegRatio, q.get("pegRatio"));
    c.fraction(MetricField::ReturnOnEquity, q.get("returnOnEquity"));
    c.fraction(MetricField::ProfitMargin, q.get("profitMargins"));
    c.fraction(MetricField::QuarterlyEarningsGrowthYoy, q.get("earningsQuarterlyGrowth"));
    c.number(MetricField::Beta, q.get("beta"));
    c.number(MetricField::PriceToBookRatio, q.get("priceToBook"));
    c.number(MetricField::Week52High, q.get("fiftyTwoWeekHigh"));
    c.number(MetricField::Week52Low, q.get("fiftyTwoWeekLow"));
    c.number(MetricField::MovingAverage50, q.get("fiftyDayAverage"));
    c.number(MetricField::MovingAverage200, q.get("twoHundredDayAverage"));

    // trailingAnnualDividendYield is a fraction; dividendYield is a percentage
    let dividend = q
        .get("trailingAnnualDividendYield")
        .and_then(parse_fraction)
        .or_else(|| q.get("dividendYield").and_then(parse_float).map(|v| v / 100.0));
    c.set(MetricField::DividendYield, dividend);
}

fn from_fundamentals(c: &mut Collector, growth: &[JsonObject], ratios: &JsonObject) {
    let revenue_growth = |row: &JsonObject| row.get("growthRevenue").and_then(parse_fraction);

    c.set(MetricField::RevenueGrowth, growth.first().and_then(revenue_growth));

    // Mean over the four fiscal years preceding the latest one
    let past: Vec<f64> = growth.iter().skip(1).take(4).filter_map(revenue_growth).collect();
    if !past.is_empty() {
        c.set(
            MetricField::RevenueGrowth5y,
            Some(past.iter().sum::<f64>() / past.len() as f64),
        );
    }

    c.number(MetricField::PeRatio, ratios.get("priceToEarningsRatioTTM"));
    c.number(MetricField::PegRatio, ratios.get("priceToEarningsGrowthRatioTTM"));
    c.fraction(MetricField::DividendYield, ratios.get("dividendYieldTTM"));
    c.number(MetricField::DebtToEquity, ratios.get("debtToEquityRatioTTM"));
    c.number(MetricField::PriceToBookRatio, ratios.get("priceToBookRatioTTM"));
    c.fraction(MetricField::ProfitMargin, ratios.get("netProfitMarginTTM"));
}

fn mean_close(bars: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || bars.len() < n {
        return None;
    }
    let window = &bars[bars.len() - n..];
    Some(window.iter().map(|b| b.close).sum::<f64>() / n as f64)
}

/// Price-derived metrics from daily bars, oldest first.
fn from_bars(c: &mut Collector, bars: &[Bar]) {
    let Some(last) = bars.last() else {
        return;
    };
    c.set(MetricField::Price, Some(last.close));

    let year = &bars[bars.len().saturating_sub(YEAR_BARS)..];
    let high = year.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = year.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    c.set(MetricField::Week52High, Some(high));
    c.set(MetricField::Week52Low, Some(low));

    c.set(MetricField::MovingAverage50, mean_close(bars, 50));
    c.set(MetricField::MovingAverage200, mean_close(bars, 200));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn object(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_overview_coercion() {
        let payload = RawPayload::Overview {
            overview: object(json!({
                "Symbol": "IBM",
                "Sector": "TECHNOLOGY",
                "PERatio": "22.5",
                "PEGRatio": "None",
                "ReturnOnEquityTTM": "0.338",
                "ProfitMargin": "-",
                "DividendYield": "0.0358",
                "Beta": "0.71",
                "AnalystRatingStrongBuy": "3",
                "AnalystRatingBuy": "5",
                "AnalystRatingHold": "9",
                "AnalystRatingSell": "2",
                "AnalystRatingStrongSell": "-",
                "52WeekHigh": "199.18",
                "52WeekLow": "135.87",
                "50DayMovingAverage": "182.3",
                "200DayMovingAverage": "171.2"
            })),
            quote: Some(object(json!({"05. price": "187.3400"}))),
        };

        let out = normalize(&payload, ProviderKind::AlphaVantage, " ibm ").unwrap();
        let r = &out.record;
        assert_eq!(r.symbol, "IBM");
        assert_eq!(r.sector, "TECHNOLOGY");
        assert_eq!(r.price, 187.34);
        assert_eq!(r.pe_ratio, 22.5);
        assert_eq!(r.peg_ratio, 0.0);
        assert_eq!(r.profit_margin, 0.0);
        assert_eq!(r.analyst_ratings.buy, 5);
        assert_eq!(r.analyst_ratings.strong_sell, 0);

        assert!(out.supplied.contains(&MetricField::Price));
        assert!(out.supplied.contains(&MetricField::PeRatio));
        assert!(!out.supplied.contains(&MetricField::PegRatio));
        assert!(!out.supplied.contains(&MetricField::ProfitMargin));
        assert!(!out.supplied.contains(&MetricField::AnalystStrongSell));
        assert!(!out.supplied.contains(&MetricField::RevenueGrowth));
    }

    #[test]
    fn test_overview_without_quote_leaves_price_unsupplied() {
        let payload = RawPayload::Overview {
            overview: object(json!({"PERatio": "10"})),
            quote: None,
        };
        let out = normalize(&payload, ProviderKind::AlphaVantage, "T").unwrap();
        assert!(!out.supplied.contains(&MetricField::Price));
        assert_eq!(out.record.price, 0.0);
        assert_eq!(out.record.beta, 1.0);
    }

    #[test]
    fn test_quote_dividend_conventions() {
        let with_trailing = RawPayload::Quote(object(json!({
            "regularMarketPrice": 61.2,
            "trailingAnnualDividendYield": 0.0312,
            "dividendYield": 3.12
        })));
        let out = normalize(&with_trailing, ProviderKind::Yahoo, "KO").unwrap();
        assert_relative_eq!(out.record.dividend_yield, 0.0312);

        let percent_only = RawPayload::Quote(object(json!({"dividendYield": 2.5})));
        let out = normalize(&percent_only, ProviderKind::Yahoo, "KO").unwrap();
        assert_relative_eq!(out.record.dividend_yield, 0.025);
        assert!(out.supplied.contains(&MetricField::DividendYield));
    }

    #[test]
    fn test_fundamentals_growth_history() {
        let growth: Vec<JsonObject> = [0.12, 0.08, 0.02, -0.04, 0.10, 0.50]
            .iter()
            .map(|g| object(json!({"growthRevenue": g})))
            .collect();
        let ratios = object(json!({
            "priceToEarningsRatioTTM": 25.0,
            "dividendYieldTTM": 0.005,
            "debtToEquityRatioTTM": 1.4
        }));
        let payload = RawPayload::Fundamentals { growth, ratios };

        let out = normalize(&payload, ProviderKind::Fmp, "NVDA").unwrap();
        let r = &out.record;
        assert_eq!(r.revenue_growth, Some(0.12));
        // entries 1..5: 0.08, 0.02, -0.04, 0.10
        assert_relative_eq!(r.revenue_growth_5y.unwrap(), 0.04, epsilon = 1e-12);
        assert_eq!(r.debt_to_equity, Some(1.4));
        assert_eq!(r.pe_ratio, 25.0);
        assert!(!r.has_technical_data());
    }

    #[test]
    fn test_fundamentals_single_year_has_no_history() {
        let payload = RawPayload::Fundamentals {
            growth: vec![object(json!({"growthRevenue": 0.3}))],
            ratios: object(json!({"priceToEarningsRatioTTM": null})),
        };
        let out = normalize(&payload, ProviderKind::Fmp, "NEW").unwrap();
        assert_eq!(out.record.revenue_growth, Some(0.3));
        assert!(out.record.revenue_growth_5y.is_none());
        assert!(!out.supplied.contains(&MetricField::PeRatio));
    }

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar {
                    timestamp: start + Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_bar_metrics() {
        let out = normalize(&RawPayload::Bars(bars(300)), ProviderKind::Alpaca, "SPY").unwrap();
        let r = &out.record;
        assert_eq!(r.price, 399.0);
        assert_eq!(r.week_52_high, 400.0);
        // last 252 bars start at close 148
        assert_eq!(r.week_52_low, 147.0);
        // mean of closes 350..=399
        assert_relative_eq!(r.moving_average_50, 374.5);
        // mean of closes 200..=399
        assert_relative_eq!(r.moving_average_200, 299.5);
        assert!(!out.supplied.contains(&MetricField::PeRatio));
    }

    #[test]
    fn test_short_bar_history_skips_long_average() {
        let out = normalize(&RawPayload::Bars(bars(60)), ProviderKind::Alpaca, "IPO").unwrap();
        assert!(out.supplied.contains(&MetricField::MovingAverage50));
        assert!(!out.supplied.contains(&MetricField::MovingAverage200));
        assert_eq!(out.record.moving_average_200, 0.0);
        assert_eq!(out.record.week_52_low, 99.0);
    }

    #[test]
    fn test_blank_symbol() {
        assert!(normalize(&RawPayload::Bars(vec![]), ProviderKind::Alpaca, "  ").is_none());
    }
}
