// JSON projection of a report, for renderers and templaters that live
// outside this crate.

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::*;

/// Projects a [`Report`] into a plain JSON tree.
///
/// Non-finite numbers (the undefined-metric sentinel) become `null`, so a
/// chart renderer can skip the point instead of plotting it.
pub fn report_to_json(report: &Report) -> JSValue {
    let mut series: Vec<JSValue> = Vec::new();
    for s in report.series.iter() {
        series.push(json!({
            "code": s.code,
            "name": s.name,
            "color": s.color,
            "percentage": numbers(&s.percentage),
            "growth": numbers(&s.growth),
            "trend": numbers(&s.trend),
            "lastCount": s.last_count,
            "lastPercentage": number(s.last_percentage),
        }));
    }

    let mut table: Vec<JSValue> = Vec::new();
    for row in report.table.iter() {
        table.push(json!({
            "code": row.code,
            "name": row.name,
            "count": row.count,
            "percentage": number(row.percentage),
            "trend": number(row.trend),
            "tag": tag_label(row.tag),
        }));
    }

    let mut summary: JSMap<String, JSValue> = JSMap::new();
    summary.insert("timestamps".to_string(), json!(report.timestamps));
    summary.insert("series".to_string(), JSValue::Array(series));
    summary.insert("table".to_string(), JSValue::Array(table));
    summary.insert(
        "turnout".to_string(),
        json!({
            "totalVotes": report.turnout.total_votes,
            "turnoutPct": number(report.turnout.turnout_pct),
        }),
    );
    if let Some(threshold) = report.threshold_pct {
        summary.insert("thresholdPct".to_string(), json!(threshold));
    }
    JSValue::Object(summary)
}

fn tag_label(tag: TrendTag) -> &'static str {
    match tag {
        TrendTag::Rising => "rising",
        TrendTag::Falling => "falling",
        TrendTag::Flat => "flat",
    }
}

// Non-finite floats map to null.
fn number(x: f64) -> JSValue {
    JSValue::from(x)
}

fn numbers(xs: &[f64]) -> JSValue {
    JSValue::Array(xs.iter().map(|x| number(*x)).collect())
}
