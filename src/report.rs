//! Text rendering of an analysis report
//!
//! Fixed-layout terminal report. JSON output comes straight from the
//! report's `Serialize` impl; no computation happens here.

use crate::analysis_core::analyzer::AnalysisReport;
use crate::analysis_core::positioning::Action;

pub fn render_text(report: &AnalysisReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("=== REPORT: {} ===", report.symbol));
    lines.push(format!(
        "Date: {}",
        report.timestamp.format("%Y-%m-%d %H:%M")
    ));
    lines.push(String::new());

    lines.push(format!(
        "RATING: {} ({})",
        report.recommendation, report.trade_type
    ));
    lines.push(format!("Confidence: {:.0}%", report.confidence * 100.0));
    lines.push(format!("Rationale: {}", report.rationale));
    lines.push(String::new());

    lines.push("--- LEVELS ---".to_string());
    lines.push(format!("Price: {:.2}", report.price));
    lines.push(format!("Signal: {}", report.entry_signal));
    if report.recommendation != Action::Hold {
        lines.push(format!(
            "Stop:     {:.2} ({:.1}R)",
            report.stop_loss, report.risk_reward
        ));
        lines.push(format!("Target:   {:.2}", report.target));
        lines.push(format!(
            "Size:     {} shares ({:.1}%)",
            report.position_size_shares,
            report.position_size_pct * 100.0
        ));
    }
    lines.push(String::new());

    lines.push("--- CONTEXT ---".to_string());
    lines.push(format!("Regime:    {}", report.regime));
    lines.push(format!("Trend:     {}", report.trend_strength));
    lines.push(format!(
        "Patterns:  {}",
        if report.patterns.is_empty() {
            "None".to_string()
        } else {
            report.patterns.join(", ")
        }
    ));
    lines.push(format!(
        "Volume:    {} ({})",
        report.volume_status, report.volume_trend
    ));
    lines.push(format!(
        "Sentiment: {} ({:.2})",
        report.sentiment_summary, report.sentiment_score
    ));

    if let (Some(win_rate), Some(avg_move)) = (report.backtest_win_rate, report.backtest_avg_move) {
        lines.push(String::new());
        lines.push("--- HISTORY ---".to_string());
        lines.push(format!("Win Rate: {:.0}%", win_rate * 100.0));
        lines.push(format!("Avg Move: {:.1}%", avg_move * 100.0));
    }

    lines.join("\n")
}
