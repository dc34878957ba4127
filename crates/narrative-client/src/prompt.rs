//! Prompt construction for the DCF commentary.

use dcf_engine::{DriverHighlight, FlexHighlight, SegmentSnapshot, ValuationSummary};
use serde::{Deserialize, Serialize};

use crate::formatters::{format_dollars, format_percent, format_points};

pub const SYSTEM_PROMPT: &str =
    "You are an equity research analyst producing polished buy-side commentary with concrete financial drivers.";

/// Components named per segment line
const TOP_COMPONENTS_PER_SEGMENT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativePrompt {
    pub system: String,
    pub user: String,
}

fn segment_line(segment: &SegmentSnapshot) -> String {
    let mut components: Vec<_> = segment.components.iter().collect();
    components.sort_by(|a, b| b.base_revenue.total_cmp(&a.base_revenue));

    let leaders = components
        .into_iter()
        .take(TOP_COMPONENTS_PER_SEGMENT)
        .map(|c| {
            let delta_label = if c.delta_from_base == 0.0 {
                String::new()
            } else {
                format!(" ({} pts vs base)", format_points(c.delta_from_base))
            };
            format!("{} {}{}", c.name, format_percent(c.applied_growth, 1), delta_label)
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "- {} (~{} FY25, {}% of revenue) flexed to {} CAGR, led by {}.",
        segment.name,
        format_dollars(segment.fy_revenue),
        segment.percent_of_total,
        format_percent(segment.implied_growth, 1),
        leaders
    )
}

fn driver_line(driver: &DriverHighlight) -> String {
    let transcript = driver
        .transcript_summary
        .as_deref()
        .map(|s| format!("Transcript: {}", s))
        .unwrap_or_default();

    format!(
        "- {} ({}) | Base {}, CAGR {} ({} pts vs base). {}",
        driver.component,
        driver.segment,
        format_dollars(driver.base_revenue),
        format_percent(driver.applied_growth, 1),
        format_points(driver.delta_from_base),
        transcript
    )
    .trim_end()
    .to_string()
}

fn flex_line(flex: &FlexHighlight) -> String {
    format!(
        "- {} ({}): {} -> {} ({} pts)",
        flex.component,
        flex.segment,
        format_percent(flex.base_rate, 1),
        format_percent(flex.rate, 1),
        format_points(flex.delta)
    )
}

/// First rule names the leading driver's segment against the others
fn driver_rule(summary: &ValuationSummary) -> String {
    let Some(lead) = summary.driver_highlights.first() else {
        return "Reference at least two growth drivers by name, tying their growth rates to the valuation."
            .to_string();
    };

    let others: Vec<&str> = summary
        .segment_snapshots
        .iter()
        .map(|s| s.name.as_str())
        .filter(|name| *name != lead.segment)
        .collect();

    if others.is_empty() {
        format!(
            "Reference at least two {} drivers (e.g., {}) by name, tying their growth rates to the valuation.",
            lead.segment, lead.component
        )
    } else {
        format!(
            "Reference at least one {} driver (e.g., {}) and one {} driver by name, tying their growth rates to the valuation.",
            lead.segment,
            lead.component,
            others.join(" or ")
        )
    }
}

/// Build the commentary prompt for a priced scenario. `flexed` lists the
/// components the user moved away from base; it may be empty.
pub fn build_prompt(summary: &ValuationSummary, flexed: &[FlexHighlight]) -> NarrativePrompt {
    let segment_narrative = if summary.segment_snapshots.is_empty() {
        "Segment data unavailable.".to_string()
    } else {
        summary
            .segment_snapshots
            .iter()
            .map(segment_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    let driver_narrative = if summary.driver_highlights.is_empty() {
        "Driver detail unavailable.".to_string()
    } else {
        summary
            .driver_highlights
            .iter()
            .map(driver_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    let flex_section = if flexed.is_empty() {
        String::new()
    } else {
        format!(
            "\nUser adjustments vs base:\n{}\n",
            flexed.iter().map(flex_line).collect::<Vec<_>>().join("\n")
        )
    };

    let user = format!(
        "You are drafting a two-sentence DCF commentary for {name} ({symbol}) that must feel bespoke to the provided drivers.
Fair value: ${fair:.2} | Current price: ${price:.2} | Implied upside: {upside:.1}%
Enterprise value: {ev}T | WACC: {wacc} | Terminal growth: {tg}

Segment mix and growth posture:
{segments}

Largest revenue contributors and transcripts:
{drivers}
{flex}
Rules:
1. {rule}
2. Explicitly mention how the highlighted growth tweaks flow through to the DCF (fair value or upside).
3. Keep it to two, at most three, tightly-written sentences in a professional sell-side tone.",
        name = summary.company_name,
        symbol = summary.symbol,
        fair = summary.fair_value,
        price = summary.current_price,
        upside = summary.implied_upside * 100.0,
        ev = format_dollars(summary.enterprise_value / 1000.0),
        wacc = format_percent(summary.wacc, 1),
        tg = format_percent(summary.terminal_growth, 1),
        segments = segment_narrative,
        drivers = driver_narrative,
        flex = flex_section,
        rule = driver_rule(summary),
    );

    NarrativePrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
