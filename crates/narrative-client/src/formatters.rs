//! Number formatting for prompts. Revenue figures are in billions.

/// `$120.8B`, or `$1.2T` once the value reaches a thousand billion
pub fn format_currency(value: f64, decimals: usize) -> String {
    if value >= 1000.0 {
        format!("${:.*}T", decimals, value / 1000.0)
    } else {
        format!("${:.*}B", decimals, value)
    }
}

/// `0.133` -> `13.3%`
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

/// US-dollar amount with thousands separators and one decimal: `$1,234.5`
pub fn format_dollars(value: f64) -> String {
    let formatted = format!("{:.1}", value.abs());
    let (whole, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "0"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted != "0.0" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac)
}

/// Percentage-point change with an explicit sign: `+1.5` / `-33.0`
pub fn format_points(delta: f64) -> String {
    let pts = delta * 100.0;
    if pts >= 0.0 {
        format!("+{:.1}", pts)
    } else {
        format!("{:.1}", pts)
    }
}
