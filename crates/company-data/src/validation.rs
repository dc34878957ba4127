use std::collections::HashSet;

use valuation_core::{CompanyModel, KEY_SEPARATOR};

use crate::error::{DatasetError, DatasetResult};

fn invalid(company: &CompanyModel, reason: impl Into<String>) -> DatasetError {
    DatasetError::Invalid {
        symbol: company.symbol.clone(),
        reason: reason.into(),
    }
}

fn check_label(company: &CompanyModel, what: &str, label: &str) -> DatasetResult<()> {
    if label.trim().is_empty() {
        return Err(invalid(company, format!("{} must not be empty", what)));
    }
    if label.contains(KEY_SEPARATOR) {
        return Err(invalid(
            company,
            format!("{} '{}' must not contain '{}'", what, label, KEY_SEPARATOR),
        ));
    }
    Ok(())
}

fn check_finite(company: &CompanyModel, what: &str, value: f64) -> DatasetResult<()> {
    if !value.is_finite() {
        return Err(invalid(company, format!("{} is not a finite number", what)));
    }
    Ok(())
}

/// Reject datasets the engine could not price or key unambiguously.
pub fn validate(company: &CompanyModel) -> DatasetResult<()> {
    if company.symbol.trim().is_empty() {
        return Err(invalid(company, "symbol must not be empty"));
    }
    if company.segments.is_empty() {
        return Err(invalid(company, "at least one segment is required"));
    }

    let mut segment_ids = HashSet::new();
    for segment in &company.segments {
        check_label(company, "segment id", &segment.id)?;
        if !segment_ids.insert(segment.id.as_str()) {
            return Err(invalid(company, format!("duplicate segment id '{}'", segment.id)));
        }
        if segment.components.is_empty() {
            return Err(invalid(company, format!("segment '{}' has no components", segment.id)));
        }

        let mut names = HashSet::new();
        for component in &segment.components {
            check_label(company, "component name", &component.name)?;
            if !names.insert(component.name.as_str()) {
                return Err(invalid(
                    company,
                    format!("duplicate component '{}' in segment '{}'", component.name, segment.id),
                ));
            }
            check_finite(company, &format!("{} revenue", component.name), component.revenue)?;
            check_finite(company, &format!("{} growth rate", component.name), component.growth_rate)?;
            if component.revenue < 0.0 {
                return Err(invalid(company, format!("{} revenue is negative", component.name)));
            }
            if component.growth_rate <= -1.0 {
                return Err(invalid(
                    company,
                    format!("{} growth rate must exceed -100%", component.name),
                ));
            }
        }
    }

    let base = &company.base_case;
    check_finite(company, "wacc", base.wacc)?;
    check_finite(company, "terminal growth", base.terminal_growth)?;
    check_finite(company, "cash", base.cash)?;
    check_finite(company, "debt", base.debt)?;
    if base.wacc <= base.terminal_growth {
        return Err(invalid(company, "wacc must exceed terminal growth"));
    }
    if !(base.shares_outstanding.is_finite() && base.shares_outstanding > 0.0) {
        return Err(invalid(company, "shares outstanding must be positive"));
    }
    for (i, margin) in base.fcf_margins.iter().enumerate() {
        check_finite(company, &format!("fcf margin [{}]", i), *margin)?;
    }
    for year in &base.published_projections {
        check_finite(company, &format!("published fcf {}", year.year), year.fcf)?;
    }
    check_finite(company, "current price", company.market_data.current_price)?;

    for insight in &company.transcript_insights {
        if company.component(&insight.key()).is_none() {
            tracing::warn!(
                symbol = %company.symbol,
                key = %insight.key(),
                "Transcript insight does not match any component"
            );
        }
    }

    Ok(())
}
