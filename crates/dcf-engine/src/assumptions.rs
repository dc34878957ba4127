use serde::{Deserialize, Serialize};
use valuation_core::{BaseCase, Component, ComponentKey, RateOverrides, Segment};

use crate::aggregation::round_to;
use crate::rates::resolve_rate;

/// Step applied by the per-component and per-segment +/- controls
pub const COMPONENT_RATE_STEP: f64 = 0.01;
/// Step applied by the WACC and terminal growth +/- controls
pub const DISCOUNT_RATE_STEP: f64 = 0.001;
/// Component slider bounds, in percent
pub const SLIDER_MIN_PERCENT: f64 = -5.0;
pub const SLIDER_MAX_PERCENT: f64 = 50.0;
pub const SLIDER_STEP_PERCENT: f64 = 0.5;

/// User-adjustable inputs for one company.
///
/// This is caller-owned state: the engine only ever reads it. Switching
/// companies means building a fresh value from the new base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    #[serde(default)]
    pub overrides: RateOverrides,
    pub wacc: f64,
    pub terminal_growth: f64,
}

impl Assumptions {
    pub fn from_base_case(base: &BaseCase) -> Self {
        Self {
            overrides: RateOverrides::new(),
            wacc: base.wacc,
            terminal_growth: base.terminal_growth,
        }
    }

    pub fn effective_rate(&self, segment: &Segment, component: &Component) -> f64 {
        resolve_rate(&self.overrides, &segment.id, component)
    }

    pub fn set_rate(&mut self, key: ComponentKey, rate: f64) {
        self.overrides.insert(key, rate);
    }

    /// Slider input in percent, snapped to the slider step and clamped to
    /// its bounds
    pub fn set_slider_rate(&mut self, key: ComponentKey, percent: f64) -> f64 {
        let snapped = (percent / SLIDER_STEP_PERCENT).round() * SLIDER_STEP_PERCENT;
        let rate = round_to(snapped.clamp(SLIDER_MIN_PERCENT, SLIDER_MAX_PERCENT) / 100.0, 4);
        self.overrides.insert(key, rate);
        rate
    }

    /// Nudge one component's effective rate, stored to 3 decimals
    pub fn adjust_component(&mut self, segment: &Segment, component: &Component, delta: f64) -> f64 {
        let rate = round_to(self.effective_rate(segment, component) + delta, 3);
        self.overrides.insert(segment.key_for(component), rate);
        rate
    }

    /// Nudge every component of a segment by the same delta
    pub fn apply_segment_delta(&mut self, segment: &Segment, delta: f64) {
        for component in &segment.components {
            self.adjust_component(segment, component, delta);
        }
    }

    pub fn reset_component(&mut self, key: &ComponentKey) {
        self.overrides.remove(key);
    }

    pub fn reset_segment(&mut self, segment: &Segment) {
        for component in &segment.components {
            self.reset_component(&segment.key_for(component));
        }
    }

    /// Stored to 4 decimals
    pub fn adjust_wacc(&mut self, delta: f64) -> f64 {
        self.wacc = round_to(self.wacc + delta, 4);
        self.wacc
    }

    /// Stored to 4 decimals
    pub fn adjust_terminal_growth(&mut self, delta: f64) -> f64 {
        self.terminal_growth = round_to(self.terminal_growth + delta, 4);
        self.terminal_growth
    }

    /// Back to the base case with no overrides
    pub fn reset(&mut self, base: &BaseCase) {
        *self = Self::from_base_case(base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_case() -> BaseCase {
        BaseCase {
            wacc: 0.089,
            terminal_growth: 0.035,
            cash: 80.0,
            debt: 75.0,
            shares_outstanding: 7.43,
            fcf_margins: vec![0.255],
            published_fair_value: None,
            published_projections: vec![],
        }
    }

    fn segment() -> Segment {
        Segment {
            id: "productivity".to_string(),
            name: "Productivity".to_string(),
            fy2025_revenue: 120.8,
            fy2024_revenue: 107.0,
            growth_rate: 0.13,
            operating_margin: 0.55,
            percent_of_total: 42.9,
            components: vec![
                Component {
                    name: "Office Commercial".to_string(),
                    revenue: 60.0,
                    growth_rate: 0.13,
                    description: None,
                },
                Component {
                    name: "LinkedIn".to_string(),
                    revenue: 20.0,
                    growth_rate: 0.10,
                    description: None,
                },
            ],
            growth_drivers: vec![],
            challenges: vec![],
        }
    }

    #[test]
    fn test_adjust_component_rounds_to_three_decimals() {
        let mut a = Assumptions::from_base_case(&base_case());
        let seg = segment();

        let rate = a.adjust_component(&seg, &seg.components[0], COMPONENT_RATE_STEP);
        assert_eq!(rate, 0.14);
        let rate = a.adjust_component(&seg, &seg.components[0], COMPONENT_RATE_STEP);
        assert_eq!(rate, 0.15);
        assert_eq!(a.effective_rate(&seg, &seg.components[1]), 0.10);
    }

    #[test]
    fn test_segment_delta_and_reset() {
        let mut a = Assumptions::from_base_case(&base_case());
        let seg = segment();

        a.apply_segment_delta(&seg, -COMPONENT_RATE_STEP);
        assert_eq!(a.effective_rate(&seg, &seg.components[0]), 0.12);
        assert_eq!(a.effective_rate(&seg, &seg.components[1]), 0.09);
        assert_eq!(a.overrides.len(), 2);

        a.reset_segment(&seg);
        assert!(a.overrides.is_empty());
        assert_eq!(a.effective_rate(&seg, &seg.components[0]), 0.13);
    }

    #[test]
    fn test_reset_component_leaves_other_overrides() {
        let mut a = Assumptions::from_base_case(&base_case());
        let seg = segment();
        a.adjust_component(&seg, &seg.components[0], 0.02);
        a.adjust_component(&seg, &seg.components[1], 0.02);

        a.reset_component(&seg.key_for(&seg.components[0]));
        assert_eq!(a.overrides.len(), 1);
        assert_eq!(a.effective_rate(&seg, &seg.components[0]), 0.13);
        assert_eq!(a.effective_rate(&seg, &seg.components[1]), 0.12);
    }

    #[test]
    fn test_discount_steps_round_to_four_decimals() {
        let mut a = Assumptions::from_base_case(&base_case());
        for _ in 0..3 {
            a.adjust_wacc(DISCOUNT_RATE_STEP);
        }
        assert_eq!(a.wacc, 0.092);

        a.adjust_terminal_growth(-DISCOUNT_RATE_STEP);
        assert_eq!(a.terminal_growth, 0.034);

        a.reset(&base_case());
        assert_eq!(a.wacc, 0.089);
        assert_eq!(a.terminal_growth, 0.035);
    }

    #[test]
    fn test_slider_clamps_to_bounds() {
        let mut a = Assumptions::from_base_case(&base_case());
        let key = ComponentKey::new("productivity", "LinkedIn");

        assert_eq!(a.set_slider_rate(key.clone(), 75.0), 0.5);
        assert_eq!(a.set_slider_rate(key.clone(), -20.0), -0.05);
        assert_eq!(a.set_slider_rate(key.clone(), 12.5), 0.125);
        assert_eq!(a.set_slider_rate(key, 12.7), 0.125);
    }
}
