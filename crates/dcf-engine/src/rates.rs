use valuation_core::{Component, ComponentKey, RateOverrides};

/// Effective growth rate for a component: the override for its key when one
/// exists, otherwise the component's base rate.
pub fn resolve_rate(overrides: &RateOverrides, segment_id: &str, component: &Component) -> f64 {
    overrides
        .get(&ComponentKey::new(segment_id, component.name.as_str()))
        .unwrap_or(component.growth_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, rate: f64) -> Component {
        Component {
            name: name.to_string(),
            revenue: 10.0,
            growth_rate: rate,
            description: None,
        }
    }

    #[test]
    fn test_absent_key_uses_base_rate() {
        let overrides = RateOverrides::new();
        assert_eq!(resolve_rate(&overrides, "cloud", &component("Azure", 0.33)), 0.33);
    }

    #[test]
    fn test_override_wins_regardless_of_base() {
        let mut overrides = RateOverrides::new();
        overrides.insert(ComponentKey::new("cloud", "Azure"), 0.0);
        overrides.insert(ComponentKey::new("cloud", "GitHub"), 0.25);

        assert_eq!(resolve_rate(&overrides, "cloud", &component("Azure", 0.33)), 0.0);
        // Override identical to base is indistinguishable from no override
        assert_eq!(resolve_rate(&overrides, "cloud", &component("GitHub", 0.25)), 0.25);
    }

    #[test]
    fn test_override_is_scoped_to_segment() {
        let mut overrides = RateOverrides::new();
        overrides.insert(ComponentKey::new("cloud", "Services"), 0.40);

        assert_eq!(resolve_rate(&overrides, "devices", &component("Services", 0.02)), 0.02);
    }
}
