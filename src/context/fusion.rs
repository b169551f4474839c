//! Additive fusion of contextual adjustments into forecast inputs.

use crate::context::ContextualAdjustment;
use crate::core::Indicators;

/// Merge adjustment deltas into a base indicator bundle.
///
/// Simple additive fusion: each delta whose key names an indicator that
/// is present in `base` is added to it. Keys absent from the base
/// (unknown names, and indicators without a value) are dropped, not
/// injected. No clamping happens here; the simulator's drift clamp
/// bounds out-of-range values on the first step when hardening is
/// enabled.
pub fn fuse(base: &Indicators, adjustment: &ContextualAdjustment) -> Indicators {
    let mut fused = base.clone();
    for (name, delta) in &adjustment.deltas {
        if base.get(name).is_some() {
            fused.add(name, *delta);
        } else {
            log::debug!("dropping adjustment delta for absent indicator {name}");
        }
    }
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AdjustmentTier;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn adjustment(deltas: &[(&str, f64)]) -> ContextualAdjustment {
        ContextualAdjustment {
            deltas: deltas
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
            rationale: "test".to_string(),
            confidence: 0.6,
            tier: AdjustmentTier::RuleBased,
        }
    }

    #[test]
    fn known_keys_are_added_and_unknown_keys_dropped() {
        let base = Indicators {
            birth_rate: Some(14.8),
            ..Default::default()
        };
        let fused = fuse(&base, &adjustment(&[("birthRate", 0.3), ("unknownKey", 1.0)]));

        assert_relative_eq!(fused.birth_rate.unwrap(), 15.1);
        // The unknown key left every other field untouched.
        assert_eq!(
            Indicators {
                birth_rate: fused.birth_rate,
                ..Default::default()
            },
            fused
        );
    }

    #[test]
    fn absent_indicators_are_not_injected() {
        let base = Indicators {
            birth_rate: Some(14.8),
            ..Default::default()
        };
        let fused = fuse(&base, &adjustment(&[("deathRate", 0.5)]));
        assert_eq!(fused.death_rate, None);
        assert_eq!(fused, base);
    }

    #[test]
    fn negative_deltas_apply_without_clamping() {
        let base = Indicators {
            death_rate: Some(0.2),
            ..Default::default()
        };
        let fused = fuse(&base, &adjustment(&[("deathRate", -0.5)]));
        // Fusion itself never clamps; physically impossible values are
        // bounded later by the drift clamp.
        assert_relative_eq!(fused.death_rate.unwrap(), -0.3);
    }

    #[test]
    fn empty_adjustment_is_identity() {
        let base = Indicators {
            birth_rate: Some(14.8),
            gdp_per_capita: Some(4300.0),
            ..Default::default()
        };
        let fused = fuse(&base, &ContextualAdjustment::no_op("nothing"));
        assert_eq!(fused, base);
    }
}
