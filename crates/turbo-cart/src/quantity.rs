//! Numeric quantity input with step buttons.
//!
//! A [`QuantityControl`] is the headless model of the `- [ n ] +` widget shown
//! next to every cart row. It clamps every typed or stepped value into
//! `[1, max]` and reports what happened as a [`QuantityEvent`]; the
//! presentation layer forwards those events to the sync coordinator.

use serde::{Deserialize, Serialize};

/// Clamp a candidate quantity.
///
/// Values above a configured maximum become the maximum, anything below 1
/// becomes 1. A maximum below 1 is treated as 1.
pub fn clamp_quantity(value: i64, max: Option<i64>) -> i64 {
    match max {
        Some(max) if value > max => max.max(1),
        _ if value < 1 => 1,
        _ => value,
    }
}

/// Coerce typed text into an integer.
///
/// Decimal input truncates toward zero; empty or non-numeric input is 0.
pub fn parse_quantity(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return value;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

/// What the control reported after an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QuantityEvent {
    /// A keystroke changed the text; carries the clamped value.
    Typed(i64),
    /// The `+` button; carries the clamped value.
    Increased(i64),
    /// The `-` button; carries the clamped value.
    Decreased(i64),
    /// The input lost focus; carries the value shown at that moment.
    FocusOut(i64),
}

impl QuantityEvent {
    pub fn value(&self) -> i64 {
        match *self {
            QuantityEvent::Typed(v)
            | QuantityEvent::Increased(v)
            | QuantityEvent::Decreased(v)
            | QuantityEvent::FocusOut(v) => v,
        }
    }

    /// Whether this event asks for a commit rather than local feedback.
    pub fn is_commit(&self) -> bool {
        !matches!(self, QuantityEvent::Typed(_))
    }
}

/// Headless quantity input.
///
/// The shown value comes from the controlled value when the owner supplies
/// a non-zero one, and from the control's own fallback value otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityControl {
    value: Option<i64>,
    local: i64,
    max: Option<i64>,
    disabled: bool,
}

impl QuantityControl {
    /// An uncontrolled control starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self {
            value: None,
            local: initial,
            max: None,
            disabled: false,
        }
    }

    /// A control whose value is owned by the caller.
    pub fn controlled(value: i64) -> Self {
        Self {
            value: Some(value),
            ..Self::new(value)
        }
    }

    pub fn with_max(mut self, max: Option<i64>) -> Self {
        self.max = max;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Update the controlled value, e.g. after the owner accepted an event.
    pub fn set_value(&mut self, value: Option<i64>) {
        self.value = value;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn max(&self) -> Option<i64> {
        self.max
    }

    /// The value currently shown in the input.
    pub fn value(&self) -> i64 {
        match self.value {
            Some(v) if v != 0 => v,
            _ => self.local,
        }
    }

    /// Replace the input text.
    pub fn type_text(&mut self, raw: &str) -> Option<QuantityEvent> {
        if self.disabled {
            return None;
        }
        let value = clamp_quantity(parse_quantity(raw), self.max);
        self.local = value;
        Some(QuantityEvent::Typed(value))
    }

    /// Press `+`.
    pub fn increase(&mut self) -> Option<QuantityEvent> {
        self.step(1).map(QuantityEvent::Increased)
    }

    /// Press `-`.
    pub fn decrease(&mut self) -> Option<QuantityEvent> {
        self.step(-1).map(QuantityEvent::Decreased)
    }

    /// Blur the input.
    pub fn focus_out(&self) -> Option<QuantityEvent> {
        if self.disabled {
            return None;
        }
        Some(QuantityEvent::FocusOut(self.value()))
    }

    fn step(&mut self, delta: i64) -> Option<i64> {
        if self.disabled {
            return None;
        }
        let value = clamp_quantity(self.value().saturating_add(delta), self.max);
        self.local = value;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_rules() {
        assert_eq!(clamp_quantity(7, Some(5)), 5);
        assert_eq!(clamp_quantity(0, Some(5)), 1);
        assert_eq!(clamp_quantity(-3, None), 1);
        assert_eq!(clamp_quantity(3, None), 3);
        assert_eq!(clamp_quantity(4, Some(0)), 1);
    }

    #[test]
    fn test_parse_quantity_coercion() {
        assert_eq!(parse_quantity("12"), 12);
        assert_eq!(parse_quantity(" 3 "), 3);
        assert_eq!(parse_quantity("2.9"), 2);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity("NaN"), 0);
    }

    #[test]
    fn test_typing_clamps_and_reports() {
        let mut control = QuantityControl::new(1).with_max(Some(10));
        assert_eq!(control.type_text("25"), Some(QuantityEvent::Typed(10)));
        assert_eq!(control.value(), 10);
        assert_eq!(control.type_text("x"), Some(QuantityEvent::Typed(1)));
        assert_eq!(control.value(), 1);
    }

    #[test]
    fn test_increase_stops_at_max() {
        let mut control = QuantityControl::new(4).with_max(Some(5));
        assert_eq!(control.increase(), Some(QuantityEvent::Increased(5)));
        assert_eq!(control.increase(), Some(QuantityEvent::Increased(5)));
    }

    #[test]
    fn test_decrease_stops_at_one() {
        let mut control = QuantityControl::new(2);
        assert_eq!(control.decrease(), Some(QuantityEvent::Decreased(1)));
        assert_eq!(control.decrease(), Some(QuantityEvent::Decreased(1)));
    }

    #[test]
    fn test_controlled_value_wins_over_local() {
        let mut control = QuantityControl::controlled(3);
        control.type_text("8");
        assert_eq!(control.value(), 3);

        control.set_value(Some(8));
        assert_eq!(control.increase(), Some(QuantityEvent::Increased(9)));

        control.set_value(None);
        assert_eq!(control.value(), 9);
    }

    #[test]
    fn test_focus_out_reports_shown_value_unclamped() {
        let control = QuantityControl::controlled(12).with_max(Some(5));
        assert_eq!(control.focus_out(), Some(QuantityEvent::FocusOut(12)));
    }

    #[test]
    fn test_disabled_control_ignores_interaction() {
        let mut control = QuantityControl::controlled(2).with_disabled(true);
        assert_eq!(control.increase(), None);
        assert_eq!(control.decrease(), None);
        assert_eq!(control.type_text("4"), None);
        assert_eq!(control.focus_out(), None);
        assert_eq!(control.value(), 2);

        control.set_disabled(false);
        assert!(control.increase().is_some());
    }

    #[test]
    fn test_event_kind() {
        assert!(!QuantityEvent::Typed(2).is_commit());
        assert!(QuantityEvent::FocusOut(2).is_commit());
        assert_eq!(QuantityEvent::Decreased(4).value(), 4);
    }

    proptest! {
        #[test]
        fn clamp_stays_within_bounds(value in any::<i64>(), max in 1i64..10_000) {
            let clamped = clamp_quantity(value, Some(max));
            prop_assert!((1..=max).contains(&clamped));
        }

        #[test]
        fn clamp_without_max_is_at_least_one(value in any::<i64>()) {
            prop_assert!(clamp_quantity(value, None) >= 1);
        }

        #[test]
        fn stepping_never_leaves_bounds(start in 1i64..50, max in 1i64..50, ups in 0usize..60) {
            let mut control = QuantityControl::new(start.min(max)).with_max(Some(max));
            for _ in 0..ups {
                let v = control.increase().map(|e| e.value()).unwrap_or(0);
                prop_assert!((1..=max).contains(&v));
            }
        }
    }
}
