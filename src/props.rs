//! Property Projector - Configuration to widget props.
//!
//! The embedded widget takes a flat property bag keyed by its own camelCase
//! names. [`project`] copies every present configuration field into such a bag
//! and leaves absent fields out entirely: an explicit empty entry would defeat
//! the widget's default detection, so the key must not exist at all.
//!
//! ```ignore
//! let config = PivotConfig::new().with_rows(["A"]).with_aggregator("Count");
//! let props = project(&config);
//!
//! assert!(props.contains_key("rows"));
//! assert!(!props.contains_key("cols")); // absent, not null
//! ```
//!
//! The interactive bridge uses [`project_interactive`], which appends the
//! `onChange` callback.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::trace;
use serde_json::{Map, Value};

use crate::types::{ConfigFields, Dataset, Derivation, PivotConfig, PivotState, Sorter};

// =============================================================================
// Callback Types
// =============================================================================

/// Cleanup function returned by bindings and subscriptions.
pub type Cleanup = Box<dyn FnOnce()>;

/// Change callback handed to the widget.
///
/// Rc so the widget can keep a clone across renders.
pub type OnChange = Rc<dyn Fn(PivotState)>;

/// Widget key of the change callback.
pub const ON_CHANGE_KEY: &str = "onChange";

// =============================================================================
// Prop
// =============================================================================

/// One entry of a [`PropertyBag`].
#[derive(Clone)]
pub enum Prop {
    /// The dataset (shared, never copied).
    Data(Dataset),
    /// Any JSON-representable field.
    Value(Value),
    /// Per-field comparison functions.
    Sorters(BTreeMap<String, Sorter>),
    /// Per-field derivation functions.
    Derivations(BTreeMap<String, Derivation>),
    /// The change callback (interactive bridge only).
    OnChange(OnChange),
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Data(data) => write!(f, "Data({} records)", data.len()),
            Prop::Value(value) => write!(f, "Value({value})"),
            Prop::Sorters(map) => f.debug_tuple("Sorters").field(&map.keys().collect::<Vec<_>>()).finish(),
            Prop::Derivations(map) => f.debug_tuple("Derivations").field(&map.keys().collect::<Vec<_>>()).finish(),
            Prop::OnChange(_) => f.write_str("OnChange(..)"),
        }
    }
}

// =============================================================================
// PropertyBag
// =============================================================================

/// The property set the embedded widget renders from.
#[derive(Clone, Default, Debug)]
pub struct PropertyBag {
    entries: BTreeMap<String, Prop>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, prop: Prop) {
        self.entries.insert(key.into(), prop);
    }

    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// JSON value under `key`, if it is a plain value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key) {
            Some(Prop::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&Dataset> {
        match self.entries.get("data") {
            Some(Prop::Data(data)) => Some(data),
            _ => None,
        }
    }

    /// The change callback, if this bag came from the interactive bridge.
    pub fn on_change(&self) -> Option<OnChange> {
        match self.entries.get(ON_CHANGE_KEY) {
            Some(Prop::OnChange(callback)) => Some(callback.clone()),
            _ => None,
        }
    }

    /// Rebuild the configuration this bag describes (the callback is dropped).
    ///
    /// Widgets use this to report their full state through `onChange`.
    pub fn to_state(&self) -> Result<PivotState, serde_json::Error> {
        let mut values = Map::new();
        for (key, prop) in &self.entries {
            if let Prop::Value(value) = prop {
                values.insert(key.clone(), value.clone());
            }
        }

        let mut state: PivotState = serde_json::from_value(Value::Object(values))?;
        for (key, prop) in &self.entries {
            match prop {
                Prop::Data(data) if key == "data" => state.data = Some(data.clone()),
                Prop::Sorters(map) => state.sorters = Some(map.clone()),
                Prop::Derivations(map) => state.derived_attributes = Some(map.clone()),
                _ => {}
            }
        }
        Ok(state)
    }
}

// =============================================================================
// Projection
// =============================================================================

fn strings(items: &[String]) -> Prop {
    Prop::Value(Value::from(items.to_vec()))
}

/// Project a configuration into the widget's property bag.
///
/// Absent fields produce no key. Does not touch `config`.
pub fn project(config: &PivotConfig) -> PropertyBag {
    let mut bag = PropertyBag::new();

    if let Some(data) = &config.data {
        bag.insert("data", Prop::Data(data.clone()));
    }
    if let Some(rows) = &config.rows {
        bag.insert("rows", strings(rows));
    }
    if let Some(cols) = &config.cols {
        bag.insert("cols", strings(cols));
    }
    if let Some(vals) = &config.vals {
        bag.insert("vals", strings(vals));
    }
    if let Some(name) = &config.aggregator_name {
        bag.insert("aggregatorName", Prop::Value(Value::from(name.as_str())));
    }
    if let Some(name) = &config.renderer_name {
        bag.insert("rendererName", Prop::Value(Value::from(name.as_str())));
    }
    if let Some(filter) = &config.value_filter {
        let filter: Map<String, Value> = filter
            .iter()
            .map(|(field, values)| {
                let values: Map<String, Value> = values
                    .iter()
                    .map(|(value, included)| (value.clone(), Value::Bool(*included)))
                    .collect();
                (field.clone(), Value::Object(values))
            })
            .collect();
        bag.insert("valueFilter", Prop::Value(Value::Object(filter)));
    }
    if let Some(sorters) = &config.sorters {
        bag.insert("sorters", Prop::Sorters(sorters.clone()));
    }
    if let Some(derived) = &config.derived_attributes {
        bag.insert("derivedAttributes", Prop::Derivations(derived.clone()));
    }
    if let Some(hidden) = &config.hidden_attributes {
        bag.insert("hiddenAttributes", strings(hidden));
    }
    if let Some(hidden) = &config.hidden_from_aggregators {
        bag.insert("hiddenFromAggregators", strings(hidden));
    }
    if let Some(hidden) = &config.hidden_from_drag_drop {
        bag.insert("hiddenFromDragDrop", strings(hidden));
    }
    if let Some(limit) = &config.menu_limit {
        bag.insert("menuLimit", Prop::Value(Value::Number(limit.clone())));
    }
    if let Some(cutoff) = &config.unused_orientation_cutoff {
        bag.insert("unusedOrientationCutoff", Prop::Value(Value::Number(cutoff.clone())));
    }

    // Known keys always come from the typed fields above.
    for (key, value) in &config.extra {
        if ConfigFields::is_known_key(key) || key == ON_CHANGE_KEY || value.is_null() {
            continue;
        }
        bag.insert(key.clone(), Prop::Value(value.clone()));
    }

    trace!("projected {} props: {:?}", bag.len(), bag.keys().collect::<Vec<_>>());
    bag
}

/// Project for the interactive bridge: [`project`] plus the change callback.
pub fn project_interactive(config: &PivotConfig, on_change: OnChange) -> PropertyBag {
    let mut bag = project(config);
    bag.insert(ON_CHANGE_KEY, Prop::OnChange(on_change));
    bag
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregatorName, Record};
    use serde_json::json;
    use std::cell::RefCell;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_project_scenario_keys() {
        let config = PivotConfig::new()
            .with_data(vec![record(json!({"A": 1}))])
            .with_rows(["A"])
            .with_aggregator(AggregatorName::Count);

        let bag = project(&config);
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["aggregatorName", "data", "rows"]);
        assert!(!bag.contains_key("cols"));
        assert!(!bag.contains_key("vals"));
        assert!(!bag.contains_key("rendererName"));
    }

    #[test]
    fn test_project_key_present_iff_field_present() {
        let config = PivotConfig::new()
            .with_cols(["B"])
            .with_value_filter("B", [("x", false)])
            .with_sorter("B", |a, b| a.cmp(b))
            .with_derived_attribute("C", |_| Value::Null)
            .with_hidden_from_drag_drop(["Secret"])
            .with_unused_orientation_cutoff(85);

        let bag = project(&config);
        let present = config.present_fields();
        for (field, key) in crate::types::FIELD_KEYS {
            assert_eq!(
                bag.contains_key(key),
                present.contains(field),
                "key {key} presence must follow the field"
            );
        }
    }

    #[test]
    fn test_project_empty_config() {
        let bag = project(&PivotConfig::new());
        assert!(bag.is_empty());
    }

    #[test]
    fn test_project_does_not_mutate_input() {
        let config = PivotConfig::new().with_rows(["A"]).with_extra("x", json!(1));
        let before = config.clone();
        let _ = project(&config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_project_values() {
        let config = PivotConfig::new()
            .with_value_filter("City", [("Boston", true), ("Chicago", false)])
            .with_menu_limit(500)
            .with_renderer("Table Heatmap");

        let bag = project(&config);
        assert_eq!(
            bag.value("valueFilter"),
            Some(&json!({"City": {"Boston": true, "Chicago": false}}))
        );
        assert_eq!(bag.value("menuLimit"), Some(&json!(500)));
        assert_eq!(bag.value("rendererName"), Some(&json!("Table Heatmap")));
    }

    #[test]
    fn test_project_extra_keys() {
        let config = PivotConfig::new()
            .with_extra("plotlyOptions", json!({"width": 900}))
            .with_extra("rows", json!(["shadowed"]))
            .with_extra("gone", Value::Null);

        let bag = project(&config);
        assert_eq!(bag.value("plotlyOptions"), Some(&json!({"width": 900})));
        assert!(!bag.contains_key("rows"), "known keys never come from extra");
        assert!(!bag.contains_key("gone"), "null extras are treated as absent");
    }

    #[test]
    fn test_project_interactive_adds_callback() {
        let seen: Rc<RefCell<Option<PivotState>>> = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();
        let callback: OnChange = Rc::new(move |state| {
            *seen_clone.borrow_mut() = Some(state);
        });

        let bag = project_interactive(&PivotConfig::new().with_rows(["A"]), callback);
        assert!(bag.contains_key(ON_CHANGE_KEY));
        assert!(project(&PivotConfig::new()).on_change().is_none());

        let on_change = bag.on_change().unwrap();
        on_change(PivotConfig::new().with_cols(["B"]));
        assert_eq!(seen.borrow().as_ref().and_then(|s| s.cols.clone()), Some(vec!["B".to_string()]));
    }

    #[test]
    fn test_to_state_keeps_float_knobs() {
        let mut bag = PropertyBag::new();
        bag.insert("menuLimit", Prop::Value(json!(250.5)));
        bag.insert("unusedOrientationCutoff", Prop::Value(json!(85)));

        let state = bag.to_state().unwrap();
        assert_eq!(state.menu_limit.as_ref().and_then(|n| n.as_f64()), Some(250.5));
        assert_eq!(project(&state).value("unusedOrientationCutoff"), Some(&json!(85)));
    }

    #[test]
    fn test_to_state_round_trip() {
        let config = PivotConfig::new()
            .with_data(vec![record(json!({"A": 1, "B": "x"}))])
            .with_rows(["A"])
            .with_cols(["B"])
            .with_aggregator("Sum")
            .with_sorter("A", |a, b| b.cmp(a))
            .with_extra("custom", json!(true));

        let state = project(&config).to_state().unwrap();
        assert_eq!(state, config);
    }
}
