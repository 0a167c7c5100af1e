//! Core types for spark-pivot.
//!
//! This module defines the configuration model that flows through a bridge:
//! the dataset, the axis assignments, the aggregator/renderer selectors and the
//! optional tuning knobs the embedded widget understands.
//!
//! Every field of [`PivotConfig`] is optional. `None` means "absent" and is
//! never forwarded to the widget, so the widget's own defaults apply.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

// =============================================================================
// Dataset
// =============================================================================

/// One uniform record of the dataset (field name → raw value).
pub type Record = Map<String, Value>;

/// The dataset. Shared immutably so snapshots are cheap and nobody can mutate
/// another party's copy.
pub type Dataset = Rc<Vec<Record>>;

/// Per-field comparison function used for sort order.
pub type Sorter = Rc<dyn Fn(&str, &str) -> Ordering>;

/// Per-field derivation computing a synthetic field from a record.
pub type Derivation = Rc<dyn Fn(&Record) -> Value>;

/// Per-field value filter (field → raw value → included).
pub type ValueFilter = BTreeMap<String, BTreeMap<String, bool>>;

/// The widget's self-reported state. Same shape as the configuration; the
/// bridge treats it as an opaque, authoritative record.
pub type PivotState = PivotConfig;

/// Parse a JSON array of objects into a [`Dataset`].
pub fn dataset_from_json(value: Value) -> Result<Dataset, serde_json::Error> {
    let records: Vec<Record> = serde_json::from_value(value)?;
    Ok(Rc::new(records))
}

// =============================================================================
// Named selectors
// =============================================================================

/// Declares an enum-like string selector with a `Custom` escape hatch.
macro_rules! named_selector {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A name registered by a widget plugin.
            Custom(String),
        }

        impl $name {
            /// Every built-in selector, in menu order.
            pub const BUILTIN: &'static [$name] = &[$($name::$variant),+];

            /// The label the widget expects.
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Custom(label) => label,
                }
            }

            /// Whether this is one of the built-in selectors.
            pub fn is_builtin(&self) -> bool {
                !matches!(self, $name::Custom(_))
            }
        }

        impl From<&str> for $name {
            fn from(label: &str) -> Self {
                match label {
                    $($label => $name::$variant,)+
                    other => $name::Custom(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                $name::from(label.as_str())
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                match name {
                    $name::Custom(label) => label,
                    builtin => builtin.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_selector! {
    /// Aggregation applied to the value axis.
    AggregatorName {
        Count => "Count",
        CountUniqueValues => "Count Unique Values",
        ListUniqueValues => "List Unique Values",
        Sum => "Sum",
        IntegerSum => "Integer Sum",
        Average => "Average",
        Median => "Median",
        SampleVariance => "Sample Variance",
        SampleStandardDeviation => "Sample Standard Deviation",
        Minimum => "Minimum",
        Maximum => "Maximum",
        First => "First",
        Last => "Last",
        SumOverSum => "Sum over Sum",
        SumFractionOfTotal => "Sum as Fraction of Total",
        SumFractionOfRows => "Sum as Fraction of Rows",
        SumFractionOfColumns => "Sum as Fraction of Columns",
        CountFractionOfTotal => "Count as Fraction of Total",
        CountFractionOfRows => "Count as Fraction of Rows",
        CountFractionOfColumns => "Count as Fraction of Columns",
    }
}

impl Default for AggregatorName {
    fn default() -> Self {
        Self::Count
    }
}

named_selector! {
    /// Output renderer (table or chart flavour).
    RendererName {
        Table => "Table",
        TableHeatmap => "Table Heatmap",
        TableColHeatmap => "Table Col Heatmap",
        TableRowHeatmap => "Table Row Heatmap",
        GroupedColumnChart => "Grouped Column Chart",
        StackedColumnChart => "Stacked Column Chart",
        GroupedBarChart => "Grouped Bar Chart",
        StackedBarChart => "Stacked Bar Chart",
        LineChart => "Line Chart",
        DotChart => "Dot Chart",
        AreaChart => "Area Chart",
        ScatterChart => "Scatter Chart",
        MultiplePieChart => "Multiple Pie Chart",
    }
}

// =============================================================================
// Field set (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Set of configuration fields, used to describe which fields are present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigFields: u16 {
        const DATA = 1 << 0;
        const ROWS = 1 << 1;
        const COLS = 1 << 2;
        const VALS = 1 << 3;
        const AGGREGATOR_NAME = 1 << 4;
        const RENDERER_NAME = 1 << 5;
        const VALUE_FILTER = 1 << 6;
        const SORTERS = 1 << 7;
        const DERIVED_ATTRIBUTES = 1 << 8;
        const HIDDEN_ATTRIBUTES = 1 << 9;
        const HIDDEN_FROM_AGGREGATORS = 1 << 10;
        const HIDDEN_FROM_DRAG_DROP = 1 << 11;
        const MENU_LIMIT = 1 << 12;
        const UNUSED_ORIENTATION_CUTOFF = 1 << 13;
    }
}

/// Widget property key for each field, in projection order.
pub const FIELD_KEYS: [(ConfigFields, &str); 14] = [
    (ConfigFields::DATA, "data"),
    (ConfigFields::ROWS, "rows"),
    (ConfigFields::COLS, "cols"),
    (ConfigFields::VALS, "vals"),
    (ConfigFields::AGGREGATOR_NAME, "aggregatorName"),
    (ConfigFields::RENDERER_NAME, "rendererName"),
    (ConfigFields::VALUE_FILTER, "valueFilter"),
    (ConfigFields::SORTERS, "sorters"),
    (ConfigFields::DERIVED_ATTRIBUTES, "derivedAttributes"),
    (ConfigFields::HIDDEN_ATTRIBUTES, "hiddenAttributes"),
    (ConfigFields::HIDDEN_FROM_AGGREGATORS, "hiddenFromAggregators"),
    (ConfigFields::HIDDEN_FROM_DRAG_DROP, "hiddenFromDragDrop"),
    (ConfigFields::MENU_LIMIT, "menuLimit"),
    (ConfigFields::UNUSED_ORIENTATION_CUTOFF, "unusedOrientationCutoff"),
];

impl ConfigFields {
    /// Widget keys of the fields in this set.
    pub fn keys(self) -> impl Iterator<Item = &'static str> {
        FIELD_KEYS
            .into_iter()
            .filter(move |(field, _)| self.contains(*field))
            .map(|(_, key)| key)
    }

    /// Whether `key` names one of the known configuration fields.
    pub fn is_known_key(key: &str) -> bool {
        FIELD_KEYS.iter().any(|(_, known)| *known == key)
    }
}

// =============================================================================
// PivotConfig
// =============================================================================

/// Full set of pivot display/interaction parameters.
///
/// Serializes with the widget's camelCase keys. Absent fields and the
/// function-valued fields (`sorters`, `derived_attributes`) are skipped.
/// Unknown keys are kept in `extra` and forwarded untouched.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Dataset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator_name: Option<AggregatorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer_name: Option<RendererName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_filter: Option<ValueFilter>,
    #[serde(skip)]
    pub sorters: Option<BTreeMap<String, Sorter>>,
    #[serde(skip)]
    pub derived_attributes: Option<BTreeMap<String, Derivation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_from_aggregators: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_from_drag_drop: Option<Vec<String>>,
    /// Any JSON number; integers and floats are kept as given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_limit: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unused_orientation_cutoff: Option<Number>,
    /// Keys the widget manages that the bridge does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl PivotConfig {
    /// Empty configuration (every field absent).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, records: Vec<Record>) -> Self {
        self.data = Some(Rc::new(records));
        self
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.data = Some(dataset);
        self
    }

    pub fn with_rows<I: IntoIterator<Item = S>, S: Into<String>>(mut self, rows: I) -> Self {
        self.rows = Some(strings(rows));
        self
    }

    pub fn with_cols<I: IntoIterator<Item = S>, S: Into<String>>(mut self, cols: I) -> Self {
        self.cols = Some(strings(cols));
        self
    }

    pub fn with_vals<I: IntoIterator<Item = S>, S: Into<String>>(mut self, vals: I) -> Self {
        self.vals = Some(strings(vals));
        self
    }

    pub fn with_aggregator(mut self, name: impl Into<AggregatorName>) -> Self {
        self.aggregator_name = Some(name.into());
        self
    }

    pub fn with_renderer(mut self, name: impl Into<RendererName>) -> Self {
        self.renderer_name = Some(name.into());
        self
    }

    /// Set the inclusion flag for each raw value of `field`.
    pub fn with_value_filter<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let filter = self.value_filter.get_or_insert_with(BTreeMap::new);
        let entry = filter.entry(field.to_string()).or_default();
        for (value, included) in values {
            entry.insert(value.into(), included);
        }
        self
    }

    pub fn with_sorter<F>(mut self, field: &str, sorter: F) -> Self
    where
        F: Fn(&str, &str) -> Ordering + 'static,
    {
        self.sorters
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), Rc::new(sorter));
        self
    }

    pub fn with_derived_attribute<F>(mut self, field: &str, derive: F) -> Self
    where
        F: Fn(&Record) -> Value + 'static,
    {
        self.derived_attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), Rc::new(derive));
        self
    }

    pub fn with_hidden_attributes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.hidden_attributes = Some(strings(fields));
        self
    }

    pub fn with_hidden_from_aggregators<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.hidden_from_aggregators = Some(strings(fields));
        self
    }

    pub fn with_hidden_from_drag_drop<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.hidden_from_drag_drop = Some(strings(fields));
        self
    }

    pub fn with_menu_limit(mut self, limit: impl Into<Number>) -> Self {
        self.menu_limit = Some(limit.into());
        self
    }

    pub fn with_unused_orientation_cutoff(mut self, cutoff: impl Into<Number>) -> Self {
        self.unused_orientation_cutoff = Some(cutoff.into());
        self
    }

    /// Add a key the bridge forwards without interpreting.
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Which known fields are present.
    pub fn present_fields(&self) -> ConfigFields {
        let mut fields = ConfigFields::empty();
        fields.set(ConfigFields::DATA, self.data.is_some());
        fields.set(ConfigFields::ROWS, self.rows.is_some());
        fields.set(ConfigFields::COLS, self.cols.is_some());
        fields.set(ConfigFields::VALS, self.vals.is_some());
        fields.set(ConfigFields::AGGREGATOR_NAME, self.aggregator_name.is_some());
        fields.set(ConfigFields::RENDERER_NAME, self.renderer_name.is_some());
        fields.set(ConfigFields::VALUE_FILTER, self.value_filter.is_some());
        fields.set(ConfigFields::SORTERS, self.sorters.is_some());
        fields.set(ConfigFields::DERIVED_ATTRIBUTES, self.derived_attributes.is_some());
        fields.set(ConfigFields::HIDDEN_ATTRIBUTES, self.hidden_attributes.is_some());
        fields.set(ConfigFields::HIDDEN_FROM_AGGREGATORS, self.hidden_from_aggregators.is_some());
        fields.set(ConfigFields::HIDDEN_FROM_DRAG_DROP, self.hidden_from_drag_drop.is_some());
        fields.set(ConfigFields::MENU_LIMIT, self.menu_limit.is_some());
        fields.set(ConfigFields::UNUSED_ORIENTATION_CUTOFF, self.unused_orientation_cutoff.is_some());
        fields
    }

    /// Overwrite every field that is present in `partial`; keep the rest.
    pub fn merge(&mut self, partial: PivotConfig) {
        fn take<T>(slot: &mut Option<T>, incoming: Option<T>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }

        take(&mut self.data, partial.data);
        take(&mut self.rows, partial.rows);
        take(&mut self.cols, partial.cols);
        take(&mut self.vals, partial.vals);
        take(&mut self.aggregator_name, partial.aggregator_name);
        take(&mut self.renderer_name, partial.renderer_name);
        take(&mut self.value_filter, partial.value_filter);
        take(&mut self.sorters, partial.sorters);
        take(&mut self.derived_attributes, partial.derived_attributes);
        take(&mut self.hidden_attributes, partial.hidden_attributes);
        take(&mut self.hidden_from_aggregators, partial.hidden_from_aggregators);
        take(&mut self.hidden_from_drag_drop, partial.hidden_from_drag_drop);
        take(&mut self.menu_limit, partial.menu_limit);
        take(&mut self.unused_orientation_cutoff, partial.unused_orientation_cutoff);
        self.extra.extend(partial.extra);
    }

    /// Pretty JSON of rows, cols and the selectors. See [`config_summary`].
    pub fn summary(&self) -> String {
        config_summary(Some(self))
    }

    /// Fill the host-side defaults for inputs the host left unset.
    pub fn with_host_defaults(mut self, default_aggregator: &AggregatorName) -> Self {
        if self.aggregator_name.is_none() {
            self.aggregator_name = Some(default_aggregator.clone());
        }
        self
    }
}

impl fmt::Debug for PivotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fn_keys<F: ?Sized>(map: &Option<BTreeMap<String, Rc<F>>>) -> Option<Vec<&str>> {
            map.as_ref().map(|m| m.keys().map(String::as_str).collect())
        }

        f.debug_struct("PivotConfig")
            .field("data", &self.data.as_ref().map(|d| d.len()))
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("vals", &self.vals)
            .field("aggregator_name", &self.aggregator_name)
            .field("renderer_name", &self.renderer_name)
            .field("value_filter", &self.value_filter)
            .field("sorters", &fn_keys(&self.sorters))
            .field("derived_attributes", &fn_keys(&self.derived_attributes))
            .field("hidden_attributes", &self.hidden_attributes)
            .field("hidden_from_aggregators", &self.hidden_from_aggregators)
            .field("hidden_from_drag_drop", &self.hidden_from_drag_drop)
            .field("menu_limit", &self.menu_limit)
            .field("unused_orientation_cutoff", &self.unused_orientation_cutoff)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Function-valued maps compare by identity.
fn same_functions<F: ?Sized>(a: &Option<BTreeMap<String, Rc<F>>>, b: &Option<BTreeMap<String, Rc<F>>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|((ka, fa), (kb, fb))| ka == kb && Rc::ptr_eq(fa, fb))
        }
        _ => false,
    }
}

impl PartialEq for PivotConfig {
    fn eq(&self, other: &Self) -> bool {
        let same_data = match (&self.data, &other.data) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        };

        same_data
            && self.rows == other.rows
            && self.cols == other.cols
            && self.vals == other.vals
            && self.aggregator_name == other.aggregator_name
            && self.renderer_name == other.renderer_name
            && self.value_filter == other.value_filter
            && same_functions(&self.sorters, &other.sorters)
            && same_functions(&self.derived_attributes, &other.derived_attributes)
            && self.hidden_attributes == other.hidden_attributes
            && self.hidden_from_aggregators == other.hidden_from_aggregators
            && self.hidden_from_drag_drop == other.hidden_from_drag_drop
            && self.menu_limit == other.menu_limit
            && self.unused_orientation_cutoff == other.unused_orientation_cutoff
            && self.extra == other.extra
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Pretty JSON summary of the axis and selector fields of `config`.
pub fn config_summary(config: Option<&PivotConfig>) -> String {
    let Some(config) = config else {
        return "No configuration yet".to_string();
    };

    let mut summary = Map::new();
    if let Some(rows) = &config.rows {
        summary.insert("rows".into(), Value::from(rows.clone()));
    }
    if let Some(cols) = &config.cols {
        summary.insert("cols".into(), Value::from(cols.clone()));
    }
    if let Some(name) = &config.aggregator_name {
        summary.insert("aggregatorName".into(), Value::from(name.as_str()));
    }
    if let Some(name) = &config.renderer_name {
        summary.insert("rendererName".into(), Value::from(name.as_str()));
    }

    serde_json::to_string_pretty(&Value::Object(summary)).unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
