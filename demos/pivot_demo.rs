//! Pivot Demo - A read-only and an interactive pivot table side by side
//!
//! This example demonstrates:
//! - Feeding host signals into a `PivotTable` and a `PivotTableUi`
//! - Receiving the widget's changes on both outward channels
//! - The reentrancy gate absorbing the two-way binding echo
//!
//! Run with: RUST_LOG=debug cargo run --example pivot_demo

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use log::info;
use serde_json::json;
use spark_signals::{effect, signal};
use spark_pivot::{
    bind_inputs, bind_outputs, bind_two_way, config_summary, dataset_from_json, AggregatorName,
    HostZone, MountTarget, OnChange, PivotConfig, PivotState, PivotTable, PivotTableUi,
    PivotWidget, PropertyBag, RendererName, SignalZone, WidgetError,
};

/// Prints every property bag it receives instead of drawing a table.
struct ConsoleWidget {
    name: &'static str,
    on_change: Rc<RefCell<Option<OnChange>>>,
}

/// Plays the user: reshapes the table through the widget's last callback.
struct ConsoleUser {
    on_change: Rc<RefCell<Option<OnChange>>>,
}

impl ConsoleWidget {
    fn new(name: &'static str) -> (Self, ConsoleUser) {
        let on_change = Rc::new(RefCell::new(None));
        let user = ConsoleUser { on_change: on_change.clone() };
        (Self { name, on_change }, user)
    }
}

impl PivotWidget for ConsoleWidget {
    fn render(&mut self, target: &MountTarget, props: PropertyBag) -> Result<(), WidgetError> {
        let state = props
            .to_state()
            .map_err(|e| WidgetError::Render(e.to_string()))?;

        println!("[{}] render into #{target}", self.name);
        println!("    keys:       {:?}", props.keys().collect::<Vec<_>>());
        println!("    records:    {}", props.data().map_or(0, |data| data.len()));
        println!("    rows/cols:  {:?} / {:?}", state.rows, state.cols);
        println!(
            "    aggregator: {}",
            state.aggregator_name.as_ref().map_or("-", |name| name.as_str())
        );

        *self.on_change.borrow_mut() = props.on_change();
        Ok(())
    }

    fn unmount(&mut self, target: &MountTarget) -> Result<(), WidgetError> {
        println!("[{}] unmounted from #{target}", self.name);
        self.on_change.borrow_mut().take();
        Ok(())
    }
}

impl ConsoleUser {
    fn reshape(&self, state: PivotState) {
        let callback = self.on_change.borrow().clone();
        match callback {
            Some(on_change) => on_change(state),
            None => println!("(widget is read-only)"),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== spark-pivot Demo ===\n");

    let data = dataset_from_json(json!([
        { "Name": "John", "Age": 28, "Gender": "Male", "City": "New York", "Sales": 1200 },
        { "Name": "Jane", "Age": 32, "Gender": "Female", "City": "Boston", "Sales": 1500 },
        { "Name": "Bob", "Age": 45, "Gender": "Male", "City": "Chicago", "Sales": 900 },
        { "Name": "Alice", "Age": 29, "Gender": "Female", "City": "New York", "Sales": 1800 },
        { "Name": "Charlie", "Age": 35, "Gender": "Male", "City": "Boston", "Sales": 1100 },
        { "Name": "Diana", "Age": 41, "Gender": "Female", "City": "Chicago", "Sales": 1600 },
        { "Name": "Eve", "Age": 27, "Gender": "Female", "City": "New York", "Sales": 1300 },
        { "Name": "Frank", "Age": 38, "Gender": "Male", "City": "Boston", "Sales": 1400 },
        { "Name": "Grace", "Age": 33, "Gender": "Female", "City": "Chicago", "Sales": 1700 },
        { "Name": "Henry", "Age": 42, "Gender": "Male", "City": "New York", "Sales": 1000 }
    ]))?;

    let zone = Rc::new(SignalZone::new());
    let cycles = zone.cycles();
    let _detection = effect(move || {
        let pass = cycles.get();
        if pass > 0 {
            info!("host detection pass {pass}");
        }
    });

    // Read-only table
    let (widget, _viewer) = ConsoleWidget::new("table");
    let table = PivotTable::new(widget, zone.clone());
    let table_config = signal(
        PivotConfig::new()
            .with_dataset(data.clone())
            .with_rows(["City"])
            .with_cols(["Gender"])
            .with_vals(["Sales"])
            .with_aggregator(AggregatorName::Sum)
            .with_renderer(RendererName::Table),
    );
    table.on_ready(Some(MountTarget::new("pivot-table")));
    let _table_inputs = bind_inputs(&table, table_config.clone());

    // Interactive table
    let (widget, user) = ConsoleWidget::new("table-ui");
    let ui = PivotTableUi::new(widget, zone.clone());
    let ui_config = signal(
        PivotConfig::new()
            .with_dataset(data.clone())
            .with_rows(["City"])
            .with_cols(Vec::<String>::new()),
    );
    let current_config = signal(None::<PivotState>);

    ui.on_ready(Some(MountTarget::new("pivot-table-ui")));
    let _ui_binding = bind_two_way(&ui, ui_config.clone());
    let _ui_outputs = bind_outputs(&ui, current_config.clone());
    let _persist = ui.on_configuration_changed(|config| info!("pivot config changed: {config:?}"));
    let _observe = ui.on_state_changed(|state| info!("pivot state changed: {state:?}"));

    println!("\nCurrent configuration:\n{}\n", config_summary(current_config.get().as_ref()));

    // The user drags Gender into the columns and switches to averages.
    user.reshape(
        PivotConfig::new()
            .with_dataset(data.clone())
            .with_rows(["City"])
            .with_cols(["Gender"])
            .with_vals(["Age"])
            .with_aggregator(AggregatorName::Average)
            .with_renderer(RendererName::TableHeatmap),
    );
    println!("\nGate while the change propagates: {:?}", ui.gate_state());
    zone.flush();
    println!("Gate after the microtask drain:   {:?}", ui.gate_state());

    println!("\nCurrent configuration:\n{}\n", config_summary(current_config.get().as_ref()));

    // Host-side edit of the read-only table.
    table_config.set(table_config.get().with_aggregator(AggregatorName::Maximum));

    ui.on_teardown();
    table.on_teardown();

    println!("\n=== Demo Complete ===");
    Ok(())
}
