//! Two consumers sharing one namespaced store
//!
//! Run with `RUST_LOG=storehouse=trace` to see the store and binding events.

use storehouse::{field, BindingSlot, StoreRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct AppState {
    name: String,
    count: i32,
}

/// Shows the counter and increments it.
struct CounterView {
    count: BindingSlot<AppState, i32>,
}

/// Shows the user name.
struct NameView {
    name: BindingSlot<AppState, String>,
}

impl CounterView {
    fn render(&mut self, registry: &StoreRegistry) -> storehouse::Result<()> {
        let store = registry.get_or_create(
            "app",
            Some(AppState {
                name: "X".to_string(),
                count: 0,
            }),
        )?;
        let count = self.count.bind(&store, field!(AppState, count));
        println!("   [CounterView] count = {}", count.get());
        Ok(())
    }

    fn increment(&self, registry: &StoreRegistry) -> storehouse::Result<()> {
        let store = registry.lookup::<AppState>("app")?;
        if let Some(count) = self.count.current() {
            count.set(store.get_state().count + 1);
        }
        Ok(())
    }
}

impl NameView {
    fn render(&mut self, registry: &StoreRegistry) -> storehouse::Result<()> {
        let store = registry.get_or_create::<AppState>("app", None)?;
        let name = self.name.bind(&store, field!(AppState, name));
        name.on_change(|name| println!("   [NameView] re-render: {name}"));
        println!("   [NameView] name = {}", name.get());
        Ok(())
    }
}

fn main() -> storehouse::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Shared Counter Application ===\n");

    let registry = StoreRegistry::new();
    let mut counter = CounterView {
        count: BindingSlot::new(),
    };
    let mut name = NameView {
        name: BindingSlot::new(),
    };

    println!("1. Mounting views");
    counter.render(&registry)?;
    name.render(&registry)?;

    println!("\n2. Incrementing twice");
    counter.increment(&registry)?;
    counter.increment(&registry)?;
    counter.render(&registry)?;

    if let Some(binding) = name.name.current() {
        println!(
            "   [NameView] inspected {} updates, emitted {} changes",
            binding.derivations(),
            binding.version()
        );
    }

    println!("\n3. Final state");
    println!("   {:?}", registry.lookup::<AppState>("app")?.get_state());

    println!("\n4. Unmounting views");
    counter.count.clear();
    name.name.clear();
    println!(
        "   listeners left: {}",
        registry.lookup::<AppState>("app")?.listener_count()
    );

    Ok(())
}
