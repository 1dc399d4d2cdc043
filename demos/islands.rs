//! Two independently mounted islands sharing a theme and a cart count

use std::sync::{Arc, Mutex};

use islet::{
    component, use_global, use_global_accessor, use_global_or, with_query_client, Island,
    SetGlobal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> islet::Result<()> {
    // If RUST_LOG is not set, show our own debug output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("islet=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== Islands Example: Theme and Cart ===\n");

    // The toggle owns the default theme and hands its setter out
    let toggle_setter: Arc<Mutex<Option<SetGlobal<String>>>> = Arc::new(Mutex::new(None));
    let toggle = {
        let toggle_setter = toggle_setter.clone();
        with_query_client(component("ThemeToggle", move |_: &()| {
            let (theme, set_theme, _, _) = use_global_or("THEME", "light".to_string())?;
            println!("   [ThemeToggle] theme = {:?}", theme);
            if let Ok(mut slot) = toggle_setter.lock() {
                *slot = Some(set_theme);
            }
            Ok(())
        }))
    };

    // The header only reads the theme; it never supplies a default
    let header = with_query_client(component("Header", |title: &String| {
        let (theme, ..) = use_global::<String>("THEME")?;
        let (items, ..) = use_global_or(["cart", "items"], 0u32)?;
        println!(
            "   [Header] {} | theme = {:?} | cart = {:?}",
            title, theme, items
        );
        Ok(())
    }));

    // The checkout button peeks at the cart without subscribing
    let checkout = with_query_client(component("Checkout", |_: &()| {
        let get = use_global_accessor()?;
        println!("   [Checkout] cart = {:?}", get.get::<u32>("cart.items")?);
        Ok(())
    }));

    println!("1. Mounting islands");
    let _toggle = Island::mount(toggle, ())?;
    let _header = Island::mount(header, "Shop".to_string())?;
    let checkout = Island::mount(checkout, ())?;

    println!("\n2. Switching to dark theme");
    let set_theme = toggle_setter.lock().ok().and_then(|slot| slot.clone());
    if let Some(set_theme) = &set_theme {
        set_theme.set("dark".to_string());
    }

    println!("\n3. Adding items to the cart");
    let (_, set_items, _, reset_items) = use_global_or(["cart", "items"], 0u32)?;
    set_items.update(|n| n.unwrap_or(0) + 2)?;
    set_items.update(|n| n.unwrap_or(0) + 1)?;

    println!("\n4. Checkout renders only when asked");
    checkout.render()?;
    info!(renders = checkout.render_count(), "Checkout render count");

    println!("\n5. Emptying the cart");
    reset_items.run();

    println!("\n=== Example Complete ===");
    Ok(())
}
