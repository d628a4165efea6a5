//! `souq cart` subcommands.
//!
//! Output goes through `tracing` at info level, like every other command.

use serde_json::Value;
use souq_cart::{CartEvent, CartState, CartTotals};
use souq_core::{Price, Product, ProductId, is_reserved_field};
use tracing::{info, warn};

use super::Context;

/// Parse a `key=value` field; the value is read as JSON when it parses,
/// otherwise kept as a string.
///
/// # Errors
///
/// Returns an error if there is no `=`, the key is empty, or the key is
/// `id`/`quantity` (those have their own arguments).
pub fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field key cannot be empty".to_string());
    }
    if is_reserved_field(key) {
        return Err(format!("{key} has its own argument"));
    }
    Ok((key.to_string(), json_or_string(value)))
}

fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Add `quantity` units of a product built from command-line fields.
///
/// When the product records a stock level, the quantity is capped so the
/// line never exceeds it.
pub fn add(
    ctx: &Context,
    id: ProductId,
    name: Option<String>,
    price: Option<String>,
    quantity: u32,
    fields: Vec<(String, Value)>,
) {
    let mut product = Product::new(id);
    for (key, value) in fields {
        product = product.with(key, value);
    }
    if let Some(name) = name {
        product = product.with("name", name);
    }
    if let Some(price) = price {
        product = product.with("price", json_or_string(&price));
    }

    if quantity == 0 {
        warn!("Quantity 0 requested; nothing added");
        return;
    }
    let Some(stock) = product.stock_quantity() else {
        let id = product.id.clone();
        ctx.store.add_items(product, quantity);
        report_line(ctx, &id);
        return;
    };
    if stock == 0 {
        warn!(id = %product.id, "Product is out of stock; nothing added");
        return;
    }

    let in_cart = ctx
        .store
        .with_state(|state| state.get(&product.id).map_or(0, |item| item.quantity));
    let room = u32::try_from(stock.saturating_sub(u64::from(in_cart))).unwrap_or(u32::MAX);
    if room == 0 {
        warn!(id = %product.id, stock, "Already at stock limit; nothing added");
        return;
    }
    let capped = quantity.min(room);
    if capped < quantity {
        warn!(id = %product.id, requested = quantity, added = capped, stock, "Quantity capped at stock level");
    }

    let id = product.id.clone();
    ctx.store.add_items(product, capped);
    report_line(ctx, &id);
}

/// Add a product from a raw JSON record.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or the record has no usable id.
pub fn import(ctx: &Context, json: &str) -> Result<(), Box<dyn std::error::Error>> {
    let value: Value = serde_json::from_str(json)?;
    let id = value.get("id").map(ProductId::from_json).transpose()?;
    ctx.store.add_json(value)?;
    if let Some(id) = id {
        report_line(ctx, &id);
    }
    Ok(())
}

pub fn remove(ctx: &Context, id: &ProductId) {
    if ctx.store.with_state(|state| state.get(id).is_none()) {
        warn!(%id, "Product is not in the cart");
        return;
    }
    ctx.store.remove_item(id);
    info!(%id, "Removed from cart");
}

/// Increase a quantity, refusing to pass the recorded stock level unless forced.
pub fn increase(ctx: &Context, id: &ProductId, force: bool) {
    let at_limit = ctx
        .store
        .with_state(|state| state.get(id).map(souq_cart::LineItem::is_at_stock_limit));
    match at_limit {
        None => warn!(%id, "Product is not in the cart"),
        Some(true) if !force => warn!(%id, "Already at stock limit; use --force to override"),
        Some(_) => {
            ctx.store.increase_quantity(id);
            report_line(ctx, id);
        }
    }
}

pub fn decrease(ctx: &Context, id: &ProductId) {
    let quantity = ctx
        .store
        .with_state(|state| state.get(id).map(|item| item.quantity));
    match quantity {
        None => warn!(%id, "Product is not in the cart"),
        Some(1) => warn!(%id, "Quantity is already 1; use `souq cart remove` to drop it"),
        Some(_) => {
            ctx.store.decrease_quantity(id);
            report_line(ctx, id);
        }
    }
}

pub fn clear(ctx: &Context) {
    let id = ctx.store.subscribe(|event, _| {
        if let CartEvent::Cleared { removed } = event {
            info!(removed, "Cart cleared");
        }
    });
    ctx.store.clear_cart();
    ctx.store.unsubscribe(id);
}

/// Show cart lines and totals.
///
/// # Errors
///
/// Returns an error if `--json` output cannot be serialized.
pub fn show(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let state = ctx.store.snapshot();
    if json {
        info!("{}", souq_cart::encode_state(&state)?);
        return Ok(());
    }

    if state.is_empty() {
        info!("Your cart is empty.");
        return Ok(());
    }

    let totals = CartTotals::compute(&state, &ctx.config.pricing);
    info!("{} Items", state.distinct_count());
    print_lines(ctx, &state);
    info!("  Subtotal:    {}", totals.subtotal);
    info!("  Shipping:    {}", totals.shipping);
    info!("  Tax:         {}", totals.tax);
    info!("  Grand total: {}", totals.grand_total);
    Ok(())
}

fn print_lines(ctx: &Context, state: &CartState) {
    let currency = ctx.config.pricing.currency;
    for item in &state.items {
        info!(
            "  {} x {} [{}] @ {} = {}",
            item.quantity,
            item.name().unwrap_or("(unnamed)"),
            item.id,
            Price::new(item.unit_price(), currency),
            Price::new(item.line_total(), currency),
        );
    }
}

fn report_line(ctx: &Context, id: &ProductId) {
    let quantity = ctx
        .store
        .with_state(|state| state.get(id).map(|item| item.quantity));
    if let Some(quantity) = quantity {
        info!(%id, quantity, total_items = ctx.store.item_count(), "Cart updated");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use souq_cart::{CartConfig, CartStore};
    use std::path::Path;

    fn context(dir: &Path) -> Context {
        let config = CartConfig {
            storage_dir: dir.to_path_buf(),
            ..CartConfig::default()
        };
        let store = CartStore::from_config(&config).unwrap();
        Context { store, config }
    }

    fn quantity_of(ctx: &Context, id: i64) -> Option<u32> {
        ctx.store
            .with_state(|state| state.get(&ProductId::Number(id)).map(|item| item.quantity))
    }

    fn stocked(stock: u64) -> Vec<(String, Value)> {
        vec![("stock_quantity".to_string(), json!(stock))]
    }

    #[test]
    fn test_increase_refuses_at_stock_limit() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        add(&ctx, ProductId::Number(1), None, Some("10".into()), 2, stocked(2));
        assert_eq!(quantity_of(&ctx, 1), Some(2));

        increase(&ctx, &ProductId::Number(1), false);
        assert_eq!(quantity_of(&ctx, 1), Some(2));
    }

    #[test]
    fn test_increase_below_limit_goes_through() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        add(&ctx, ProductId::Number(1), None, None, 1, stocked(2));

        increase(&ctx, &ProductId::Number(1), false);
        assert_eq!(quantity_of(&ctx, 1), Some(2));
    }

    #[test]
    fn test_increase_with_force_passes_limit() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        add(&ctx, ProductId::Number(1), None, None, 1, stocked(1));

        increase(&ctx, &ProductId::Number(1), true);
        assert_eq!(quantity_of(&ctx, 1), Some(2));

        let reopened = context(dir.path());
        assert_eq!(quantity_of(&reopened, 1), Some(2));
    }

    #[test]
    fn test_increase_missing_product_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        increase(&ctx, &ProductId::Number(9), true);
        assert!(ctx.store.snapshot().is_empty());
    }

    #[test]
    fn test_add_refuses_out_of_stock() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        add(&ctx, ProductId::Number(1), Some("Saw".into()), None, 1, stocked(0));
        assert!(ctx.store.snapshot().is_empty());
    }

    #[test]
    fn test_add_caps_quantity_at_stock() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        add(&ctx, ProductId::Number(1), None, None, 5, stocked(3));
        assert_eq!(quantity_of(&ctx, 1), Some(3));

        add(&ctx, ProductId::Number(1), None, None, 2, stocked(3));
        assert_eq!(quantity_of(&ctx, 1), Some(3));
    }

    #[test]
    fn test_add_counts_units_already_in_cart() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        add(&ctx, ProductId::Number(1), None, None, 1, stocked(4));
        add(&ctx, ProductId::Number(1), None, None, 10, stocked(4));
        assert_eq!(quantity_of(&ctx, 1), Some(4));
    }

    #[test]
    fn test_add_without_stock_is_uncapped() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        add(&ctx, ProductId::Number(1), None, Some("2.5".into()), 7, Vec::new());
        assert_eq!(quantity_of(&ctx, 1), Some(7));
    }

    #[test]
    fn test_parse_field_json_values() {
        assert_eq!(
            parse_field("stock_quantity=4").unwrap(),
            ("stock_quantity".to_string(), json!(4))
        );
        assert_eq!(
            parse_field("tags=[\"a\"]").unwrap(),
            ("tags".to_string(), json!(["a"]))
        );
    }

    #[test]
    fn test_parse_field_plain_strings() {
        assert_eq!(
            parse_field("image=hammer.png").unwrap(),
            ("image".to_string(), json!("hammer.png"))
        );
        assert_eq!(
            parse_field("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn test_parse_field_errors() {
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=5").is_err());
        assert!(parse_field("id=5").is_err());
        assert!(parse_field("quantity=5").is_err());
    }
}
