//! Manage the day's reporting units.

use asipuc_model::ledger::{Ledger, UnitId, UnitPatch};

use super::Context;

pub fn list(ctx: &Context) -> anyhow::Result<()> {
    let file = ctx.load_ledger()?;
    print_units(&file.ledger);
    Ok(())
}

pub fn add(ctx: &Context, name: String, time: String) -> anyhow::Result<()> {
    let id = ctx.edit_ledger(|ledger| {
        ledger
            .add_unit(name.as_str(), time.as_str())
            .map_err(|e| anyhow::anyhow!("Failed to add service: {e}"))
    })?;
    println!("Added service {id}: {name} ({time})");
    Ok(())
}

pub fn remove(ctx: &Context, id: u32) -> anyhow::Result<()> {
    let removed = ctx.edit_ledger(|ledger| {
        ledger
            .remove_unit(UnitId(id))
            .map_err(|e| anyhow::anyhow!("Failed to remove service: {e}"))
    })?;
    println!("Removed service {}: {}", removed.id, removed.name);
    Ok(())
}

pub fn rename(ctx: &Context, id: u32, name: String, time: Option<String>) -> anyhow::Result<()> {
    ctx.edit_ledger(|ledger| {
        ledger
            .update_unit(
                UnitId(id),
                UnitPatch {
                    name: Some(name.clone()),
                    scheduled_time: time,
                    enabled: None,
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to update service: {e}"))
    })?;
    println!("Updated service {id}");
    Ok(())
}

pub fn toggle(ctx: &Context, id: u32) -> anyhow::Result<()> {
    let enabled = ctx.edit_ledger(|ledger| {
        ledger
            .toggle_enabled(UnitId(id))
            .map_err(|e| anyhow::anyhow!("Failed to toggle service: {e}"))
    })?;
    println!(
        "Service {id} {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub fn activate(ctx: &Context, id: u32) -> anyhow::Result<()> {
    ctx.edit_ledger(|ledger| {
        ledger
            .set_active(UnitId(id))
            .map_err(|e| anyhow::anyhow!("Failed to activate service: {e}"))
    })?;
    println!("Service {id} is now active");
    Ok(())
}

pub(crate) fn print_units(ledger: &Ledger) {
    println!("{:<4} {:<24} {:<6} {:<8} {:>6}", "ID", "NAME", "TIME", "STATE", "TOTAL");
    for unit in ledger.units() {
        let marker = if unit.id == ledger.active_id() { "*" } else { " " };
        println!(
            "{marker}{:<3} {:<24} {:<6} {:<8} {:>6}",
            unit.id.0,
            unit.name,
            unit.scheduled_time,
            if unit.enabled { "enabled" } else { "disabled" },
            unit.total()
        );
    }
}
