//! Print the working day.

use asipuc_model::tally::Tally;

use super::services::print_units;
use super::Context;

pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let file = ctx.load_ledger()?;
    let ledger = &file.ledger;
    let accumulated = ledger.accumulate();

    if json {
        let units: Vec<_> = ledger
            .units()
            .iter()
            .map(|unit| {
                serde_json::json!({
                    "id": unit.id,
                    "name": unit.name,
                    "time": unit.scheduled_time,
                    "enabled": unit.enabled,
                    "active": unit.id == ledger.active_id(),
                    "rows": unit.data.to_rows(),
                    "total": unit.total(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "saved_at": file.saved_at,
            "units": units,
            "accumulated": {
                "rows": accumulated.to_rows(),
                "total": accumulated.total(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_units(ledger);
    println!();
    let active = ledger.active_unit();
    println!("Active: {} ({})", active.name, active.scheduled_time);
    print_tally(&active.data);
    println!();
    println!("Accumulated (enabled services):");
    print_tally(&accumulated);
    Ok(())
}

fn print_tally(tally: &Tally) {
    for row in tally.to_rows() {
        println!("  {:<14} {:>6}", row.label, row.value);
    }
    println!("  {:<14} {:>6}", "TOTAL", tally.total());
}
