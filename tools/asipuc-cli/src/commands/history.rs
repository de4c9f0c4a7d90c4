//! Save the day to the attendance history and read it back.

use asipuc_common::clock::Clock;
use asipuc_model::store::AttendanceStore;

use super::Context;

pub async fn save(ctx: &Context) -> anyhow::Result<()> {
    let file = ctx.load_ledger()?;
    let store = ctx.open_store()?;
    let report = file.ledger.persist_all(&store, ctx.clock.now()).await;

    for (id, row_id) in &report.stored {
        let name = file.ledger.unit(*id).map(|u| u.name.as_str()).unwrap_or("?");
        println!("Saved {name} as record #{row_id}");
    }
    for (id, reason) in &report.failed {
        let name = file.ledger.unit(*id).map(|u| u.name.as_str()).unwrap_or("?");
        eprintln!("Failed to save {name}: {reason}");
    }

    if report.is_complete() {
        println!("{} record(s) saved", report.stored.len());
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} record(s) failed to save",
            report.failed.len(),
            report.failed.len() + report.stored.len()
        )
    }
}

pub async fn list(ctx: &Context, limit: usize, json: bool) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let records = store
        .recent(limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read history: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No saved records");
        return Ok(());
    }
    println!("{:<6} {:<26} {:<24} {:<6} {:>6}", "ID", "DATE", "SERVICE", "TIME", "TOTAL");
    for record in &records {
        println!(
            "{:<6} {:<26} {:<24} {:<6} {:>6}",
            record.id,
            record.date,
            record.unit_name.as_deref().unwrap_or("-"),
            record.unit_time.as_deref().unwrap_or("-"),
            record.total
        );
    }
    Ok(())
}
