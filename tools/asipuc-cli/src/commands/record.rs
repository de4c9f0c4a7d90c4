//! Record and reset attendance counts.

use asipuc_model::tally::Category;

use super::Context;

pub fn run(
    ctx: &Context,
    category: String,
    value: String,
    service: Option<u32>,
) -> anyhow::Result<()> {
    let category: Category = category
        .parse()
        .map_err(|e| anyhow::anyhow!("Failed to parse category: {e}"))?;

    let (name, tally) = ctx.edit_ledger(|ledger| {
        let id = Context::target_unit(ledger, service)?;
        let tally = ledger
            .record_for(id, category, &value)
            .map_err(|e| anyhow::anyhow!("Failed to record count: {e}"))?;
        let name = ledger.unit(id).map(|u| u.name.clone()).unwrap_or_default();
        Ok((name, tally))
    })?;

    println!(
        "{name}: {} = {} (total {})",
        category.label(),
        tally.get(category),
        tally.total()
    );
    Ok(())
}

pub fn reset(ctx: &Context, service: Option<u32>, all: bool) -> anyhow::Result<()> {
    let message = ctx.edit_ledger(|ledger| {
        if all {
            ledger.reset_all();
            return Ok("Reset every service".to_string());
        }
        let id = Context::target_unit(ledger, service)?;
        ledger
            .reset_unit(id)
            .map_err(|e| anyhow::anyhow!("Failed to reset service: {e}"))?;
        Ok(format!("Reset service {id}"))
    })?;
    println!("{message}");
    Ok(())
}
