//! List the slide templates.

use asipuc_model::template::TemplateId;

pub fn run() -> anyhow::Result<()> {
    for info in TemplateId::catalogue() {
        println!(
            "{:<8} {:<8} {:<13} {}",
            info.id, info.name, info.category, info.description
        );
    }
    Ok(())
}
