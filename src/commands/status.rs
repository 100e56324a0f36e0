use crate::core::{
    command_init::CommandContext,
    error::Result,
    file_status::GroupKind,
    groups::GroupPolicy,
    host::ConsoleHost,
    output::print_group,
};
use colored::*;
use std::sync::Arc;

/// Rescan the three groups, print them and cache the snapshot
pub async fn execute_status(context: &CommandContext) -> Result<()> {
    let reconciler = context.reconciler(Arc::new(ConsoleHost::new()));
    let view_type = context.cleartool.view_type().await;

    println!(
        "\n{} {} {}",
        "View:".white(),
        context.view_root.display().to_string().cyan(),
        format!("({view_type:?})").bright_black()
    );

    reconciler.refresh_all().await?;

    let settings = context.settings();
    for kind in GroupKind::ALL {
        if GroupPolicy::for_kind(kind).is_visible(&settings) {
            print_group(kind.label(), &reconciler.groups().files(kind), &context.view_root);
        }
    }
    println!();

    // Cache failures never fail the status command
    match reconciler.groups().snapshot(context.view_root.clone()).save() {
        Ok(path) => log::debug!("Saved group snapshot to {}", path.display()),
        Err(e) => log::warn!("Cache save failed (status command will continue): {e}"),
    }

    Ok(())
}
