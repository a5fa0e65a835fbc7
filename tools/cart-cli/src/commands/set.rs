//! Type a quantity into a row.

use anyhow::{bail, Result};
use turbo_cart::prelude::*;

use super::{row_index, sync_and_report, SetArgs};
use crate::context::Context;

/// Run the set command.
pub async fn run(args: SetArgs, ctx: &Context) -> Result<()> {
    let index = row_index(args.index)?;
    let (sync, mut notices) = ctx.open_cart().await?;

    let mut control = sync.control_for(index)?;
    let Some(typed) = control.type_text(&args.quantity) else {
        bail!("Row {} is busy", args.index);
    };
    sync.handle_event(index, typed)?;

    // The row now shows the typed value; leaving the box commits it.
    control.set_value(Some(typed.value()));
    let outcome = match control.focus_out() {
        Some(event) => sync.handle_event(index, event)?,
        None => CommitOutcome::Local,
    };

    if outcome == CommitOutcome::Local {
        ctx.output.info("Quantity unchanged");
        ctx.output.cart(&sync.overlay(), &sync.totals()?);
        return Ok(());
    }
    ctx.output.debug(&format!("queued {:?}", outcome));
    sync_and_report(ctx, &sync, &mut notices).await
}
