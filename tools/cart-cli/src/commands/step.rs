//! The `+` and `-` buttons.

use anyhow::{bail, Result};
use turbo_cart::prelude::*;

use super::{row_index, sync_and_report, StepArgs};
use crate::context::Context;

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Up,
    Down,
}

/// Run the inc or dec command.
pub async fn run(args: StepArgs, direction: Direction, ctx: &Context) -> Result<()> {
    let index = row_index(args.index)?;
    let (sync, mut notices) = ctx.open_cart().await?;

    let mut control = sync.control_for(index)?;
    let event = match direction {
        Direction::Up => control.increase(),
        Direction::Down => control.decrease(),
    };
    let Some(event) = event else {
        bail!("Row {} is busy", args.index);
    };

    if sync.handle_event(index, event)? == CommitOutcome::Local {
        let limit = match direction {
            Direction::Up => "the available stock",
            Direction::Down => "1",
        };
        ctx.output.warn(&format!("Quantity is already at {}", limit));
        ctx.output.cart(&sync.overlay(), &sync.totals()?);
        return Ok(());
    }
    sync_and_report(ctx, &sync, &mut notices).await
}
