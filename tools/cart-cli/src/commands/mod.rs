//! CLI command implementations.

pub mod config;
pub mod remove;
pub mod set;
pub mod show;
pub mod step;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use futures::channel::mpsc::UnboundedReceiver;
use turbo_cart::prelude::*;

use crate::context::Context;

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {}

/// Arguments for the set command.
#[derive(Args)]
pub struct SetArgs {
    /// Row number as printed by `cart show`.
    pub index: usize,

    /// New quantity, typed as into the quantity box.
    pub quantity: String,
}

/// Arguments for the inc and dec commands.
#[derive(Args)]
pub struct StepArgs {
    /// Row number as printed by `cart show`.
    pub index: usize,
}

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Product id to remove.
    pub product_id: String,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Convert a 1-based row number to an overlay index.
pub(crate) fn row_index(index: usize) -> Result<usize> {
    match index.checked_sub(1) {
        Some(i) => Ok(i),
        None => bail!("Rows are numbered from 1"),
    }
}

/// Push queued changes, report what happened and print the cart.
///
/// Fails when any change was rejected, after the cart has been re-rendered
/// from the server's copy.
pub(crate) async fn sync_and_report<S: CartStore>(
    ctx: &Context,
    sync: &CartSync<S>,
    notices: &mut UnboundedReceiver<SyncNotice>,
) -> Result<()> {
    let spinner = ctx.output.spinner("Updating cart");
    let summary = sync.flush().await;
    spinner.finish_and_clear();

    while let Ok(Some(notice)) = notices.try_next() {
        ctx.output.notice(&notice);
    }

    ctx.output.cart(&sync.overlay(), &sync.totals()?);

    if summary.failures > 0 {
        bail!(
            "{} of {} cart update(s) did not go through",
            summary.failures,
            summary.dispatched
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_index() {
        assert_eq!(row_index(1).unwrap(), 0);
        assert_eq!(row_index(3).unwrap(), 2);
        assert!(row_index(0).is_err());
    }
}
