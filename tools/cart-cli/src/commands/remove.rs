//! Remove a product from the cart.

use anyhow::{bail, Result};
use dialoguer::Confirm;
use turbo_cart::prelude::*;

use super::{sync_and_report, RemoveArgs};
use crate::context::Context;

/// Run the remove command.
pub async fn run(args: RemoveArgs, ctx: &Context) -> Result<()> {
    let product_id = ProductId::new(args.product_id);
    let (sync, mut notices) = ctx.open_cart().await?;

    let overlay = sync.overlay();
    let Some(row) = overlay.iter().find(|row| row.product_id == product_id) else {
        bail!("Product {} is not in the cart", product_id);
    };

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove {} from the cart?", row.product_name))
            .default(false)
            .interact()?;
        if !confirmed {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    sync.remove_item(&product_id)?;
    sync_and_report(ctx, &sync, &mut notices).await
}
