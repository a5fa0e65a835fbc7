//! Print the cart.

use anyhow::Result;

use super::ShowArgs;
use crate::context::Context;

/// Run the show command.
pub async fn run(_args: ShowArgs, ctx: &Context) -> Result<()> {
    let (sync, _notices) = ctx.open_cart().await?;

    ctx.output.header(&format!("Cart {}", sync.cart_id()));
    ctx.output.cart(&sync.overlay(), &sync.totals()?);
    Ok(())
}
