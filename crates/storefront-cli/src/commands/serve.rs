//! Ingress server handler

use anyhow::Result;

use storefront_core::{ingress, Storefront};

use crate::output::Output;

/// Run the submission ingress until interrupted
pub async fn serve(shop: &Storefront, listen: Option<String>, output: &Output) -> Result<()> {
    let addr = listen.unwrap_or_else(|| shop.config().listen_addr.clone());
    let state = shop.ingress_state()?;

    output.message(&format!(
        "Serving {} ingress on http://{} (Ctrl-C to stop)",
        shop.config().store_name,
        addr
    ));
    ingress::serve(&addr, state).await
}
