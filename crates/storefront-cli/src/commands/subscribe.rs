//! Newsletter signup handler

use anyhow::{Context, Result};

use storefront_core::{Backend, Storefront, Subscriber};

use crate::output::Output;

/// Sign an address up for the newsletter
pub async fn subscribe(
    shop: &Storefront,
    email: String,
    name: Option<String>,
    output: &Output,
) -> Result<()> {
    let subscriber = Subscriber { email, name };
    shop.newsletter()?
        .subscribe(&subscriber)
        .await
        .context("Failed to subscribe")?;

    output.success(&format!("Subscribed {}", subscriber.email.trim()));
    if shop.config().backend == Backend::Mock {
        output.message("(mock backend; emails were not delivered)");
    }
    Ok(())
}
