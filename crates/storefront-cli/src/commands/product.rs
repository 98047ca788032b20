//! Product command handlers

use anyhow::{bail, Context, Result};
use clap::Args;

use storefront_core::{Price, ProductDraft, ProductPatch, Session, Storefront};

use super::{confirm, resolve_id, warn_if_load_failed};
use crate::output::Output;

/// Optional product fields shared by `add` and `update`
#[derive(Args, Debug, Clone, Default)]
pub struct ProductFields {
    /// Category label
    #[arg(long)]
    pub category: Option<String>,
    /// Price before discount
    #[arg(long)]
    pub original_price: Option<Price>,
    /// Image URL or asset path
    #[arg(long)]
    pub image: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Short label such as "New" or "Bestseller"
    #[arg(long)]
    pub badge: Option<String>,
    /// Rating from 0 to 5
    #[arg(long)]
    pub rating: Option<f32>,
    #[arg(long)]
    pub stock: Option<i64>,
    #[arg(long)]
    pub sku: Option<String>,
    /// Size or shade
    #[arg(long)]
    pub variant: Option<String>,
}

impl ProductFields {
    fn check(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                bail!("Rating must be between 0 and 5, got {}", rating);
            }
        }
        Ok(())
    }

    pub fn into_draft(self, name: String, price: Price) -> Result<ProductDraft> {
        self.check()?;
        if name.trim().is_empty() {
            bail!("Product name cannot be empty");
        }

        Ok(ProductDraft {
            name,
            category: self.category.unwrap_or_default(),
            price,
            original_price: self.original_price,
            image: self.image.unwrap_or_default(),
            description: self.description,
            badge: self.badge,
            rating: self.rating,
            stock: self.stock,
            sku: self.sku,
            variant: self.variant,
        })
    }

    pub fn into_patch(self, name: Option<String>, price: Option<Price>) -> Result<ProductPatch> {
        self.check()?;
        Ok(ProductPatch {
            name,
            category: self.category,
            price,
            original_price: self.original_price,
            image: self.image,
            description: self.description,
            badge: self.badge,
            rating: self.rating,
            stock: self.stock,
            sku: self.sku,
            variant: self.variant,
        })
    }
}

/// List products, optionally filtered by category
pub fn list(shop: &Storefront, category: Option<String>, output: &Output) -> Result<()> {
    let catalog = shop.catalog();
    warn_if_load_failed(catalog, output);

    let products: Vec<_> = catalog
        .items()
        .iter()
        .filter(|p| {
            category
                .as_deref()
                .map_or(true, |c| p.category.eq_ignore_ascii_case(c))
        })
        .cloned()
        .collect();

    output.print_products(&products);
    Ok(())
}

/// Show a single product
pub fn show(shop: &Storefront, id: String, output: &Output) -> Result<()> {
    let catalog = shop.catalog();
    let id = resolve_id(&catalog.items(), &id, "product")?;
    let product = catalog
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Product not found: {}", id))?;

    output.print_product(product);
    Ok(())
}

/// Create a new product
pub async fn add(
    shop: &mut Storefront,
    session: &Session,
    name: String,
    price: Price,
    fields: ProductFields,
    output: &Output,
) -> Result<()> {
    let draft = fields.into_draft(name, price)?;
    let product = shop
        .add_product(session, &draft)
        .await
        .context("Failed to add product")?;

    output.success(&format!("Added product: {}", product.id));
    output.print_product(&product);
    Ok(())
}

/// Change some fields of a product
pub async fn update(
    shop: &mut Storefront,
    session: &Session,
    id: String,
    name: Option<String>,
    price: Option<Price>,
    fields: ProductFields,
    output: &Output,
) -> Result<()> {
    let patch = fields.into_patch(name, price)?;
    if patch.is_empty() {
        bail!("Nothing to update. Pass at least one field, e.g. --price 499");
    }

    let id = resolve_id(&shop.catalog().items(), &id, "product")?;
    let product = shop
        .update_product(session, &id, &patch)
        .await
        .context("Failed to update product")?;

    output.success("Product updated");
    output.print_product(&product);
    Ok(())
}

/// Delete a product
pub async fn delete(
    shop: &mut Storefront,
    session: &Session,
    id: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(&shop.catalog().items(), &id, "product")?;

    if output.should_prompt() {
        if let Some(product) = shop.catalog().get(&id) {
            println!("Delete product: {} - {}", id, product.name);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    shop.delete_product(session, &id)
        .await
        .context("Failed to delete product")?;

    output.success(&format!("Deleted product: {}", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use storefront_core::{Backend, Config};
    use tempfile::TempDir;

    async fn mock_shop(temp_dir: &TempDir) -> Storefront {
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            backend: Backend::Mock,
            user_id: Some("owner".to_string()),
            ..Config::default()
        };
        Storefront::open_with_config(config).await.unwrap()
    }

    #[test]
    fn test_patch_only_carries_given_fields() {
        let fields = ProductFields {
            stock: Some(0),
            ..ProductFields::default()
        };
        let patch = fields.into_patch(None, None).unwrap();
        assert_eq!(patch.stock, Some(0));
        assert!(patch.price.is_none());
        assert!(!patch.is_empty());

        assert!(ProductFields::default()
            .into_patch(None, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rating_out_of_range() {
        let fields = ProductFields {
            rating: Some(7.5),
            ..ProductFields::default()
        };
        assert!(fields
            .into_draft("Serum".to_string(), Price::from_major(1))
            .is_err());
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let temp_dir = TempDir::new().unwrap();
        let mut shop = mock_shop(&temp_dir).await;
        let session = shop.session().await.unwrap();
        let output = Output::new(OutputFormat::Quiet);

        add(
            &mut shop,
            &session,
            "Face Cream".to_string(),
            Price::from_major(500),
            ProductFields::default(),
            &output,
        )
        .await
        .unwrap();
        let id = shop.catalog().items()[0].id.clone();

        update(
            &mut shop,
            &session,
            id[..4].to_string(),
            None,
            Some(Price::from_major(450)),
            ProductFields::default(),
            &output,
        )
        .await
        .unwrap();
        assert_eq!(
            shop.catalog().get(&id).unwrap().price,
            Price::from_major(450)
        );

        delete(&mut shop, &session, id.clone(), &output).await.unwrap();
        assert!(shop.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_customer_cannot_add() {
        let temp_dir = TempDir::new().unwrap();
        let mut shop = mock_shop(&temp_dir).await;
        let visitor = shop.establish_session("visitor").await.unwrap();
        let output = Output::new(OutputFormat::Quiet);

        let result = add(
            &mut shop,
            &visitor,
            "Serum".to_string(),
            Price::from_major(1),
            ProductFields::default(),
            &output,
        )
        .await;
        assert!(result.is_err());
        assert!(shop.catalog().is_empty());
    }
}
