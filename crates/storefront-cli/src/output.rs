//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use storefront_core::{Price, Product, Submission};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Currency symbol for prices
    currency: String,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            currency: String::new(),
        }
    }

    pub fn with_currency(mut self, symbol: &str) -> Self {
        self.currency = symbol.to_string();
        self
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    fn price(&self, price: Price) -> String {
        price.display_with(&self.currency)
    }

    /// Print a single product
    pub fn print_product(&self, product: &Product) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", product.id);
                println!("Name:        {}", product.name);
                if !product.category.is_empty() {
                    println!("Category:    {}", product.category);
                }
                match (product.original_price, product.discount_percent()) {
                    (Some(original), Some(off)) => println!(
                        "Price:       {} (was {}, {}% off)",
                        self.price(product.price),
                        self.price(original),
                        off
                    ),
                    _ => println!("Price:       {}", self.price(product.price)),
                }
                if let Some(ref badge) = product.badge {
                    println!("Badge:       {}", badge);
                }
                if let Some(rating) = product.rating {
                    println!("Rating:      {:.1}", rating);
                }
                if let Some(stock) = product.stock {
                    println!("Stock:       {}", stock);
                }
                if let Some(ref sku) = product.sku {
                    println!("SKU:         {}", sku);
                }
                if let Some(ref variant) = product.variant {
                    println!("Variant:     {}", variant);
                }
                if !product.image.is_empty() {
                    println!("Image:       {}", product.image);
                }
                if let Some(ref desc) = product.description {
                    println!("Description: {}", desc);
                }
                println!("Created:     {}", product.created_at.format("%Y-%m-%d %H:%M"));
                if let Some(updated) = product.updated_at {
                    println!("Updated:     {}", updated.format("%Y-%m-%d %H:%M"));
                }
            }
            OutputFormat::Json => println!("{}", to_json(product)),
            OutputFormat::Quiet => println!("{}", product.id),
        }
    }

    /// Print a list of products
    pub fn print_products(&self, products: &[Product]) {
        match self.format {
            OutputFormat::Human => {
                if products.is_empty() {
                    println!("No products found.");
                    return;
                }
                for product in products {
                    let stock = if product.in_stock() { "" } else { " [out of stock]" };
                    println!(
                        "{} | {} | {:>12} | {}{}",
                        short_id(&product.id),
                        truncate(&product.name, 35),
                        self.price(product.price),
                        truncate(&product.category, 20),
                        stock
                    );
                }
                println!("\n{} product(s)", products.len());
            }
            OutputFormat::Json => println!("{}", to_json(products)),
            OutputFormat::Quiet => {
                for product in products {
                    println!("{}", product.id);
                }
            }
        }
    }

    /// Print a single submission with its payloads
    pub fn print_submission(&self, submission: &Submission) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", submission.id);
                println!("Form:     {} ({})", submission.form_name, submission.form_type);
                println!("Status:   {}", submission.status);
                if let Some(ref name) = submission.customer_name {
                    println!("Customer: {}", name);
                }
                if let Some(ref email) = submission.customer_email {
                    println!("Email:    {}", email);
                }
                if let Some(ref phone) = submission.customer_phone {
                    println!("Phone:    {}", phone);
                }
                if let Some(ref address) = submission.delivery_address {
                    println!("Address:  {}", address);
                }
                println!("Received: {}", submission.created_at.format("%Y-%m-%d %H:%M"));

                if has_fields(&submission.order_details) {
                    println!();
                    println!("── Order ──");
                    println!("{}", to_json(&submission.order_details));
                }
                if has_fields(&submission.additional_data) {
                    println!();
                    println!("── Additional ──");
                    println!("{}", to_json(&submission.additional_data));
                }
                if let Some(ref notes) = submission.notes {
                    println!();
                    println!("── Notes ──");
                    println!("{}", notes);
                }
            }
            OutputFormat::Json => println!("{}", to_json(submission)),
            OutputFormat::Quiet => println!("{}", submission.id),
        }
    }

    /// Print a list of submissions
    pub fn print_submissions(&self, submissions: &[Submission]) {
        match self.format {
            OutputFormat::Human => {
                if submissions.is_empty() {
                    println!("No submissions found.");
                    return;
                }
                for s in submissions {
                    println!(
                        "{} | {} | {:<10} | {} | {}",
                        short_id(&s.id),
                        s.created_at.format("%Y-%m-%d"),
                        s.status.as_str(),
                        truncate(&s.form_name, 30),
                        truncate(s.customer_name.as_deref().unwrap_or("-"), 25)
                    );
                }
                println!("\n{} submission(s)", submissions.len());
            }
            OutputFormat::Json => println!("{}", to_json(submissions)),
            OutputFormat::Quiet => {
                for s in submissions {
                    println!("{}", s.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
}

fn has_fields(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// First 8 characters of an id
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("crème brûlée balm", 8), "crème...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("3f2a9c1e-77b0-4d2e"), "3f2a9c1e");
        assert_eq!(short_id("42"), "42");
    }

    #[test]
    fn test_has_fields() {
        assert!(!has_fields(&serde_json::json!({})));
        assert!(!has_fields(&serde_json::Value::Null));
        assert!(has_fields(&serde_json::json!({"qty": 1})));
    }

    #[test]
    fn test_price_uses_currency() {
        let output = Output::new(OutputFormat::Human).with_currency("₹");
        assert_eq!(output.price(Price::from_major(1299)), "₹1,299.00");
    }
}
