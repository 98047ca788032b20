//! Status command handler

use anyhow::Result;

use storefront_core::{Session, Storefront, SubmissionStatus};

use crate::output::{Output, OutputFormat};

/// Show backend, session and table status
pub async fn show(shop: &Storefront, output: &Output) -> Result<()> {
    let config = shop.config();
    let catalog = shop.catalog();

    // A missing or unknown user is reported, not fatal
    let session: Option<Session> = match config.user_id.as_deref() {
        Some(user_id) => shop.establish_session(user_id).await.ok(),
        None => None,
    };
    let submissions = session.as_ref().and_then(|s| shop.submissions(s).ok());
    let pending = submissions.map(|c| {
        c.items()
            .iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .count()
    });

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store_name": config.store_name,
                    "backend": config.backend.to_string(),
                    "backend_url": config.backend_url,
                    "user_id": config.user_id,
                    "role": session.as_ref().map(|s| s.role().to_string()),
                    "products": {
                        "count": catalog.len(),
                        "load_error": catalog.last_load_error().map(|e| e.to_string()),
                    },
                    "submissions": submissions.map(|c| serde_json::json!({
                        "count": c.len(),
                        "pending": pending,
                        "load_error": c.last_load_error().map(|e| e.to_string()),
                    })),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.backend);
        }
        OutputFormat::Human => {
            println!("{} Status", config.store_name);
            println!("================");
            println!();
            println!("Backend:");
            println!("  Mode: {}", config.backend);
            if let Some(ref url) = config.backend_url {
                println!("  URL:  {}", url);
            }
            println!("  Data: {}", config.data_dir.display());
            println!();
            println!("Session:");
            match (&config.user_id, &session) {
                (Some(user), Some(s)) => println!("  {} ({})", user, s.role()),
                (Some(user), None) => println!("  {} (role lookup failed)", user),
                (None, _) => println!("  (no user_id configured)"),
            }
            println!();
            println!("Contents:");
            match catalog.last_load_error() {
                Some(e) => println!("  Products:    unavailable ({})", e),
                None => println!("  Products:    {}", catalog.len()),
            }
            match (submissions, pending) {
                (Some(c), _) if c.last_load_error().is_some() => {
                    println!("  Submissions: unavailable")
                }
                (Some(c), Some(p)) => println!("  Submissions: {} ({} pending)", c.len(), p),
                _ => println!("  Submissions: (admin only)"),
            }
        }
    }

    Ok(())
}
