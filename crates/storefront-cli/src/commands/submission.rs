//! Submission command handlers

use anyhow::{Context, Result};

use storefront_core::{Session, Storefront, SubmissionStatus};

use super::{confirm, resolve_id, warn_if_load_failed};
use crate::output::Output;

/// List submissions, optionally filtered by status and form type
pub fn list(
    shop: &Storefront,
    session: &Session,
    status: Option<String>,
    form_type: Option<String>,
    output: &Output,
) -> Result<()> {
    let submissions = shop.submissions(session)?;
    warn_if_load_failed(submissions, output);

    let status = status.map(SubmissionStatus::from);
    let rows: Vec<_> = submissions
        .items()
        .iter()
        .filter(|s| status.as_ref().map_or(true, |st| &s.status == st))
        .filter(|s| {
            form_type
                .as_deref()
                .map_or(true, |t| s.form_type.eq_ignore_ascii_case(t))
        })
        .cloned()
        .collect();

    output.print_submissions(&rows);
    Ok(())
}

/// Show a single submission
pub fn show(shop: &Storefront, session: &Session, id: String, output: &Output) -> Result<()> {
    let submissions = shop.submissions(session)?;
    let id = resolve_id(&submissions.items(), &id, "submission")?;
    let submission = submissions
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Submission not found: {}", id))?;

    output.print_submission(submission);
    Ok(())
}

/// Move a submission to a new status
pub async fn set_status(
    shop: &mut Storefront,
    session: &Session,
    id: String,
    status: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(&shop.submissions(session)?.items(), &id, "submission")?;
    let status = SubmissionStatus::from(status.trim().to_lowercase());

    let submission = shop
        .set_submission_status(session, &id, status)
        .await
        .context("Failed to update submission status")?;

    output.success(&format!("Submission {} is now {}", id, submission.status));
    Ok(())
}

/// Replace the operator notes on a submission
pub async fn note(
    shop: &mut Storefront,
    session: &Session,
    id: String,
    text: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(&shop.submissions(session)?.items(), &id, "submission")?;

    shop.set_submission_notes(session, &id, &text)
        .await
        .context("Failed to save notes")?;

    output.success(&format!("Saved notes on submission {}", id));
    Ok(())
}

/// Delete a submission
pub async fn delete(
    shop: &mut Storefront,
    session: &Session,
    id: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(&shop.submissions(session)?.items(), &id, "submission")?;

    if output.should_prompt() {
        println!("Delete submission: {}", id);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    shop.delete_submission(session, &id)
        .await
        .context("Failed to delete submission")?;

    output.success(&format!("Deleted submission: {}", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use storefront_core::{Backend, Config, NewSubmission, RemoteStore};
    use tempfile::TempDir;

    async fn shop_with_submission(temp_dir: &TempDir) -> (Storefront, Session, String) {
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            backend: Backend::Mock,
            user_id: Some("owner".to_string()),
            ..Config::default()
        };
        let mut shop = Storefront::open_with_config(config).await.unwrap();
        let created = shop
            .ingress_state()
            .unwrap()
            .submissions
            .insert(&NewSubmission::new("order", "Bridal Package"))
            .await
            .unwrap();
        shop.refresh().await;
        let session = shop.session().await.unwrap();
        (shop, session, created.id)
    }

    #[tokio::test]
    async fn test_status_and_notes() {
        let temp_dir = TempDir::new().unwrap();
        let (mut shop, session, id) = shop_with_submission(&temp_dir).await;
        let output = Output::new(OutputFormat::Quiet);

        set_status(&mut shop, &session, id.clone(), "Completed".to_string(), &output)
            .await
            .unwrap();
        note(&mut shop, &session, id.clone(), "Shipped".to_string(), &output)
            .await
            .unwrap();

        let submission = shop.submissions(&session).unwrap().get(&id).cloned().unwrap();
        assert_eq!(submission.status, SubmissionStatus::Completed);
        assert_eq!(submission.notes.as_deref(), Some("Shipped"));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let (mut shop, session, id) = shop_with_submission(&temp_dir).await;
        let output = Output::new(OutputFormat::Quiet);

        delete(&mut shop, &session, id, &output).await.unwrap();
        assert!(shop.submissions(&session).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_customer_cannot_list() {
        let temp_dir = TempDir::new().unwrap();
        let (shop, _, _) = shop_with_submission(&temp_dir).await;
        let visitor = shop.establish_session("visitor").await.unwrap();
        let output = Output::new(OutputFormat::Quiet);

        assert!(list(&shop, &visitor, None, None, &output).is_err());
    }
}
