//! Basic flow: login, report download with retry, e-mail dispatch.

use async_trait::async_trait;
use botflow::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    user: String,
    authenticated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Report {
    file: String,
    rows: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Delivery {
    recipients: Vec<String>,
    sent: bool,
}

#[derive(Debug)]
struct LoginStep;

#[async_trait]
impl Step for LoginStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        println!("  -> authenticating user...");
        Ok(Some(payload(Session {
            user: "admin".to_string(),
            authenticated: true,
        })))
    }

    fn name(&self) -> StepName {
        StepName::new("login")
    }

    fn description(&self) -> Option<&str> {
        Some("signs in with configured credentials")
    }
}

#[derive(Debug)]
struct DownloadReportStep;

#[async_trait]
impl Step for DownloadReportStep {
    async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        let user = ctx
            .get::<Session>("login")
            .map(|s| s.user.clone())
            .ok_or_else(|| StepError::validation("no session in context"))?;
        println!("  -> downloading report for '{user}'...");
        Ok(Some(payload(Report {
            file: "report_february.csv".to_string(),
            rows: 1523,
        })))
    }

    fn name(&self) -> StepName {
        StepName::new("download_report")
    }

    fn description(&self) -> Option<&str> {
        Some("downloads the monthly report as CSV")
    }
}

#[derive(Debug)]
struct SendEmailStep;

#[async_trait]
impl Step for SendEmailStep {
    async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        let file = ctx
            .get::<Report>("download_report")
            .map(|r| r.file.clone())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  -> sending '{file}' by e-mail...");
        Ok(Some(payload(Delivery {
            recipients: vec!["team@company.com".to_string()],
            sent: true,
        })))
    }

    fn name(&self) -> StepName {
        StepName::new("send_email")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let flow = Flow::new("monthly report")
        .step(LoginStep)
        .step_with_retry(
            DownloadReportStep,
            RetryPolicy::exponential(3, Duration::from_millis(100)),
        )
        .step(SendEmailStep);

    println!("Executing: {}", flow.name());

    let results = flow.run().await?;

    println!("\nExecution summary:");
    for result in &results {
        println!(
            "  {} - {} attempt(s), {:.3}s",
            result.status,
            result.attempts,
            result.duration.as_secs_f64()
        );
    }

    Ok(())
}
