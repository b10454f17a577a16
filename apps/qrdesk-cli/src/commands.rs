//! CLI commands. Each one calls the service and returns JSON for stdout.

use anyhow::{bail, Result};
use clap::Subcommand;
use qrdesk_core::report::{ReportFilter, ReportType};
use qrdesk_core::{QrStatus, RequestStatus};
use qrdesk_service::QrDeskService;
use qrdesk_store::{QrCodeFilter, RequestFilter};
use serde_json::{json, Value};
use tracing::info;

/// The seeded allocation request the demo approves.
const DEMO_REQUEST_ID: &str = "ar-demo-1";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Dashboard statistics
    Dashboard {
        /// Limit to one branch
        #[arg(long = "branch", value_name = "ID")]
        branch_id: Option<String>,
    },

    /// Audit scorecard
    Scorecard {
        /// Limit to one branch
        #[arg(long = "branch", value_name = "ID")]
        branch_id: Option<String>,
    },

    /// Audit report
    Report {
        /// compliance | security | performance | user_activity
        report_type: ReportType,
    },

    /// List QR codes
    QrCodes {
        /// Only codes in this status
        #[arg(long)]
        status: Option<QrStatus>,
    },

    /// Run the allocation-approval scenario
    Demo,
}

pub async fn run(service: &QrDeskService, actor_id: &str, command: Command) -> Result<Value> {
    let output = match command {
        Command::Dashboard { branch_id } => {
            serde_json::to_value(service.get_dashboard_stats(actor_id, branch_id.as_deref()).await?)?
        }
        Command::Scorecard { branch_id } => serde_json::to_value(
            service
                .generate_audit_scorecard(actor_id, branch_id.as_deref())
                .await?,
        )?,
        Command::Report { report_type } => serde_json::to_value(
            service
                .generate_audit_report(actor_id, report_type, ReportFilter::default())
                .await?,
        )?,
        Command::QrCodes { status } => {
            let filter = QrCodeFilter {
                status,
                ..Default::default()
            };
            serde_json::to_value(service.get_qr_codes(actor_id, filter).await?)?
        }
        Command::Demo => demo(service, actor_id).await?,
    };
    Ok(output)
}

/// Approves the seeded branch request and shows the pool before and after.
async fn demo(service: &QrDeskService, actor_id: &str) -> Result<Value> {
    let pending = service
        .get_allocation_requests(
            actor_id,
            RequestFilter {
                status: Some(RequestStatus::Pending),
                ..Default::default()
            },
        )
        .await?;
    if !pending.iter().any(|r| r.id == DEMO_REQUEST_ID) {
        bail!("request {} is not pending; start from fresh demo data", DEMO_REQUEST_ID);
    }

    let before = service.get_dashboard_stats(actor_id, None).await?;
    let request = service
        .approve_request(actor_id, DEMO_REQUEST_ID, Some("Approved from the CLI demo".to_string()))
        .await?;
    let after = service.get_dashboard_stats(actor_id, None).await?;

    info!(
        request_id = DEMO_REQUEST_ID,
        allocated = request.allocated_qr_ids.len(),
        "Demo allocation approved"
    );

    Ok(json!({
        "request": request,
        "unallocatedBefore": before.qr_codes.unallocated,
        "unallocatedAfter": after.qr_codes.unallocated,
        "branchId": request.branch_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrdesk_store::fixtures::{ADMIN_ID, DEMO_POOL_SIZE, SALES_1_ID};

    #[tokio::test]
    async fn test_demo_scenario() {
        let service = QrDeskService::demo().unwrap();
        let output = run(&service, ADMIN_ID, Command::Demo).await.unwrap();

        assert_eq!(output["unallocatedBefore"], json!(DEMO_POOL_SIZE));
        assert_eq!(output["unallocatedAfter"], json!(DEMO_POOL_SIZE - 25));

        // Second run has nothing left to approve
        assert!(run(&service, ADMIN_ID, Command::Demo).await.is_err());
    }

    #[tokio::test]
    async fn test_refusal_surfaces_as_error() {
        let service = QrDeskService::demo().unwrap();
        let err = run(
            &service,
            SALES_1_ID,
            Command::Report {
                report_type: ReportType::Security,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("[Forbidden]"));
    }
}
