//! # Audit Reports
//!
//! Four report types, each aggregated from the live records.
//!
//! ```text
//! ┌────────────────┬────────────────────────────────────────────────────┐
//! │ compliance     │ scorecard, status counts, open high-risk items     │
//! │ security       │ blocked QR codes and reasons, inactive users,      │
//! │                │ users by role, block actions in period             │
//! │ performance    │ per-branch held / issued / issuance rate,          │
//! │                │ request approval rate, mean decision time          │
//! │ user_activity  │ audit log entries per actor and per action type    │
//! └────────────────┴────────────────────────────────────────────────────┘
//! ```
//!
//! A [`ReportFilter`] narrows everything to one branch and/or a time window.
//! Audit log entries carry no branch, so for those the branch filter keeps
//! entries whose actor belongs to the branch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::scorecard::{generate_scorecard, AuditScorecard};
use crate::types::{
    AllocationRequest, AuditAction, AuditItem, AuditLog, Branch, MerchantRequest, QrCode,
    QrStatus, RequestStatus, Review, User,
};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Compliance,
    Security,
    Performance,
    UserActivity,
}

impl ReportType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReportType::Compliance => "compliance",
            ReportType::Security => "security",
            ReportType::Performance => "performance",
            ReportType::UserActivity => "user_activity",
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            ReportType::Compliance => "Compliance Report",
            ReportType::Security => "Security Report",
            ReportType::Performance => "Branch Performance Report",
            ReportType::UserActivity => "User Activity Report",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "compliance" => Ok(ReportType::Compliance),
            "security" => Ok(ReportType::Security),
            "performance" => Ok(ReportType::Performance),
            "user_activity" => Ok(ReportType::UserActivity),
            other => Err(ValidationError::InvalidFormat {
                field: "report_type".to_string(),
                reason: format!("unknown report type '{}'", other),
            }),
        }
    }
}

/// Branch and time window a report covers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    pub branch_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl ReportFilter {
    pub fn for_branch(branch_id: impl Into<String>) -> Self {
        ReportFilter {
            branch_id: Some(branch_id.into()),
            ..Default::default()
        }
    }

    /// Inclusive on both ends.
    pub fn in_period(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "period".to_string(),
                    reason: "from must not be after to".to_string(),
                });
            }
        }
        Ok(())
    }

    fn matches_branch(&self, branch_id: Option<&str>) -> bool {
        match self.branch_id.as_deref() {
            Some(wanted) => branch_id == Some(wanted),
            None => true,
        }
    }
}

/// One headline number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetric {
    pub label: String,
    pub value: u64,
    /// "count", "percent" or "minutes".
    pub unit: String,
}

impl ReportMetric {
    fn count(label: &str, value: usize) -> Self {
        ReportMetric {
            label: label.to_string(),
            value: value as u64,
            unit: "count".to_string(),
        }
    }

    fn percent(label: &str, value: u64) -> Self {
        ReportMetric {
            label: label.to_string(),
            value,
            unit: "percent".to_string(),
        }
    }

    fn minutes(label: &str, value: u64) -> Self {
        ReportMetric {
            label: label.to_string(),
            value,
            unit: "minutes".to_string(),
        }
    }
}

/// A titled table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportSection {
    fn new(title: &str, columns: &[&str]) -> Self {
        ReportSection {
            title: title.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub report_type: ReportType,
    pub title: String,
    pub filter: ReportFilter,
    pub summary: Vec<ReportMetric>,
    pub sections: Vec<ReportSection>,
    /// Present on compliance reports.
    pub scorecard: Option<AuditScorecard>,
    pub recommendations: Vec<String>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
}

/// Borrowed view of every table a report reads.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub qr_codes: &'a [QrCode],
    pub branches: &'a [Branch],
    pub users: &'a [User],
    pub allocation_requests: &'a [AllocationRequest],
    pub merchant_requests: &'a [MerchantRequest],
    pub audit_items: &'a [AuditItem],
    pub audit_logs: &'a [AuditLog],
}

// =============================================================================
// Helpers
// =============================================================================

/// Half-up integer percentage; 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u64 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (part as u64, whole as u64);
    (200 * part + whole) / (2 * whole)
}

impl<'a> ReportInput<'a> {
    fn user(&self, id: &str) -> Option<&'a User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn logs_in_scope(&self, filter: &ReportFilter) -> Vec<&'a AuditLog> {
        self.audit_logs
            .iter()
            .filter(|log| filter.in_period(log.timestamp))
            .filter(|log| match filter.branch_id.as_deref() {
                Some(_) => {
                    let actor_branch = self
                        .user(&log.actor_user_id)
                        .and_then(|u| u.branch_id.as_deref());
                    filter.matches_branch(actor_branch)
                }
                None => true,
            })
            .collect()
    }

    fn reviews_in_scope(&self, filter: &ReportFilter) -> Vec<(&'a Review, DateTime<Utc>)> {
        let allocations = self
            .allocation_requests
            .iter()
            .filter(|r| filter.matches_branch(Some(r.branch_id.as_str())) && filter.in_period(r.created_at))
            .map(|r| (&r.review, r.created_at));
        let merchants = self
            .merchant_requests
            .iter()
            .filter(|r| filter.matches_branch(Some(r.branch_id.as_str())) && filter.in_period(r.created_at))
            .map(|r| (&r.review, r.created_at));
        allocations.chain(merchants).collect()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Builds a report of the given type.
pub fn build_report(
    report_type: ReportType,
    input: &ReportInput<'_>,
    filter: &ReportFilter,
    now: DateTime<Utc>,
) -> AuditReport {
    let mut report = AuditReport {
        report_type,
        title: report_type.title().to_string(),
        filter: filter.clone(),
        summary: Vec::new(),
        sections: Vec::new(),
        scorecard: None,
        recommendations: Vec::new(),
        generated_at: now,
    };

    match report_type {
        ReportType::Compliance => compliance(&mut report, input, filter, now),
        ReportType::Security => security(&mut report, input, filter),
        ReportType::Performance => performance(&mut report, input, filter),
        ReportType::UserActivity => user_activity(&mut report, input, filter),
    }

    report
}

fn compliance(report: &mut AuditReport, input: &ReportInput<'_>, filter: &ReportFilter, now: DateTime<Utc>) {
    let items: Vec<AuditItem> = input
        .audit_items
        .iter()
        .filter(|item| filter.in_period(item.updated_at))
        .cloned()
        .collect();
    let card = generate_scorecard(&items, filter.branch_id.as_deref(), now);

    report.summary = vec![
        ReportMetric::percent("Overall compliance score", u64::from(card.overall_score)),
        ReportMetric::count("Audit items", card.status_summary.total()),
        ReportMetric::count("Compliant", card.status_summary.compliant),
        ReportMetric::count("Non-compliant", card.status_summary.non_compliant),
        ReportMetric::count("Requires action", card.status_summary.requires_action),
        ReportMetric::count("Under review", card.status_summary.under_review),
        ReportMetric::count("Open high-risk findings", card.open_high_risk_findings),
    ];

    let mut categories = ReportSection::new("Category scores", &["Category", "Score", "Items"]);
    for category in &card.categories {
        categories.push(vec![
            category.label.clone(),
            category.score.to_string(),
            category.item_count.to_string(),
        ]);
    }

    let mut open = ReportSection::new(
        "Open high-risk items",
        &["Title", "Category", "Risk", "Status", "Findings"],
    );
    for item in items.iter().filter(|item| {
        filter.matches_branch(item.branch_id.as_deref())
            && item.risk_level.is_high()
            && item.status.is_open_finding()
    }) {
        open.push(vec![
            item.title.clone(),
            item.category.label().to_string(),
            item.risk_level.to_string(),
            item.status.to_string(),
            item.findings.clone().unwrap_or_default(),
        ]);
    }

    report.sections = vec![categories, open];
    report.recommendations = card.recommendations.clone();
    report.scorecard = Some(card);
}

fn security(report: &mut AuditReport, input: &ReportInput<'_>, filter: &ReportFilter) {
    let blocked: Vec<&QrCode> = input
        .qr_codes
        .iter()
        .filter(|qr| qr.status == QrStatus::Blocked)
        .filter(|qr| filter.matches_branch(qr.allocated_branch_id.as_deref()))
        .collect();

    let users: Vec<&User> = input
        .users
        .iter()
        .filter(|u| filter.matches_branch(u.branch_id.as_deref()))
        .collect();
    let inactive = users.iter().filter(|u| !u.is_active).count();

    let block_actions = input
        .logs_in_scope(filter)
        .into_iter()
        .filter(|log| log.action_type == AuditAction::QrBlocked)
        .count();

    report.summary = vec![
        ReportMetric::count("Blocked QR codes", blocked.len()),
        ReportMetric::count("Block actions in period", block_actions),
        ReportMetric::count("Users", users.len()),
        ReportMetric::count("Inactive users", inactive),
    ];

    let mut reasons: BTreeMap<String, usize> = BTreeMap::new();
    for qr in &blocked {
        let reason = qr.blocked_reason.clone().unwrap_or_else(|| "unspecified".to_string());
        *reasons.entry(reason).or_default() += 1;
    }
    let mut reason_section = ReportSection::new("Block reasons", &["Reason", "QR codes"]);
    for (reason, count) in reasons {
        reason_section.push(vec![reason, count.to_string()]);
    }

    let mut roles: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for user in &users {
        let entry = roles.entry(user.role.as_str()).or_default();
        entry.0 += 1;
        if user.is_active {
            entry.1 += 1;
        }
    }
    let mut role_section = ReportSection::new("Users by role", &["Role", "Users", "Active"]);
    for (role, (total, active)) in roles {
        role_section.push(vec![role.to_string(), total.to_string(), active.to_string()]);
    }

    let mut inactive_section =
        ReportSection::new("Inactive users", &["Username", "Full name", "Role", "Branch"]);
    for user in users.iter().filter(|u| !u.is_active) {
        inactive_section.push(vec![
            user.username.clone(),
            user.full_name.clone(),
            user.role.to_string(),
            user.branch_id.clone().unwrap_or_default(),
        ]);
    }

    report.sections = vec![reason_section, role_section, inactive_section];

    if !blocked.is_empty() {
        report.recommendations.push(format!(
            "Investigate {} blocked QR code(s) and retire those that cannot be recovered",
            blocked.len()
        ));
    }
    if inactive > 0 {
        report.recommendations.push(format!(
            "Run the user assignment sync to release QR codes held by {} inactive user(s)",
            inactive
        ));
    }
    if report.recommendations.is_empty() {
        report
            .recommendations
            .push("No security concerns found in the selected scope".to_string());
    }
}

fn performance(report: &mut AuditReport, input: &ReportInput<'_>, filter: &ReportFilter) {
    let mut table = ReportSection::new(
        "Branch performance",
        &["Branch", "Name", "Region", "Held", "Issued", "Issuance rate %"],
    );

    let mut total_held = 0;
    let mut total_issued = 0;
    for branch in input
        .branches
        .iter()
        .filter(|b| filter.matches_branch(Some(b.id.as_str())))
    {
        let held: Vec<&QrCode> = input
            .qr_codes
            .iter()
            .filter(|qr| qr.belongs_to_branch(&branch.id))
            .collect();
        let issued = held
            .iter()
            .filter(|qr| qr.status == QrStatus::Issued)
            .filter(|qr| qr.issued_at.map_or(false, |at| filter.in_period(at)))
            .count();

        total_held += held.len();
        total_issued += issued;
        table.push(vec![
            branch.code.clone(),
            branch.name.clone(),
            branch.region.clone(),
            held.len().to_string(),
            issued.to_string(),
            percent(issued, held.len()).to_string(),
        ]);
    }

    let reviews = input.reviews_in_scope(filter);
    let decided: Vec<(&Review, DateTime<Utc>)> = reviews
        .iter()
        .copied()
        .filter(|(review, _)| {
            matches!(review.status, RequestStatus::Approved | RequestStatus::Rejected)
        })
        .collect();
    let approved = decided
        .iter()
        .filter(|(review, _)| review.status == RequestStatus::Approved)
        .count();

    let decision_minutes: Vec<u64> = decided
        .iter()
        .filter_map(|(review, created)| review.decided_at.map(|at| (at - *created).num_minutes()))
        .map(|minutes| minutes.max(0) as u64)
        .collect();
    let mean_decision = if decision_minutes.is_empty() {
        0
    } else {
        decision_minutes.iter().sum::<u64>() / decision_minutes.len() as u64
    };
    let open = reviews.iter().filter(|(review, _)| review.status.is_open()).count();

    report.summary = vec![
        ReportMetric::count("QR codes held by branches", total_held),
        ReportMetric::count("QR codes issued", total_issued),
        ReportMetric::percent("Issuance rate", percent(total_issued, total_held)),
        ReportMetric::count("Requests submitted", reviews.len()),
        ReportMetric::count("Requests open", open),
        ReportMetric::percent("Request approval rate", percent(approved, decided.len())),
        ReportMetric::minutes("Mean decision time", mean_decision),
    ];
    report.sections = vec![table];

    if total_held > 0 && percent(total_issued, total_held) < 50 {
        report.recommendations.push(
            "Less than half of branch inventory is issued; review allocation sizes".to_string(),
        );
    }
    if open > 0 {
        report
            .recommendations
            .push(format!("{} request(s) are waiting on a decision", open));
    }
    if report.recommendations.is_empty() {
        report
            .recommendations
            .push("Branch performance is within expected ranges".to_string());
    }
}

fn user_activity(report: &mut AuditReport, input: &ReportInput<'_>, filter: &ReportFilter) {
    let logs = input.logs_in_scope(filter);

    let mut by_actor: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_action: BTreeMap<AuditAction, usize> = BTreeMap::new();
    for log in &logs {
        *by_actor.entry(log.actor_user_id.as_str()).or_default() += 1;
        *by_action.entry(log.action_type).or_default() += 1;
    }

    let mut actors: Vec<(&str, usize)> = by_actor.into_iter().collect();
    actors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut actor_section =
        ReportSection::new("Activity by user", &["User", "Username", "Role", "Actions"]);
    for (actor_id, count) in &actors {
        let user = input.user(actor_id);
        actor_section.push(vec![
            actor_id.to_string(),
            user.map(|u| u.username.clone()).unwrap_or_default(),
            user.map(|u| u.role.to_string()).unwrap_or_default(),
            count.to_string(),
        ]);
    }

    let mut action_section = ReportSection::new("Activity by action", &["Action", "Count"]);
    for (action, count) in &by_action {
        action_section.push(vec![action.to_string(), count.to_string()]);
    }

    report.summary = vec![
        ReportMetric::count("Logged actions", logs.len()),
        ReportMetric::count("Active users", actors.len()),
        ReportMetric::count("Distinct action types", by_action.len()),
    ];
    report.sections = vec![actor_section, action_section];

    match actors.first() {
        Some((actor, count)) => report.recommendations.push(format!(
            "Most active user {} performed {} action(s); confirm the activity matches their role",
            actor, count
        )),
        None => report
            .recommendations
            .push("No recorded activity in the selected period".to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchType, QrType, Role};
    use chrono::Duration;

    fn branch(id: &str) -> Branch {
        Branch {
            id: id.into(),
            code: format!("BR-{}", id),
            name: format!("Branch {}", id),
            region: "Bagmati".into(),
            branch_type: BranchType::Domestic,
            manager_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn user(id: &str, role: Role, branch: Option<&str>, active: bool) -> User {
        User {
            id: id.into(),
            username: id.into(),
            full_name: id.into(),
            email: format!("{}@bank.test", id),
            role,
            branch_id: branch.map(str::to_string),
            is_active: active,
            created_at: Utc::now(),
        }
    }

    fn qr(branch: Option<&str>, status: QrStatus) -> QrCode {
        let mut code = QrCode::new_unallocated(crate::types::new_id(), QrType::Static, "batch", Utc::now());
        code.allocated_branch_id = branch.map(str::to_string);
        code.status = status;
        if status == QrStatus::Issued {
            code.issued_at = Some(Utc::now());
        }
        if status == QrStatus::Blocked {
            code.blocked_reason = Some("tampered".into());
        }
        code
    }

    fn log(actor: &str, action: AuditAction) -> AuditLog {
        AuditLog::new(actor, action, "QrCode", "qr-1", serde_json::json!({}), Utc::now())
    }

    struct Fixture {
        qr_codes: Vec<QrCode>,
        branches: Vec<Branch>,
        users: Vec<User>,
        logs: Vec<AuditLog>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                qr_codes: vec![
                    qr(Some("1"), QrStatus::Allocated),
                    qr(Some("1"), QrStatus::Issued),
                    qr(Some("1"), QrStatus::Issued),
                    qr(Some("1"), QrStatus::Blocked),
                    qr(Some("2"), QrStatus::Allocated),
                    qr(None, QrStatus::Unallocated),
                ],
                branches: vec![branch("1"), branch("2")],
                users: vec![
                    user("admin", Role::SystemAdmin, None, true),
                    user("mgr-1", Role::BranchManager, Some("1"), true),
                    user("sales-2", Role::SalesUser, Some("2"), false),
                ],
                logs: vec![
                    log("mgr-1", AuditAction::QrBlocked),
                    log("mgr-1", AuditAction::QrIssued),
                    log("admin", AuditAction::QrAllocated),
                ],
            }
        }

        fn input(&self) -> ReportInput<'_> {
            ReportInput {
                qr_codes: &self.qr_codes,
                branches: &self.branches,
                users: &self.users,
                allocation_requests: &[],
                merchant_requests: &[],
                audit_items: &[],
                audit_logs: &self.logs,
            }
        }
    }

    #[test]
    fn test_report_type_parse() {
        assert_eq!("user-activity".parse::<ReportType>().unwrap(), ReportType::UserActivity);
        assert_eq!("Compliance".parse::<ReportType>().unwrap(), ReportType::Compliance);
        assert!("financial".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_percent_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_filter_period() {
        let now = Utc::now();
        let filter = ReportFilter {
            branch_id: None,
            from: Some(now - Duration::days(1)),
            to: Some(now),
        };
        assert!(filter.in_period(now));
        assert!(!filter.in_period(now - Duration::days(2)));

        let inverted = ReportFilter {
            branch_id: None,
            from: Some(now),
            to: Some(now - Duration::days(1)),
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_performance_per_branch() {
        let fx = Fixture::new();
        let report = build_report(ReportType::Performance, &fx.input(), &ReportFilter::default(), Utc::now());
        let table = &report.sections[0];
        assert_eq!(table.rows.len(), 2);
        // Branch 1 holds 4, issued 2
        assert_eq!(table.rows[0][3], "4");
        assert_eq!(table.rows[0][4], "2");
        assert_eq!(table.rows[0][5], "50");
        assert_eq!(report.summary[0].value, 5);
    }

    #[test]
    fn test_security_scoped_to_branch() {
        let fx = Fixture::new();
        let report = build_report(
            ReportType::Security,
            &fx.input(),
            &ReportFilter::for_branch("2"),
            Utc::now(),
        );
        assert_eq!(report.summary[0].value, 0); // no blocked in branch 2
        assert_eq!(report.summary[2].value, 1); // one user in branch 2
        assert_eq!(report.summary[3].value, 1); // and inactive

        let global = build_report(ReportType::Security, &fx.input(), &ReportFilter::default(), Utc::now());
        assert_eq!(global.summary[0].value, 1);
        assert_eq!(global.summary[1].value, 1);
        assert_eq!(global.sections[0].rows[0], vec!["tampered".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_user_activity_counts() {
        let fx = Fixture::new();
        let report = build_report(ReportType::UserActivity, &fx.input(), &ReportFilter::default(), Utc::now());
        assert_eq!(report.summary[0].value, 3);
        assert_eq!(report.sections[0].rows[0][0], "mgr-1");
        assert_eq!(report.sections[0].rows[0][3], "2");

        let scoped = build_report(
            ReportType::UserActivity,
            &fx.input(),
            &ReportFilter::for_branch("1"),
            Utc::now(),
        );
        assert_eq!(scoped.summary[0].value, 2);
    }

    #[test]
    fn test_compliance_embeds_scorecard() {
        let fx = Fixture::new();
        let report = build_report(ReportType::Compliance, &fx.input(), &ReportFilter::default(), Utc::now());
        let card = report.scorecard.unwrap();
        assert_eq!(card.overall_score, 100);
        assert_eq!(report.summary[0].value, 100);
        assert_eq!(report.sections[0].rows.len(), 6);
    }
}
