//! # Compliance Scorecard
//!
//! Turns the auditors' checklist into one number per category and one
//! overall number.
//!
//! ## Scoring
//! ```text
//! items ──► group by category (6 fixed) ──► rounded mean per category
//!                                               │   (missing score = 100,
//!                                               │    empty category = 100)
//!                                               ▼
//!                                  rounded mean of the 6 ──► overall
//!
//! open high-risk findings = high/critical items that are
//!                           non_compliant or requires_action
//!      > 2 ──► high      > 0 ──► medium      else ──► low
//! ```
//!
//! Rounding is half-up on integers: `(2·sum + n) / (2·n)`. No floats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{AuditCategory, AuditItem, ComplianceStatus, RiskLevel};
use crate::{DEFAULT_SCORE, HIGH_RISK_THRESHOLD};

// =============================================================================
// Types
// =============================================================================

/// Score of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: AuditCategory,
    pub label: String,
    pub score: u8,
    pub item_count: usize,
}

/// How many items sit in each compliance status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub compliant: usize,
    pub non_compliant: usize,
    pub requires_action: usize,
    pub under_review: usize,
}

impl StatusSummary {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a AuditItem>) -> Self {
        let mut summary = StatusSummary::default();
        for item in items {
            match item.status {
                ComplianceStatus::Compliant => summary.compliant += 1,
                ComplianceStatus::NonCompliant => summary.non_compliant += 1,
                ComplianceStatus::RequiresAction => summary.requires_action += 1,
                ComplianceStatus::UnderReview => summary.under_review += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.compliant + self.non_compliant + self.requires_action + self.under_review
    }
}

/// The generated scorecard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditScorecard {
    /// `None` for the program-wide scorecard.
    pub branch_id: Option<String>,
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    /// Always six entries, in [`AuditCategory::ALL`] order.
    pub categories: Vec<CategoryScore>,
    pub status_summary: StatusSummary,
    pub open_high_risk_findings: usize,
    pub recommendations: Vec<String>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
}

// =============================================================================
// Scoring
// =============================================================================

/// Half-up rounded mean. `None` for an empty input.
///
/// ```rust
/// use qrdesk_core::scorecard::rounded_mean;
///
/// assert_eq!(rounded_mean([90, 91]), Some(91)); // 90.5 rounds up
/// assert_eq!(rounded_mean([80, 80, 81]), Some(80)); // 80.33 rounds down
/// assert_eq!(rounded_mean(std::iter::empty()), None);
/// ```
pub fn rounded_mean(values: impl IntoIterator<Item = u8>) -> Option<u8> {
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));

    if count == 0 {
        return None;
    }

    // Mean of u8 values never exceeds u8::MAX
    u8::try_from((2 * sum + count) / (2 * count)).ok()
}

/// Counts high/critical items that are still non-compliant or need action.
pub fn open_high_risk_findings<'a>(items: impl IntoIterator<Item = &'a AuditItem>) -> usize {
    items
        .into_iter()
        .filter(|item| item.risk_level.is_high() && item.status.is_open_finding())
        .count()
}

/// Maps the open high-risk finding count to a scorecard risk level.
pub const fn risk_level_for(open_high_risk: usize) -> RiskLevel {
    if open_high_risk > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if open_high_risk > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Scores a single category.
pub fn score_category(items: &[&AuditItem], category: AuditCategory) -> CategoryScore {
    let scores: Vec<u8> = items
        .iter()
        .filter(|item| item.category == category)
        .map(|item| item.score.unwrap_or(DEFAULT_SCORE))
        .collect();

    CategoryScore {
        category,
        label: category.label().to_string(),
        score: rounded_mean(scores.iter().copied()).unwrap_or(DEFAULT_SCORE),
        item_count: scores.len(),
    }
}

/// Builds the scorecard, optionally narrowed to one branch's items.
pub fn generate_scorecard(
    items: &[AuditItem],
    branch_id: Option<&str>,
    now: DateTime<Utc>,
) -> AuditScorecard {
    let scoped: Vec<&AuditItem> = items
        .iter()
        .filter(|item| match branch_id {
            Some(branch) => item.branch_id.as_deref() == Some(branch),
            None => true,
        })
        .collect();

    let categories: Vec<CategoryScore> = AuditCategory::ALL
        .iter()
        .map(|category| score_category(&scoped, *category))
        .collect();

    let overall_score =
        rounded_mean(categories.iter().map(|c| c.score)).unwrap_or(DEFAULT_SCORE);
    let status_summary = StatusSummary::from_items(scoped.iter().copied());
    let open_high_risk = open_high_risk_findings(scoped.iter().copied());
    let risk_level = risk_level_for(open_high_risk);

    AuditScorecard {
        branch_id: branch_id.map(str::to_string),
        overall_score,
        risk_level,
        recommendations: recommendations(&status_summary, risk_level),
        categories,
        status_summary,
        open_high_risk_findings: open_high_risk,
        generated_at: now,
    }
}

/// Canned recommendations keyed on which status buckets have items.
pub fn recommendations(summary: &StatusSummary, risk_level: RiskLevel) -> Vec<String> {
    let mut out = Vec::new();

    if summary.non_compliant > 0 {
        out.push(format!(
            "Address {} non-compliant item(s) immediately and document corrective actions",
            summary.non_compliant
        ));
    }
    if summary.requires_action > 0 {
        out.push(format!(
            "Complete remediation for {} item(s) requiring action before the next review cycle",
            summary.requires_action
        ));
    }
    if summary.under_review > 0 {
        out.push(format!(
            "Finalize the review of {} item(s) currently under review",
            summary.under_review
        ));
    }
    if risk_level == RiskLevel::High {
        out.push("Escalate open high-risk findings to senior management".to_string());
    }
    if out.is_empty() {
        out.push("Maintain current compliance practices and continue periodic reviews".to_string());
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(
        category: AuditCategory,
        risk: RiskLevel,
        status: ComplianceStatus,
        score: Option<u8>,
    ) -> AuditItem {
        AuditItem {
            id: crate::types::new_id(),
            title: "Check".into(),
            description: "Periodic check".into(),
            category,
            risk_level: risk,
            status,
            score,
            branch_id: None,
            findings: None,
            created_by: "u-auditor".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rounded_mean_half_up() {
        assert_eq!(rounded_mean([85, 90]), Some(88)); // 87.5
        assert_eq!(rounded_mean([100]), Some(100));
        assert_eq!(rounded_mean([0, 1]), Some(1)); // 0.5
        assert_eq!(rounded_mean([255, 255]), Some(255));
    }

    #[test]
    fn test_empty_scorecard_is_perfect() {
        let card = generate_scorecard(&[], None, Utc::now());
        assert_eq!(card.categories.len(), 6);
        assert!(card.categories.iter().all(|c| c.score == 100));
        assert_eq!(card.overall_score, 100);
        assert_eq!(card.risk_level, RiskLevel::Low);
        assert_eq!(card.recommendations.len(), 1);
    }

    #[test]
    fn test_missing_score_counts_as_hundred() {
        let items = vec![
            item(AuditCategory::QrManagement, RiskLevel::Low, ComplianceStatus::Compliant, Some(70)),
            item(AuditCategory::QrManagement, RiskLevel::Low, ComplianceStatus::Compliant, None),
        ];
        let card = generate_scorecard(&items, None, Utc::now());
        assert_eq!(card.categories[0].score, 85);
        assert_eq!(card.categories[0].item_count, 2);
    }

    #[test]
    fn test_overall_is_rounded_mean_of_categories() {
        let items = vec![
            item(AuditCategory::QrManagement, RiskLevel::Low, ComplianceStatus::Compliant, Some(61)),
            item(AuditCategory::UserAccess, RiskLevel::Low, ComplianceStatus::Compliant, Some(77)),
            item(AuditCategory::UserAccess, RiskLevel::Low, ComplianceStatus::Compliant, Some(80)),
            item(AuditCategory::DataSecurity, RiskLevel::Low, ComplianceStatus::Compliant, Some(93)),
        ];
        let card = generate_scorecard(&items, None, Utc::now());
        let expected = rounded_mean(card.categories.iter().map(|c| c.score)).unwrap();
        assert_eq!(card.overall_score, expected);

        // 61, 100, 79 (78.5), 100, 100, 93 => 533 / 6 = 88.83
        assert_eq!(card.categories[2].score, 79);
        assert_eq!(card.overall_score, 89);
    }

    #[test]
    fn test_risk_level_thresholds() {
        let open = |n: usize| -> Vec<AuditItem> {
            (0..n)
                .map(|_| {
                    item(
                        AuditCategory::MerchantKyc,
                        RiskLevel::Critical,
                        ComplianceStatus::NonCompliant,
                        Some(40),
                    )
                })
                .collect()
        };
        assert_eq!(generate_scorecard(&open(0), None, Utc::now()).risk_level, RiskLevel::Low);
        assert_eq!(generate_scorecard(&open(2), None, Utc::now()).risk_level, RiskLevel::Medium);
        assert_eq!(generate_scorecard(&open(3), None, Utc::now()).risk_level, RiskLevel::High);
    }

    #[test]
    fn test_low_risk_and_closed_items_do_not_count() {
        let items = vec![
            item(AuditCategory::MerchantKyc, RiskLevel::Medium, ComplianceStatus::NonCompliant, None),
            item(AuditCategory::MerchantKyc, RiskLevel::High, ComplianceStatus::Compliant, None),
            item(AuditCategory::MerchantKyc, RiskLevel::High, ComplianceStatus::UnderReview, None),
        ];
        assert_eq!(open_high_risk_findings(&items), 0);
    }

    #[test]
    fn test_branch_scoping() {
        let mut a = item(AuditCategory::BranchOperations, RiskLevel::Low, ComplianceStatus::Compliant, Some(50));
        a.branch_id = Some("b-1".into());
        let b = item(AuditCategory::BranchOperations, RiskLevel::Low, ComplianceStatus::Compliant, Some(90));

        let card = generate_scorecard(&[a, b], Some("b-1"), Utc::now());
        assert_eq!(card.categories[1].score, 50);
        assert_eq!(card.status_summary.total(), 1);
    }

    #[test]
    fn test_recommendations_follow_buckets() {
        let summary = StatusSummary {
            compliant: 2,
            non_compliant: 1,
            requires_action: 0,
            under_review: 3,
        };
        let recs = recommendations(&summary, RiskLevel::Medium);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("1 non-compliant"));
        assert!(recs[1].contains("3 item(s) currently under review"));
    }
}
