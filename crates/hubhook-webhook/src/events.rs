//! GitHub event catalogue
//!
//! Every event name GitHub documents for repository, organization and app
//! webhooks, with the top-level payload keys and `action` values it documents.
//! The catalogue is informational: routing is keyed by the raw event name and
//! payloads are never checked against it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Documented GitHub webhook event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BranchProtectionRule,
    CheckRun,
    CheckSuite,
    CodeScanningAlert,
    CommitComment,
    ContentReference,
    Create,
    Delete,
    DeployKey,
    Deployment,
    DeploymentStatus,
    Discussion,
    DiscussionComment,
    Fork,
    GithubAppAuthorization,
    Gollum,
    Installation,
    InstallationRepositories,
    IssueComment,
    Issues,
    Label,
    MarketplacePurchase,
    Member,
    Membership,
    Meta,
    Milestone,
    Organization,
    OrgBlock,
    Package,
    PageBuild,
    Ping,
    ProjectCard,
    ProjectColumn,
    Project,
    Public,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Push,
    Release,
    RepositoryDispatch,
    Repository,
    RepositoryImport,
    RepositoryVulnerabilityAlert,
    SecretScanningAlert,
    SecurityAdvisory,
    Sponsorship,
    Star,
    Status,
    Team,
    TeamAdd,
    Watch,
    WorkflowDispatch,
    WorkflowJob,
    WorkflowRun,
}

impl EventKind {
    /// Every documented event, in the platform's documentation order
    pub const ALL: [EventKind; 55] = [
        Self::BranchProtectionRule,
        Self::CheckRun,
        Self::CheckSuite,
        Self::CodeScanningAlert,
        Self::CommitComment,
        Self::ContentReference,
        Self::Create,
        Self::Delete,
        Self::DeployKey,
        Self::Deployment,
        Self::DeploymentStatus,
        Self::Discussion,
        Self::DiscussionComment,
        Self::Fork,
        Self::GithubAppAuthorization,
        Self::Gollum,
        Self::Installation,
        Self::InstallationRepositories,
        Self::IssueComment,
        Self::Issues,
        Self::Label,
        Self::MarketplacePurchase,
        Self::Member,
        Self::Membership,
        Self::Meta,
        Self::Milestone,
        Self::Organization,
        Self::OrgBlock,
        Self::Package,
        Self::PageBuild,
        Self::Ping,
        Self::ProjectCard,
        Self::ProjectColumn,
        Self::Project,
        Self::Public,
        Self::PullRequest,
        Self::PullRequestReview,
        Self::PullRequestReviewComment,
        Self::Push,
        Self::Release,
        Self::RepositoryDispatch,
        Self::Repository,
        Self::RepositoryImport,
        Self::RepositoryVulnerabilityAlert,
        Self::SecretScanningAlert,
        Self::SecurityAdvisory,
        Self::Sponsorship,
        Self::Star,
        Self::Status,
        Self::Team,
        Self::TeamAdd,
        Self::Watch,
        Self::WorkflowDispatch,
        Self::WorkflowJob,
        Self::WorkflowRun,
    ];

    /// Wire name, as sent in `x-github-event`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BranchProtectionRule => "branch_protection_rule",
            Self::CheckRun => "check_run",
            Self::CheckSuite => "check_suite",
            Self::CodeScanningAlert => "code_scanning_alert",
            Self::CommitComment => "commit_comment",
            Self::ContentReference => "content_reference",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::DeployKey => "deploy_key",
            Self::Deployment => "deployment",
            Self::DeploymentStatus => "deployment_status",
            Self::Discussion => "discussion",
            Self::DiscussionComment => "discussion_comment",
            Self::Fork => "fork",
            Self::GithubAppAuthorization => "github_app_authorization",
            Self::Gollum => "gollum",
            Self::Installation => "installation",
            Self::InstallationRepositories => "installation_repositories",
            Self::IssueComment => "issue_comment",
            Self::Issues => "issues",
            Self::Label => "label",
            Self::MarketplacePurchase => "marketplace_purchase",
            Self::Member => "member",
            Self::Membership => "membership",
            Self::Meta => "meta",
            Self::Milestone => "milestone",
            Self::Organization => "organization",
            Self::OrgBlock => "org_block",
            Self::Package => "package",
            Self::PageBuild => "page_build",
            Self::Ping => "ping",
            Self::ProjectCard => "project_card",
            Self::ProjectColumn => "project_column",
            Self::Project => "project",
            Self::Public => "public",
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::PullRequestReviewComment => "pull_request_review_comment",
            Self::Push => "push",
            Self::Release => "release",
            Self::RepositoryDispatch => "repository_dispatch",
            Self::Repository => "repository",
            Self::RepositoryImport => "repository_import",
            Self::RepositoryVulnerabilityAlert => "repository_vulnerability_alert",
            Self::SecretScanningAlert => "secret_scanning_alert",
            Self::SecurityAdvisory => "security_advisory",
            Self::Sponsorship => "sponsorship",
            Self::Star => "star",
            Self::Status => "status",
            Self::Team => "team",
            Self::TeamAdd => "team_add",
            Self::Watch => "watch",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::WorkflowJob => "workflow_job",
            Self::WorkflowRun => "workflow_run",
        }
    }

    /// Get category for this event type
    pub fn category(&self) -> &'static str {
        match self {
            Self::BranchProtectionRule
            | Self::CommitComment
            | Self::Create
            | Self::Delete
            | Self::DeployKey
            | Self::Fork
            | Self::Gollum
            | Self::Package
            | Self::PageBuild
            | Self::Public
            | Self::Push
            | Self::Release
            | Self::RepositoryDispatch
            | Self::Repository
            | Self::RepositoryImport
            | Self::Star
            | Self::Watch => "repository",
            Self::CheckRun | Self::CheckSuite | Self::Status => "checks",
            Self::CodeScanningAlert
            | Self::RepositoryVulnerabilityAlert
            | Self::SecretScanningAlert
            | Self::SecurityAdvisory => "security",
            Self::ContentReference
            | Self::GithubAppAuthorization
            | Self::Installation
            | Self::InstallationRepositories
            | Self::MarketplacePurchase => "app",
            Self::Deployment | Self::DeploymentStatus => "deployment",
            Self::Discussion | Self::DiscussionComment => "discussion",
            Self::IssueComment | Self::Issues | Self::Label | Self::Milestone => "issues",
            Self::Member
            | Self::Membership
            | Self::Organization
            | Self::OrgBlock
            | Self::Team
            | Self::TeamAdd => "organization",
            Self::Meta | Self::Ping => "hook",
            Self::ProjectCard | Self::ProjectColumn | Self::Project => "project",
            Self::PullRequest
            | Self::PullRequestReview
            | Self::PullRequestReviewComment => "pull_request",
            Self::Sponsorship => "sponsorship",
            Self::WorkflowDispatch | Self::WorkflowJob | Self::WorkflowRun => "actions",
        }
    }

    /// Top-level payload keys documented for this event.
    ///
    /// `rawHeaders`, `deliveryId` and `RequestId` are added to every event by
    /// the receiver and are not listed.
    pub fn documented_fields(&self) -> &'static [&'static str] {
        match self {
            Self::BranchProtectionRule => &[
                "action", "rule", "changes", "repository", "organization", "sender",
            ],
            Self::CheckRun => &[
                "action", "check_run", "requested_action", "repository", "organization",
                "installation", "sender",
            ],
            Self::CheckSuite => &[
                "action", "check_suite", "repository", "organization", "installation", "sender",
            ],
            Self::CodeScanningAlert => &[
                "action", "alert", "ref", "commit_oid", "repository", "organization",
                "installation", "sender",
            ],
            Self::CommitComment => &[
                "action", "comment", "repository", "organization", "installation", "sender",
            ],
            Self::ContentReference => &[
                "action", "content_reference", "repository", "installation", "sender",
            ],
            Self::Create => &[
                "ref", "ref_type", "master_branch", "description", "pusher_type", "repository",
                "organization", "installation", "sender",
            ],
            Self::Delete => &[
                "ref", "ref_type", "pusher_type", "repository", "organization", "installation",
                "sender",
            ],
            Self::DeployKey => &["action", "key", "repository", "organization", "sender"],
            Self::Deployment => &[
                "action", "deployment", "repository", "organization", "installation", "sender",
            ],
            Self::DeploymentStatus => &[
                "action", "deployment_status", "deployment", "repository", "organization",
                "installation", "sender",
            ],
            Self::Discussion => &["action", "discussion", "repository", "organization", "sender"],
            Self::DiscussionComment => &[
                "action", "comment", "discussion", "repository", "organization", "sender",
            ],
            Self::Fork => &["forkee", "repository", "organization", "installation", "sender"],
            Self::GithubAppAuthorization => &["action", "sender"],
            Self::Gollum => &["pages", "repository", "organization", "installation", "sender"],
            Self::Installation => &["action", "repositories", "installation", "sender"],
            Self::InstallationRepositories => &[
                "action", "repository_selection", "repositories_added", "repositories_removed",
                "installation", "sender",
            ],
            Self::IssueComment => &[
                "action", "changes", "issue", "comment", "repository", "organization",
                "installation", "sender",
            ],
            Self::Issues => &[
                "action", "issue", "changes", "assignee", "label", "repository", "organization",
                "installation", "sender",
            ],
            Self::Label => &[
                "action", "label", "changes", "repository", "organization", "installation",
                "sender",
            ],
            Self::MarketplacePurchase => &["action", "sender"],
            Self::Member => &[
                "action", "member", "changes", "repository", "organization", "installation",
                "sender",
            ],
            Self::Membership => &[
                "action", "scope", "member", "team", "organization", "installation", "sender",
            ],
            Self::Meta => &["action", "hook_id", "hook", "repository", "organization", "sender"],
            Self::Milestone => &[
                "action", "milestone", "changes", "repository", "organization", "installation",
                "sender",
            ],
            Self::Organization => &[
                "action", "invitation", "membership", "organization", "installation", "sender",
            ],
            Self::OrgBlock => &["action", "blocked_user", "organization", "installation", "sender"],
            Self::Package => &["action", "package", "repository", "organization", "sender"],
            Self::PageBuild => &[
                "id", "build", "repository", "organization", "installation", "sender",
            ],
            Self::Ping => &["zen", "hook_id", "hook", "repository", "organization", "sender"],
            Self::ProjectCard => &[
                "action", "changes", "after_id", "project_card", "repository", "organization",
                "installation", "sender",
            ],
            Self::ProjectColumn => &[
                "action", "changes", "after_id", "project_column", "repository", "organization",
                "installation", "sender",
            ],
            Self::Project => &[
                "action", "changes", "project", "repository", "organization", "installation",
                "sender",
            ],
            Self::Public => &["repository", "organization", "installation", "sender"],
            Self::PullRequest => &[
                "action", "number", "changes", "pull_request", "repository", "organization",
                "installation", "sender",
            ],
            Self::PullRequestReview => &[
                "action", "pull_request", "review", "changes", "repository", "organization",
                "installation", "sender",
            ],
            Self::PullRequestReviewComment => &[
                "action", "changes", "pull_request", "comment", "repository", "organization",
                "installation", "sender",
            ],
            Self::Push => &[
                "ref", "before", "after", "created", "deleted", "forced", "head_commit",
                "compare", "commits", "pusher", "repository", "organization", "installation",
                "sender",
            ],
            Self::Release => &[
                "action", "changes", "release", "repository", "organization", "installation",
                "sender",
            ],
            Self::RepositoryDispatch => &[
                "action", "repository", "organization", "installation", "sender",
            ],
            Self::Repository => &["action", "repository", "organization", "installation", "sender"],
            Self::RepositoryImport => &["status", "repository", "organization", "sender"],
            Self::RepositoryVulnerabilityAlert => &[
                "action", "alert", "repository", "organization", "sender",
            ],
            Self::SecretScanningAlert => &[
                "action", "alert", "repository", "organization", "installation", "sender",
            ],
            Self::SecurityAdvisory => &["action", "security_advisory"],
            Self::Sponsorship => &["action", "effective_date", "changes", "sender"],
            Self::Star => &["action", "starred_at", "repository", "organization", "sender"],
            Self::Status => &[
                "id", "sha", "state", "description", "target_url", "branches", "repository",
                "organization", "installation", "sender",
            ],
            Self::Team => &["action", "team", "changes", "repository", "organization", "sender"],
            Self::TeamAdd => &["team", "repository", "organization", "installation", "sender"],
            Self::Watch => &["action", "repository", "organization", "installation", "sender"],
            Self::WorkflowDispatch => &[
                "action", "workflow_job", "repository", "organization", "sender",
            ],
            Self::WorkflowJob => &[
                "action", "workflow_job", "repository", "organization", "sender",
            ],
            Self::WorkflowRun => &[
                "action", "workflow_run", "workflow", "organization", "repository", "sender",
            ],
        }
    }

    /// Documented `action` values; empty when the event has no enumerated set
    pub fn documented_actions(&self) -> &'static [&'static str] {
        match self {
            Self::BranchProtectionRule => &["created", "edited", "deleted"],
            Self::CheckRun => &["created", "completed", "rerequested", "requested_action"],
            Self::CheckSuite => &["completed", "requested", "rerequested"],
            Self::CodeScanningAlert => &[
                "created", "reopened_by_user", "closed_by_user", "fixed", "appeared_in_branch",
                "reopened",
            ],
            Self::CommitComment => &["created"],
            Self::ContentReference => &["created"],
            Self::DeployKey => &["created", "deleted"],
            Self::Deployment => &["created"],
            Self::DeploymentStatus => &["created"],
            Self::DiscussionComment => &["created", "edited", "deleted"],
            Self::GithubAppAuthorization => &["revoked"],
            Self::Installation => &[
                "created", "deleted", "suspend", "unsuspend", "new_permissions_accepted",
            ],
            Self::InstallationRepositories => &["added", "removed"],
            Self::IssueComment => &["created", "edited", "deleted"],
            Self::Label => &["created", "edited", "deleted"],
            Self::MarketplacePurchase => &[
                "purchased", "pending_change", "pending_change_cancelled", "changed",
                "cancelled",
            ],
            Self::Member => &["added", "removed", "edited"],
            Self::Membership => &["added", "removed"],
            Self::Meta => &["deleted"],
            Self::Milestone => &["created", "closed", "opened", "edited", "deleted"],
            Self::Organization => &[
                "deleted", "renamed", "member_added", "member_removed", "member_invited",
            ],
            Self::OrgBlock => &["blocked", "unblocked"],
            Self::Package => &["published", "updated"],
            Self::ProjectCard => &["created", "edited", "moved", "converted", "deleted"],
            Self::ProjectColumn => &["created", "edited", "moved", "deleted"],
            Self::Project => &["created", "edited", "closed", "reopened", "deleted"],
            Self::PullRequestReview => &["submitted", "edited", "dismissed"],
            Self::PullRequestReviewComment => &["created", "edited", "deleted"],
            Self::Release => &[
                "unpublished", "created", "edited", "deleted", "prereleased", "released",
            ],
            Self::RepositoryVulnerabilityAlert => &["create", "dismiss", "resolve"],
            Self::SecretScanningAlert => &["created", "resolved", "reopened"],
            Self::SecurityAdvisory => &["published", "updated", "performed", "withdrawn"],
            Self::Sponsorship => &[
                "created", "cancelled", "edited", "tier_changed", "pending_cancellation",
                "pending_tier_change",
            ],
            Self::Star => &["created", "deleted"],
            Self::Team => &[
                "created", "deleted", "edited", "added_to_repository",
                "removed_from_repository",
            ],
            Self::WorkflowJob => &["queued", "in_progress", "completed"],
            Self::WorkflowRun => &["requested", "completed"],
            _ => &[],
        }
    }

    /// Whether `action` is one of the documented values for this event
    pub fn is_documented_action(&self, action: &str) -> bool {
        self.documented_actions().contains(&action)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an event name is not in the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown GitHub event: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}
