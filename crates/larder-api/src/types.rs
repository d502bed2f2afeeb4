//! Wire types for the Larder admin REST API.
//!
//! All types match the JSON bodies exchanged with the backend. Field
//! names use camelCase via `#[serde(rename_all = "camelCase")]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::page::Page;

// ── Problem details ──────────────────────────────────────────────────

/// Error body carried by non-2xx responses: `{detail, title, status}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProblemDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

// ── Milestones ───────────────────────────────────────────────────────

/// Achievement/milestone — from `GET /milestones`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub points: u32,
    /// Number of requirements attached; embedded in list/detail views,
    /// which is why requirement mutations invalidate milestone keys.
    pub requirement_count: u32,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

/// Create/update payload for milestones (`POST` / `PATCH`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonePayload {
    pub name: String,
    pub description: Option<String>,
    pub points: u32,
    pub archived: bool,
}

/// A requirement attached to a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRequirement {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub requirement_type: String,
    pub amount: u32,
    pub unit_id: Option<Uuid>,
}

/// Create/update payload for milestone requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementPayload {
    pub requirement_type: String,
    pub amount: u32,
    pub unit_id: Option<Uuid>,
}

// ── Payments & subscriptions ─────────────────────────────────────────

/// A processed payment — read-only from the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    /// One of: `SUCCEEDED`, `PENDING`, `FAILED`, `REFUNDED`.
    pub status: String,
    pub paid_at: DateTime<Utc>,
}

/// Aggregate figures the payments endpoint returns alongside the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub total_amount_cents: i64,
    pub refunded_amount_cents: i64,
    pub currency: String,
}

/// `GET /payments` wraps the usual envelope with a `summary` object;
/// the two are merged into this single shape at decode time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReport {
    pub summary: PaymentSummary,
    #[serde(flatten)]
    pub page: Page<Payment>,
}

impl PaymentReport {
    /// Failure default mirroring [`Page::empty`]: zeroed summary, no items.
    pub fn empty(page_size: u32) -> Self {
        Self {
            summary: PaymentSummary {
                total_amount_cents: 0,
                refunded_amount_cents: 0,
                currency: String::new(),
            },
            page: Page::empty(page_size),
        }
    }
}

/// A user's subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    /// One of: `ACTIVE`, `PAST_DUE`, `CANCELLED`.
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub renews_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Status transition payload (`PATCH /subscriptions/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPatch {
    pub status: String,
}

// ── Recipes ──────────────────────────────────────────────────────────

/// An authored recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub servings: Option<u32>,
    pub author_id: Uuid,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for recipes (`POST` / `PUT` — recipes are the
/// one resource the backend updates with PUT, full replacement).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePayload {
    pub name: String,
    pub description: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub servings: Option<u32>,
    pub published: bool,
}

// ── Trade offers ─────────────────────────────────────────────────────

/// A trade-post listing awaiting moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOffer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// One of: `PENDING`, `APPROVED`, `REJECTED`.
    pub status: String,
    pub flag_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Moderation decision payload (`PATCH /trade-offers/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOfferModeration {
    pub status: String,
    pub reason: Option<String>,
}

// ── Users ────────────────────────────────────────────────────────────

/// A platform user as seen by administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// One of: `MEMBER`, `MODERATOR`, `ADMIN`.
    pub role: String,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin edit payload (`PATCH /users/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub suspended: Option<bool>,
}

// ── Units ────────────────────────────────────────────────────────────

/// Measurement unit — rarely-changing reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: String,
}
