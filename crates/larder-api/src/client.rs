// Hand-crafted async HTTP client for the Larder admin REST API.
//
// Read paths absorb failures into safe defaults (empty page / None) so
// list screens stay usable when a query fails; mutation paths propagate
// errors so the caller can surface them. The backend updates most
// resources with PATCH but recipes with PUT — each method below matches
// its resource.

use reqwest::multipart;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::Error;
use crate::page::Page;
use crate::params::ListQuery;
use crate::types::{
    Milestone, MilestonePayload, MilestoneRequirement, Payment, PaymentReport, ProblemDetails,
    Recipe, RecipePayload, RequirementPayload, Subscription, SubscriptionPatch, TradeOffer,
    TradeOfferModeration, Unit, User, UserPatch,
};

/// Async client for the Larder admin API.
///
/// Communicates via JSON REST endpoints under the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    pub fn new(base_url: &str, transport: &crate::TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with a slash so relative joins work.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"milestones"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        let pairs = query.to_query_pairs();
        debug!("GET {url} params={pairs:?}");

        let resp = self.http.get(url).query(&pairs).send().await?;
        Self::handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        Self::handle_empty(resp).await
    }

    /// PATCH a multipart form with a single named file field.
    async fn patch_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &'static str,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PATCH {url} (multipart, field={field})");

        let part = multipart::Part::bytes(bytes).file_name(file_name);
        let form = multipart::Form::new().part(field, part);

        let resp = self.http.patch(url).multipart(form).send().await?;
        Self::handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    /// Decode the `{detail, title, status}` problem body once, here at
    /// the boundary. A 409 becomes the distinguished conflict variant so
    /// the UI can show the backend's message verbatim.
    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let problem = serde_json::from_str::<ProblemDetails>(&raw).ok();

        let title = problem.as_ref().and_then(|p| p.title.clone());
        let detail = problem
            .as_ref()
            .and_then(|p| p.detail.clone())
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.clone()
                }
            });

        if status == reqwest::StatusCode::CONFLICT {
            return Error::Conflict {
                title: title.unwrap_or_else(|| "Conflict".into()),
                detail,
                status: status.as_u16(),
            };
        }

        Error::Api {
            status: status.as_u16(),
            title,
            detail,
        }
    }

    // ── Absorbing read helpers ───────────────────────────────────────

    /// Fetch a collection, degrading to an empty page on any failure.
    /// The underlying error is logged, not propagated.
    async fn collection<T: DeserializeOwned>(&self, path: &str, query: &ListQuery) -> Page<T> {
        match self.get_with_query(path, query).await {
            Ok(page) => page,
            Err(e) => {
                warn!(path, error = %e, "collection fetch failed; serving empty page");
                Page::empty(query.page_size)
            }
        }
    }

    /// Fetch a single entity, degrading to `None` on 404 or any failure.
    async fn one<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        match self.get(path).await {
            Ok(entity) => Some(entity),
            Err(e) => {
                if !e.is_not_found() {
                    warn!(path, error = %e, "entity fetch failed; serving absent");
                }
                None
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Milestones ───────────────────────────────────────────────────

    pub async fn fetch_milestones(&self, query: &ListQuery) -> Page<Milestone> {
        self.collection("milestones", query).await
    }

    pub async fn milestone(&self, id: &Uuid) -> Option<Milestone> {
        self.one(&format!("milestones/{id}")).await
    }

    pub async fn create_milestone(&self, payload: &MilestonePayload) -> Result<Milestone, Error> {
        if payload.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "milestone name must not be empty".into(),
            });
        }
        self.post("milestones", payload).await
    }

    pub async fn update_milestone(
        &self,
        id: &Uuid,
        payload: &MilestonePayload,
    ) -> Result<Milestone, Error> {
        if payload.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "milestone name must not be empty".into(),
            });
        }
        self.patch(&format!("milestones/{id}"), payload).await
    }

    pub async fn delete_milestone(&self, id: &Uuid) -> Result<(), Error> {
        self.delete(&format!("milestones/{id}")).await
    }

    /// Upload a milestone icon as a multipart form (single `icon` field).
    pub async fn upload_milestone_icon(
        &self,
        id: &Uuid,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<Milestone, Error> {
        self.patch_multipart(&format!("milestones/{id}/icon"), "icon", file_name, bytes)
            .await
    }

    // ── Milestone requirements ───────────────────────────────────────

    pub async fn fetch_requirements(
        &self,
        milestone_id: &Uuid,
        query: &ListQuery,
    ) -> Page<MilestoneRequirement> {
        self.collection(&format!("milestones/{milestone_id}/requirements"), query)
            .await
    }

    pub async fn create_requirement(
        &self,
        milestone_id: &Uuid,
        payload: &RequirementPayload,
    ) -> Result<MilestoneRequirement, Error> {
        if payload.amount == 0 {
            return Err(Error::Validation {
                message: "requirement amount must be greater than zero".into(),
            });
        }
        self.post(&format!("milestones/{milestone_id}/requirements"), payload)
            .await
    }

    pub async fn update_requirement(
        &self,
        milestone_id: &Uuid,
        requirement_id: &Uuid,
        payload: &RequirementPayload,
    ) -> Result<MilestoneRequirement, Error> {
        if payload.amount == 0 {
            return Err(Error::Validation {
                message: "requirement amount must be greater than zero".into(),
            });
        }
        self.patch(
            &format!("milestones/{milestone_id}/requirements/{requirement_id}"),
            payload,
        )
        .await
    }

    pub async fn delete_requirement(
        &self,
        milestone_id: &Uuid,
        requirement_id: &Uuid,
    ) -> Result<(), Error> {
        self.delete(&format!(
            "milestones/{milestone_id}/requirements/{requirement_id}"
        ))
        .await
    }

    // ── Payments (read-only) ─────────────────────────────────────────

    /// The payments endpoint wraps the page with a `summary` object;
    /// both arrive merged in [`PaymentReport`].
    pub async fn fetch_payments(&self, query: &ListQuery) -> PaymentReport {
        match self.get_with_query("payments", query).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "payments fetch failed; serving empty report");
                PaymentReport::empty(query.page_size)
            }
        }
    }

    pub async fn payment(&self, id: &Uuid) -> Option<Payment> {
        self.one(&format!("payments/{id}")).await
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub async fn fetch_subscriptions(&self, query: &ListQuery) -> Page<Subscription> {
        self.collection("subscriptions", query).await
    }

    pub async fn subscription(&self, id: &Uuid) -> Option<Subscription> {
        self.one(&format!("subscriptions/{id}")).await
    }

    pub async fn update_subscription(
        &self,
        id: &Uuid,
        patch: &SubscriptionPatch,
    ) -> Result<Subscription, Error> {
        self.patch(&format!("subscriptions/{id}"), patch).await
    }

    // ── Recipes ──────────────────────────────────────────────────────

    pub async fn fetch_recipes(&self, query: &ListQuery) -> Page<Recipe> {
        self.collection("recipes", query).await
    }

    pub async fn recipe(&self, id: &Uuid) -> Option<Recipe> {
        self.one(&format!("recipes/{id}")).await
    }

    pub async fn create_recipe(&self, payload: &RecipePayload) -> Result<Recipe, Error> {
        if payload.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "recipe name must not be empty".into(),
            });
        }
        self.post("recipes", payload).await
    }

    /// Recipes are updated with PUT (full replacement), not PATCH.
    pub async fn update_recipe(&self, id: &Uuid, payload: &RecipePayload) -> Result<Recipe, Error> {
        if payload.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "recipe name must not be empty".into(),
            });
        }
        self.put(&format!("recipes/{id}"), payload).await
    }

    pub async fn delete_recipe(&self, id: &Uuid) -> Result<(), Error> {
        self.delete(&format!("recipes/{id}")).await
    }

    // ── Trade offers ─────────────────────────────────────────────────

    pub async fn fetch_trade_offers(&self, query: &ListQuery) -> Page<TradeOffer> {
        self.collection("trade-offers", query).await
    }

    pub async fn trade_offer(&self, id: &Uuid) -> Option<TradeOffer> {
        self.one(&format!("trade-offers/{id}")).await
    }

    pub async fn moderate_trade_offer(
        &self,
        id: &Uuid,
        decision: &TradeOfferModeration,
    ) -> Result<TradeOffer, Error> {
        self.patch(&format!("trade-offers/{id}"), decision).await
    }

    pub async fn delete_trade_offer(&self, id: &Uuid) -> Result<(), Error> {
        self.delete(&format!("trade-offers/{id}")).await
    }

    // ── Users ────────────────────────────────────────────────────────

    pub async fn fetch_users(&self, query: &ListQuery) -> Page<User> {
        self.collection("users", query).await
    }

    pub async fn user(&self, id: &Uuid) -> Option<User> {
        self.one(&format!("users/{id}")).await
    }

    pub async fn update_user(&self, id: &Uuid, patch: &UserPatch) -> Result<User, Error> {
        self.patch(&format!("users/{id}"), patch).await
    }

    pub async fn delete_user(&self, id: &Uuid) -> Result<(), Error> {
        self.delete(&format!("users/{id}")).await
    }

    /// Upload a user avatar as a multipart form (single `avatar` field).
    pub async fn upload_user_avatar(
        &self,
        id: &Uuid,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<User, Error> {
        self.patch_multipart(&format!("users/{id}/avatar"), "avatar", file_name, bytes)
            .await
    }

    // ── Units (reference data) ───────────────────────────────────────

    pub async fn fetch_units(&self, query: &ListQuery) -> Page<Unit> {
        self.collection("units", query).await
    }
}
