// larder-api: Async Rust client for the Larder admin REST API.

pub mod client;
pub mod error;
pub mod page;
pub mod params;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::Error;
pub use page::Page;
pub use params::{FilterValue, ListQuery, SortOrder};
pub use transport::TransportConfig;
pub use types::{
    Milestone, MilestonePayload, MilestoneRequirement, Payment, PaymentReport, PaymentSummary,
    ProblemDetails, Recipe, RecipePayload, RequirementPayload, Subscription, SubscriptionPatch,
    TradeOffer, TradeOfferModeration, Unit, User, UserPatch,
};
