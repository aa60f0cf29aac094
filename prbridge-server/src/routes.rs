//! HTTP surface of the offer lifecycle service.
//!
//! Handlers are thin triggers: parse the payload, hand it to the offer
//! store, return the updated offer or the mapped error. No transition is
//! computed here.

use axum::extract::{Path, State};
use axum::http::header;
use axum::middleware;
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use prbridge_core::{
    allowed_actions, status_view, ActionKind, Actor, BrandId, ContentSubmissionDraft,
    CreatorId, CreatorProfile, Deliverable, MatchedCreators, OfferAction, OfferDraft, OfferId,
    OfferStatus, PrOffer, ShippingAddress, SizePreferences, StatusView, TrackingNumber,
};

use crate::error::ApiError;
use crate::payments::CheckoutRequest;
use crate::session::{
    cookie_value, require_session, AuthedParty, IssuedSession, PartyRole, CSRF_COOKIE,
    SESSION_COOKIE,
};
use crate::status::StatusData;
use crate::AppState;

/// Build the full application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/pr-offers", post(create_offer).get(list_offers))
        .route("/pr-offers/matched-creators", post(matched_creators_handler))
        .route("/pr-offers/{id}", get(get_offer))
        .route("/pr-offers/{id}/accept", post(accept_offer))
        .route("/pr-offers/{id}/decline", post(decline_offer))
        .route("/pr-offers/{id}/ship", post(ship_offer))
        .route("/pr-offers/{id}/receive", post(receive_offer))
        .route("/pr-offers/{id}/start-content", post(start_content))
        .route("/pr-offers/{id}/submit-content", post(submit_content))
        .route("/pr-offers/{id}/complete", post(complete_offer))
        .route("/creators/preferences", put(put_preferences))
        .route("/payments/connect-link", post(payment_connect_link))
        .route("/payments/checkout", post(payment_checkout))
        .route("/payments/checkout/{id}", get(payment_confirm))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status_handler))
        .route("/session", post(create_session))
        .route("/session/refresh", post(refresh_session))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Response envelope
// =============================================================================

/// An offer as served to clients: the document plus derived presentation
/// data and the per-actor allowed actions from the transition table.
#[derive(Debug, Serialize)]
pub struct OfferEnvelope {
    #[serde(flatten)]
    pub offer: PrOffer,
    pub status_view: StatusView,
    pub content_deadline: Option<DateTime<Utc>>,
    pub allowed_actions: AllowedActions,
}

#[derive(Debug, Serialize)]
pub struct AllowedActions {
    pub brand: Vec<ActionKind>,
    pub creator: Vec<ActionKind>,
}

impl From<PrOffer> for OfferEnvelope {
    fn from(offer: PrOffer) -> Self {
        let status = offer.status;
        let content_deadline = offer.content_deadline();
        Self {
            status_view: status_view(status),
            content_deadline,
            allowed_actions: AllowedActions {
                brand: allowed_actions(status, Actor::Brand),
                creator: allowed_actions(status, Actor::Creator),
            },
            offer,
        }
    }
}

// =============================================================================
// Health and status
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "prbridge",
    }))
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusData>, ApiError> {
    let offers = state.store.list_all().await?;
    Ok(Json(StatusData::from_offers(&offers)))
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    party_id: Uuid,
    role: PartyRole,
}

fn session_cookies(issued: &IssuedSession) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    AppendHeaders([
        (
            header::SET_COOKIE,
            format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, issued.session_token
            ),
        ),
        (
            header::SET_COOKIE,
            format!(
                "{}={}; Path=/; SameSite=Lax",
                CSRF_COOKIE, issued.csrf_token
            ),
        ),
    ])
}

/// Issue a session. The tokens ride both in cookies (for browsers) and in
/// the body (for non-browser clients such as the CLI).
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let issued = state.sessions.issue(request.party_id, request.role).await;
    (session_cookies(&issued), Json(issued))
}

/// Rotate a session. Accepts expired-but-known tokens; this is the refresh
/// half of the client's refresh-and-retry handshake.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    headers: header::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token =
        cookie_value(&headers, SESSION_COOKIE).ok_or(ApiError::Unauthenticated {
            token_expired: false,
        })?;
    let issued = state
        .sessions
        .refresh(&token)
        .await
        .map_err(|_| ApiError::Unauthenticated {
            token_expired: false,
        })?;
    Ok((session_cookies(&issued), Json(issued)))
}

// =============================================================================
// Offer CRUD
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateOfferRequest {
    creator_id: Uuid,
    offer_title: String,
    products_offered: String,
    #[serde(default)]
    products_value: Option<Decimal>,
    deliverables_required: Vec<Deliverable>,
    #[serde(default)]
    mandatory_requirements: Option<String>,
    content_deadline_days: u32,
    #[serde(default)]
    target_categories: BTreeSet<String>,
}

async fn create_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Json(request): Json<CreateOfferRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    if party.role != PartyRole::Brand {
        return Err(ApiError::Forbidden(
            "only brands can create offers".to_string(),
        ));
    }

    let draft = OfferDraft {
        brand_id: BrandId(party.party_id),
        creator_id: CreatorId(request.creator_id),
        offer_title: request.offer_title,
        products_offered: request.products_offered,
        products_value: request.products_value,
        deliverables_required: request.deliverables_required,
        mandatory_requirements: request.mandatory_requirements,
        content_deadline_days: request.content_deadline_days,
        target_categories: request.target_categories,
    };

    let offer = state.store.create(draft).await?;
    Ok(Json(offer.into()))
}

async fn get_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    let offer = state.store.get(&OfferId(id)).await?;
    ensure_party(&offer, &party)?;
    Ok(Json(offer.into()))
}

async fn list_offers(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
) -> Result<Json<Vec<OfferEnvelope>>, ApiError> {
    let offers = match party.role {
        PartyRole::Brand => state.store.list_for_brand(&BrandId(party.party_id)).await?,
        PartyRole::Creator => {
            state
                .store
                .list_for_creator(&CreatorId(party.party_id))
                .await?
        }
    };
    Ok(Json(offers.into_iter().map(OfferEnvelope::from).collect()))
}

fn ensure_party(offer: &PrOffer, party: &AuthedParty) -> Result<(), ApiError> {
    let is_party = match party.role {
        PartyRole::Brand => offer.brand_id.0 == party.party_id,
        PartyRole::Creator => offer.creator_id.0 == party.party_id,
    };
    if is_party {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not a party to this offer".to_string()))
    }
}

// =============================================================================
// Lifecycle transitions
// =============================================================================

#[derive(Debug, Deserialize)]
struct AcceptRequest {
    shipping_address: ShippingAddress,
    size_preferences: SizePreferences,
    #[serde(default)]
    expected_status: Option<OfferStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct DeclineRequest {
    #[serde(default)]
    declined_reason: Option<String>,
    #[serde(default)]
    expected_status: Option<OfferStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct ShipRequest {
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    expected_status: Option<OfferStatus>,
}

/// Body for transitions that carry nothing beyond the CAS token.
/// Clients send `{}` when they have no expectation to assert.
#[derive(Debug, Default, Deserialize)]
struct TransitionRequest {
    #[serde(default)]
    expected_status: Option<OfferStatus>,
}

#[derive(Debug, Deserialize)]
struct SubmitContentRequest {
    content_urls: Vec<ContentSubmissionDraft>,
    #[serde(default)]
    expected_status: Option<OfferStatus>,
}

async fn apply_as(
    state: &AppState,
    party: AuthedParty,
    id: Uuid,
    action: OfferAction,
    expected_status: Option<OfferStatus>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    let offer = state
        .store
        .apply(
            &OfferId(id),
            party.role.actor(),
            Some(party.party_id),
            action,
            expected_status,
        )
        .await?;
    Ok(Json(offer.into()))
}

async fn accept_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<AcceptRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    let action = OfferAction::Accept {
        shipping_address: request.shipping_address,
        size_preferences: request.size_preferences,
    };
    apply_as(&state, party, id, action, request.expected_status).await
}

async fn decline_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<DeclineRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    let action = OfferAction::Decline {
        reason: request.declined_reason,
    };
    apply_as(&state, party, id, action, request.expected_status).await
}

async fn ship_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<ShipRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    let action = OfferAction::Ship {
        tracking_number: request
            .tracking_number
            .filter(|t| !t.trim().is_empty())
            .map(TrackingNumber::from),
    };
    apply_as(&state, party, id, action, request.expected_status).await
}

async fn receive_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    apply_as(
        &state,
        party,
        id,
        OfferAction::ConfirmReceipt,
        request.expected_status,
    )
    .await
}

async fn start_content(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    apply_as(
        &state,
        party,
        id,
        OfferAction::StartContent,
        request.expected_status,
    )
    .await
}

async fn submit_content(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitContentRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    let action = OfferAction::SubmitContent {
        submissions: request.content_urls,
    };
    apply_as(&state, party, id, action, request.expected_status).await
}

async fn complete_offer(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<OfferEnvelope>, ApiError> {
    apply_as(
        &state,
        party,
        id,
        OfferAction::Complete,
        request.expected_status,
    )
    .await
}

// =============================================================================
// Matching and creator preferences
// =============================================================================

#[derive(Debug, Deserialize)]
struct MatchedCreatorsRequest {
    target_categories: BTreeSet<String>,
}

async fn matched_creators_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchedCreatorsRequest>,
) -> Result<Json<MatchedCreators>, ApiError> {
    let matched = state
        .store
        .matched_creators(&request.target_categories)
        .await?;
    Ok(Json(matched))
}

#[derive(Debug, Deserialize)]
struct PreferencesRequest {
    display_name: String,
    categories: BTreeSet<String>,
}

async fn put_preferences(
    State(state): State<Arc<AppState>>,
    Extension(party): Extension<AuthedParty>,
    Json(request): Json<PreferencesRequest>,
) -> Result<Json<CreatorProfile>, ApiError> {
    if party.role != PartyRole::Creator {
        return Err(ApiError::Forbidden(
            "only creators can register preferences".to_string(),
        ));
    }
    if request.display_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "display_name must not be empty".to_string(),
        ));
    }

    let profile = CreatorProfile {
        creator_id: CreatorId(party.party_id),
        display_name: request.display_name,
        categories: request.categories,
    };
    state.store.upsert_creator_profile(&profile).await?;
    Ok(Json(profile))
}

// =============================================================================
// Payment handoff
// =============================================================================

#[derive(Debug, Deserialize)]
struct ConnectLinkRequest {
    account_id: String,
    refresh_url: String,
    return_url: String,
}

async fn payment_connect_link(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectLinkRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stripe = state.stripe.as_ref().ok_or(ApiError::PaymentsDisabled)?;
    let link = stripe
        .create_account_link(
            &request.account_id,
            &request.refresh_url,
            &request.return_url,
        )
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;
    Ok(Json(json!({ "url": link.url })))
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionRequest {
    amount_cents: i64,
    currency: String,
    product_name: String,
    success_url: String,
    cancel_url: String,
}

async fn payment_checkout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stripe = state.stripe.as_ref().ok_or(ApiError::PaymentsDisabled)?;
    if request.amount_cents <= 0 {
        return Err(ApiError::Validation(
            "amount_cents must be positive".to_string(),
        ));
    }
    let session = stripe
        .create_checkout_session(&CheckoutRequest {
            amount_cents: request.amount_cents,
            currency: request.currency,
            product_name: request.product_name,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
        })
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;
    Ok(Json(json!({ "id": session.id, "url": session.url })))
}

async fn payment_confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stripe = state.stripe.as_ref().ok_or(ApiError::PaymentsDisabled)?;
    let session = stripe
        .retrieve_checkout_session(&id)
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;
    Ok(Json(json!({
        "id": session.id,
        "status": session.status,
        "payment_status": session.payment_status,
        "confirmed": session.is_confirmed(),
    })))
}
