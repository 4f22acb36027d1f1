//! Cart route handlers.
//!
//! Every handler rebuilds the facade for the request's shopper and returns
//! the refreshed cart view, so the SPA can swap its state in one step. The
//! SSE endpoint is the cross-tab "cart-updated" signal.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::{CartLineId, ProductId, VariantSelection};

use crate::error::Result;
use crate::middleware::MaybeShopper;
use crate::models::{CartItem, CartSnapshot};
use crate::state::AppState;

/// Cart item display data.
#[derive(Serialize)]
pub struct CartItemView {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image_url: Option<String>,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.line.id,
            product_id: item.product.id,
            name: item.product.name.clone(),
            slug: item.product.slug.clone(),
            size: item.line.variant.size.clone(),
            color: item.line.variant.color.clone(),
            quantity: item.line.quantity,
            unit_price: format_amount(item.product.unit_price.amount),
            line_total: format_amount(item.line_total().amount),
            image_url: item.product.image_url.clone(),
        }
    }
}

/// Cart display data.
#[derive(Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub currency: String,
    pub count: u32,
}

impl From<&CartSnapshot> for CartView {
    fn from(snapshot: &CartSnapshot) -> Self {
        Self {
            items: snapshot.items.iter().map(CartItemView::from).collect(),
            subtotal: format_amount(snapshot.subtotal.amount),
            currency: snapshot.subtotal.currency.code().to_owned(),
            count: snapshot.count,
        }
    }
}

fn format_amount(amount: rust_decimal::Decimal) -> String {
    format!("{amount:.2}")
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Update quantity request body. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

/// Cart count badge data.
#[derive(Serialize)]
pub struct CountView {
    pub count: u32,
}

/// Current cart snapshot.
#[instrument(skip(state, session, shopper))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
) -> Result<Json<CartView>> {
    let cart = state.cart_service(&session, shopper.as_ref());
    let snapshot = cart.snapshot().await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Add an item; same-configuration adds increment the existing line.
#[instrument(skip(state, session, shopper))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
    Json(form): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let cart = state.cart_service(&session, shopper.as_ref());
    cart.add_line(
        form.product_id,
        form.quantity.unwrap_or(1),
        VariantSelection::new(form.size, form.color),
    )
    .await?;

    let snapshot = cart.snapshot().await?;
    Ok((StatusCode::CREATED, Json(CartView::from(&snapshot))))
}

/// Set a line's quantity (<= 0 removes it).
#[instrument(skip(state, session, shopper))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
    Path(line_id): Path<CartLineId>,
    Json(form): Json<UpdateLineRequest>,
) -> Result<Json<CartView>> {
    let cart = state.cart_service(&session, shopper.as_ref());
    cart.set_quantity(line_id, form.quantity).await?;

    let snapshot = cart.snapshot().await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Remove a line.
#[instrument(skip(state, session, shopper))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
    Path(line_id): Path<CartLineId>,
) -> Result<Json<CartView>> {
    let cart = state.cart_service(&session, shopper.as_ref());
    cart.remove_line(line_id).await?;

    let snapshot = cart.snapshot().await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Empty the cart.
#[instrument(skip(state, session, shopper))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
) -> Result<StatusCode> {
    let cart = state.cart_service(&session, shopper.as_ref());
    cart.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cart count badge.
#[instrument(skip(state, session, shopper))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
) -> Result<Json<CountView>> {
    let cart = state.cart_service(&session, shopper.as_ref());
    Ok(Json(CountView {
        count: cart.count().await?,
    }))
}

/// Server-sent `cart-updated` events for this shopper's cart.
///
/// Other tabs subscribe here and re-fetch the snapshot on each event
/// instead of polling.
#[instrument(skip(state, session, shopper))]
pub async fn events(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let owner = state.cart_service(&session, shopper.as_ref()).owner();
    let receiver = state.events().subscribe();

    let stream = BroadcastStream::new(receiver).filter_map(move |message| match message {
        Ok(changed) if changed.owner == owner => {
            Some(Ok(Event::default().event("cart-updated").data("cart-updated")))
        }
        // Other shoppers' events and lagged-receiver gaps are not ours to
        // report; consumers re-read the snapshot on the next event anyway.
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
