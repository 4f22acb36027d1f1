//! Stripe implementation of the payment gateway.
//!
//! Uses Stripe's hosted Checkout: the initiator creates a session and
//! redirects the shopper to Stripe's page; on return, the verifier
//! retrieves the session (with line items expanded) to learn the
//! authoritative outcome. No webhook plumbing - settlement is confirmed
//! synchronously on the shopper's return.

use secrecy::ExposeSecret;
use stripe::{
    CheckoutSession, CheckoutSessionBillingAddressCollection, CheckoutSessionId,
    CheckoutSessionMode, CheckoutSessionPaymentStatus, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, CreateCheckoutSessionPaymentMethodTypes,
    CreateCheckoutSessionPhoneNumberCollection, Currency,
};

use async_trait::async_trait;

use atelier_core::CurrencyCode;

use super::{
    CapturedLineItem, CreatedSession, PaymentError, PaymentGateway, PaymentOutcome, Result,
    SessionDetails, SessionRequest,
};
use crate::config::StripeConfig;

/// Stripe-backed payment gateway.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    /// Create a gateway from configuration.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(config.secret_key.expose_secret()),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<CreatedSession> {
        let currency = to_stripe_currency(request.currency);

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.customer_email = Some(&request.customer_email);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        params.billing_address_collection =
            Some(CheckoutSessionBillingAddressCollection::Required);
        params.phone_number_collection =
            Some(CreateCheckoutSessionPhoneNumberCollection { enabled: true });
        params.metadata = Some(request.metadata.clone());
        params.line_items = Some(
            request
                .line_items
                .iter()
                .map(|item| CreateCheckoutSessionLineItems {
                    quantity: Some(u64::from(item.quantity)),
                    price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                        currency,
                        unit_amount: Some(item.unit_amount),
                        product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                            name: item.name.clone(),
                            images: item.image_url.clone().map(|url| vec![url]),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .collect(),
        );

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        let redirect_url = session
            .url
            .ok_or_else(|| PaymentError::InvalidResponse("no checkout URL returned".into()))?;

        Ok(CreatedSession {
            session_id: session.id.to_string(),
            redirect_url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails> {
        let id = session_id
            .parse::<CheckoutSessionId>()
            .map_err(|_| PaymentError::SessionNotFound(session_id.to_owned()))?;

        let session = CheckoutSession::retrieve(&self.client, &id, &["line_items"])
            .await
            .map_err(|e| map_retrieve_error(session_id, &e))?;

        let outcome = match session.payment_status {
            CheckoutSessionPaymentStatus::Paid => PaymentOutcome::Paid,
            CheckoutSessionPaymentStatus::Unpaid => PaymentOutcome::Unpaid,
            CheckoutSessionPaymentStatus::NoPaymentRequired => PaymentOutcome::NoPaymentRequired,
        };

        let customer_email = session
            .customer_email
            .or_else(|| session.customer_details.and_then(|details| details.email));

        let line_items = session
            .line_items
            .map(|list| list.data)
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity.unwrap_or(1)).unwrap_or(1);
                let unit_amount = item
                    .price
                    .as_ref()
                    .and_then(|price| price.unit_amount)
                    .unwrap_or_default();
                CapturedLineItem {
                    description: item.description,
                    unit_amount,
                    quantity,
                    amount_total: unit_amount * i64::from(quantity),
                }
            })
            .collect();

        Ok(SessionDetails {
            session_id: session.id.to_string(),
            outcome,
            amount_total: session.amount_total.unwrap_or_default(),
            currency: session.currency.and_then(from_stripe_currency),
            customer_email,
            metadata: session.metadata.unwrap_or_default(),
            line_items,
        })
    }
}

const fn to_stripe_currency(code: CurrencyCode) -> Currency {
    match code {
        CurrencyCode::Aed => Currency::AED,
        CurrencyCode::Usd => Currency::USD,
        CurrencyCode::Eur => Currency::EUR,
        CurrencyCode::Gbp => Currency::GBP,
    }
}

const fn from_stripe_currency(currency: Currency) -> Option<CurrencyCode> {
    match currency {
        Currency::AED => Some(CurrencyCode::Aed),
        Currency::USD => Some(CurrencyCode::Usd),
        Currency::EUR => Some(CurrencyCode::Eur),
        Currency::GBP => Some(CurrencyCode::Gbp),
        _ => None,
    }
}

fn map_retrieve_error(session_id: &str, e: &stripe::StripeError) -> PaymentError {
    match e {
        stripe::StripeError::Stripe(request_error) if request_error.http_status == 404 => {
            PaymentError::SessionNotFound(session_id.to_owned())
        }
        other => PaymentError::Provider(other.to_string()),
    }
}
