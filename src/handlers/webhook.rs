use crate::external::StripeService;
use crate::services::ReservationService;
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, info, warn};
use stripe::{Event, EventObject, EventType, Webhook};

/// Stripe webhook endpoint. Signature-verified; processing failures are
/// answered 200 so the gateway does not retry forever, with the error
/// logged for reconciliation.
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    stripe_service: web::Data<StripeService>,
    reservations: web::Data<ReservationService>,
) -> Result<HttpResponse> {
    let signature = match req.headers().get("stripe-signature") {
        Some(sig) => sig.to_str().unwrap_or(""),
        None => {
            warn!("Missing Stripe-Signature header");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Missing Stripe-Signature header"
            })));
        }
    };

    let payload = std::str::from_utf8(&body).map_err(|_| {
        error!("Invalid UTF-8 in webhook payload");
        actix_web::error::ErrorBadRequest("Invalid payload encoding")
    })?;

    let event = match Webhook::construct_event(payload, signature, stripe_service.webhook_secret())
    {
        Ok(event) => event,
        Err(e) => {
            error!("Webhook signature verification failed: {e}");
            return Ok(HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Invalid signature"
            })));
        }
    };

    info!("Received Stripe webhook event: {} ({})", event.type_, event.id);

    match handle_stripe_event(event, &reservations).await {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true
        }))),
        Err(e) => {
            error!("Failed to process webhook event: {e}");
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "received": true,
                "error": format!("Processing failed: {}", e)
            })))
        }
    }
}

async fn handle_stripe_event(
    event: Event,
    reservations: &ReservationService,
) -> crate::error::AppResult<()> {
    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                reservations
                    .handle_payment_succeeded(session.id.as_str())
                    .await?;
            }
            Ok(())
        }
        EventType::CheckoutSessionExpired => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                reservations
                    .handle_session_expired(session.id.as_str())
                    .await?;
            }
            Ok(())
        }
        other => {
            info!("Ignoring unhandled webhook event type: {other}");
            Ok(())
        }
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").route("/stripe", web::post().to(stripe_webhook)));
}
