use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use bl_core::JobKind;
use bl_core::cart::{Cart, LineItem};
use bl_core::checkout::{
    CardDetails, CheckoutSession, CheckoutStep, DeliveryMethod, MeetupDetails, PaymentMethod,
    ShippingAddress,
};
use bl_core::job::JobStatus;
use bl_core::payment::PaymentGateway;
use bl_core::poller::{JobPoller, PollerConfig};
use bl_core::pricing::{FeeSchedule, PriceBreakdown, format_price};
use bl_core::safe_zone;
use tokio::sync::mpsc;
use tracing::info;

use crate::backend::{Backend, JobCreateResponse, ListingMetadata, Submit3dRequest};
use crate::events::AppEvent;

/// Poll `job_id` until it completes or fails. Returns whether it completed.
pub async fn poll_job(
    backend: Arc<Backend>,
    job_id: String,
    kind: JobKind,
    poll_interval: Duration,
) -> anyhow::Result<bool> {
    let (tx, mut events) = mpsc::unbounded_channel();

    let complete_tx = tx.clone();
    let complete_id = job_id.clone();
    let error_tx = tx.clone();
    let error_id = job_id.clone();

    let config = PollerConfig {
        poll_interval,
        enabled: true,
        kind,
    };
    let mut poller = JobPoller::new(backend, config)
        .on_complete(move |data| {
            let _ = complete_tx.send(AppEvent::JobComplete {
                job_id: complete_id.clone(),
                data: data.clone(),
            });
        })
        .on_error(move |error| {
            let _ = error_tx.send(AppEvent::JobFailed {
                job_id: error_id.clone(),
                error: error.to_string(),
            });
        });

    let mut snapshots = poller.subscribe();
    println!(
        "{} Tracking {} job {job_id} (~{}s)",
        JobStatus::Idle.icon(),
        kind.name(),
        kind.estimated_time_secs()
    );
    poller.set_job(Some(job_id.clone()));

    let mut last_progress = None;
    let mut last_error = None;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("{}", event.render());
                if event.is_final() {
                    return Ok(matches!(event, AppEvent::JobComplete { .. }));
                }
            }
            changed = snapshots.changed() => {
                changed.context("job poller stopped")?;
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.status != JobStatus::Polling {
                    continue;
                }
                if last_progress != Some(snapshot.progress) {
                    last_progress = Some(snapshot.progress);
                    let _ = tx.send(AppEvent::JobProgress {
                        job_id: job_id.clone(),
                        progress: snapshot.progress,
                    });
                }
                if snapshot.error.is_some() && snapshot.error != last_error {
                    last_error = snapshot.error.clone();
                    let _ = tx.send(AppEvent::JobRetrying {
                        job_id: job_id.clone(),
                        error: snapshot.error.unwrap_or_default(),
                    });
                }
            }
        }
    }
}

/// Upload listing photos and queue a 3D model job for them
pub async fn submit_model(
    backend: &Backend,
    images: &[PathBuf],
    listing_id: Option<String>,
    metadata: ListingMetadata,
) -> anyhow::Result<JobCreateResponse> {
    let request = Submit3dRequest {
        listing_id,
        images: encode_images(images)?,
        metadata,
    };
    let created = backend.submit_3d_job(&request).await?;

    let mut line = format!("Queued job {} ({})", created.job_id, created.status);
    if let Some(wait) = created.estimated_wait {
        line.push_str(&format!(", about {wait}s until it starts"));
    }
    println!("{}", AppEvent::Status(line).render());
    if let Some(message) = &created.message {
        println!("{message}");
    }

    Ok(created)
}

fn encode_images(paths: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(BASE64_STANDARD.encode(bytes))
        })
        .collect()
}

/// Checkout form values gathered from the command line
#[derive(Debug, Clone, Default)]
pub struct CheckoutOrder {
    pub items: Vec<LineItem>,
    pub delivery_method: DeliveryMethod,
    pub meetup: MeetupDetails,
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub card: CardDetails,
}

/// Walk a session through every step. Returns whether the order was placed.
pub async fn run_checkout<G>(
    payments: &G,
    order: CheckoutOrder,
    fees: FeeSchedule,
) -> anyhow::Result<bool>
where
    G: PaymentGateway + ?Sized,
{
    let mut cart = Cart::new();
    for item in order.items {
        cart.add(item).context("building cart")?;
    }
    anyhow::ensure!(!cart.is_empty(), "checkout needs at least one item");

    let mut session = CheckoutSession::from_cart(&cart, fees);
    print_review(&session);

    session.advance(payments).await;

    session.set_delivery_method(order.delivery_method);
    if let Some(meetup) = session.meetup_mut() {
        *meetup = order.meetup;
    }
    if let Some(shipping) = session.shipping_mut() {
        *shipping = order.shipping;
    }
    if session.advance(payments).await != &CheckoutStep::Payment {
        println!(
            "{}",
            AppEvent::Status(format!(
                "{} details incomplete, cannot continue",
                session.delivery_method().label()
            ))
            .render()
        );
        return Ok(false);
    }
    print_price(&session.price()?);

    session.set_payment_method(order.payment_method);
    if let Some(card) = session.card_mut() {
        *card = order.card;
    }
    if !session.can_proceed() {
        println!("{}", AppEvent::Status("Card details incomplete, cannot pay".into()).render());
        return Ok(false);
    }

    info!(items = session.items().len(), "Submitting payment");
    session.advance(payments).await;

    let event = match session.order_id() {
        Some(order_id) => AppEvent::OrderPlaced {
            order_id: order_id.to_string(),
            total: session.price()?.total,
        },
        None => AppEvent::PaymentFailed {
            error: session.last_error().unwrap_or("unknown error").to_string(),
        },
    };
    println!("{}", event.render());

    Ok(session.is_complete())
}

fn print_review(session: &CheckoutSession) {
    println!("Review your order");
    for item in session.items() {
        println!("  {:<40} {:>12}  ({})", item.title, format_price(item.price), item.seller);
    }
}

fn print_price(price: &PriceBreakdown) {
    println!("  {:<40} {:>12}", "Subtotal", format_price(price.subtotal));
    println!("  {:<40} {:>12}", "Platform fee (2%)", format_price(price.platform_fee));
    println!("  {:<40} {:>12}", "Delivery", format_price(price.delivery_fee));
    println!("  {:<40} {:>12}", "Total", format_price(price.total));
}

pub fn list_zones(city: Option<&str>) {
    let zones: Vec<_> = match city {
        Some(city) => safe_zone::for_city(city).collect(),
        None => safe_zone::all().iter().collect(),
    };

    if zones.is_empty() {
        println!("No safe zones found");
        return;
    }
    for zone in zones {
        println!(
            "{:>3}  {:<32} {:<10} {:<15} ({:.4}, {:.4})",
            zone.id,
            zone.name,
            zone.city,
            zone.kind.label(),
            zone.lat,
            zone.lng
        );
    }
}
