mod app;
mod backend;
mod config;
mod error;
mod events;
mod hosted_checkout;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bl_core::JobKind;
use bl_core::cart::LineItem;
use bl_core::checkout::{CardDetails, DeliveryMethod, MeetupDetails, PaymentMethod, ShippingAddress};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::CheckoutOrder;
use crate::backend::{Backend, ListingMetadata};
use crate::config::{ClientConfig, parse_api_url};
use crate::hosted_checkout::PromptCheckout;

#[derive(Parser)]
#[command(name = "legion")]
#[command(about = "Buyers Legion storefront client: job tracking and checkout")]
struct Cli {
    /// Marketplace API base URL (overrides BL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a generation job until it completes or fails
    Poll {
        job_id: String,
        /// Queue the job was submitted to: 3d or 2d
        #[arg(long, default_value = "3d", value_parser = parse_kind)]
        kind: JobKind,
        /// Delay between status requests (overrides BL_POLL_INTERVAL_MS)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Upload listing photos for 3D model generation
    Submit(SubmitArgs),
    /// Buy a listing
    Checkout(CheckoutArgs),
    /// List public meetup locations
    Zones {
        #[arg(long)]
        city: Option<String>,
    },
}

#[derive(Args)]
struct SubmitArgs {
    /// Photo of the item, at least two
    #[arg(long = "image", required = true)]
    images: Vec<PathBuf>,
    #[arg(long)]
    listing_id: Option<String>,
    #[arg(long)]
    title: String,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    tier: Option<String>,
    /// Keep polling the queued job until it finishes
    #[arg(long)]
    watch: bool,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Listing as ID:TITLE:PRICE:SELLER
    #[arg(long = "item", required = true, value_parser = parse_item)]
    items: Vec<LineItem>,

    /// Ship to an address instead of meeting in person
    #[arg(long)]
    shipping: bool,
    #[arg(long)]
    meetup_date: Option<NaiveDate>,
    #[arg(long)]
    meetup_time: Option<String>,
    /// Safe zone id, see `legion zones`
    #[arg(long)]
    zone: Option<u32>,

    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    state: String,
    #[arg(long, default_value = "")]
    pincode: String,

    /// Pay from the account's credit balance
    #[arg(long, conflicts_with = "card_number")]
    credit: bool,
    #[arg(long, default_value = "")]
    card_number: String,
    #[arg(long, default_value = "")]
    card_expiry: String,
    #[arg(long, default_value = "")]
    card_cvv: String,
    #[arg(long, default_value = "")]
    card_name: String,
}

impl From<CheckoutArgs> for CheckoutOrder {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            items: args.items,
            delivery_method: if args.shipping {
                DeliveryMethod::Shipping
            } else {
                DeliveryMethod::Meetup
            },
            meetup: MeetupDetails {
                date: args.meetup_date,
                time_slot: args.meetup_time,
                safe_zone: args.zone,
            },
            shipping: ShippingAddress {
                name: args.name,
                phone: args.phone,
                address: args.address,
                city: args.city,
                state: args.state,
                pincode: args.pincode,
            },
            payment_method: if args.credit {
                PaymentMethod::StoredCredit
            } else {
                PaymentMethod::Card
            },
            card: CardDetails {
                number: args.card_number,
                expiry: args.card_expiry,
                cvv: args.card_cvv,
                name: args.card_name,
            },
        }
    }
}

fn parse_kind(value: &str) -> Result<JobKind, String> {
    JobKind::from_id(value).ok_or_else(|| format!("unknown job kind {value:?}, expected 3d or 2d"))
}

fn parse_item(value: &str) -> Result<LineItem, String> {
    let parts: Vec<&str> = value.splitn(4, ':').collect();
    let [id, title, price, seller] = parts.as_slice() else {
        return Err("expected ID:TITLE:PRICE:SELLER".into());
    };
    let price = price
        .parse()
        .map_err(|_| format!("price {price:?} is not a whole number"))?;

    Ok(LineItem::new(*id, *title, price, *seller))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load().context("loading configuration")?;
    if let Some(api_url) = &cli.api_url {
        config.api_url = parse_api_url(api_url)?;
    }

    let ok = match cli.command {
        Commands::Poll {
            job_id,
            kind,
            interval_ms,
        } => {
            let poll_interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or(config.poll_interval);
            let backend = Arc::new(Backend::new(config)?);
            app::poll_job(backend, job_id, kind, poll_interval).await?
        }
        Commands::Submit(args) => {
            let poll_interval = config.poll_interval;
            let backend = Arc::new(Backend::new(config)?);
            let metadata = ListingMetadata {
                title: args.title,
                category: args.category,
                description: args.description,
                tier: args.tier,
            };
            let created =
                app::submit_model(&backend, &args.images, args.listing_id, metadata).await?;

            if args.watch {
                app::poll_job(backend, created.job_id, JobKind::Model3d, poll_interval).await?
            } else {
                true
            }
        }
        Commands::Checkout(args) => {
            let fees = config.fees;
            let backend =
                Backend::new(config)?.with_card_checkout(Arc::new(PromptCheckout::stdin()));
            app::run_checkout(&backend, args.into(), fees).await?
        }
        Commands::Zones { city } => {
            app::list_zones(city.as_deref());
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
