use clap::{Parser, Subcommand};
use farepay::application::wallet::WalletService;
use farepay::config::WalletConfig;
use farepay::domain::money::RechargeAmount;
use farepay::domain::payment::{NavigationEvent, PaymentOutcomeResolver, ResponseCodeTable};
use farepay::domain::ports::WalletApi;
use farepay::domain::quote::{PriceQuote, PriceReestimator, VehicleType, VehicleTypeKey};
use farepay::domain::wallet::{PageRequest, StatisticsPeriod};
use farepay::infrastructure::http::HttpWalletApi;
use farepay::interfaces::cli::event_reader::EventReader;
use farepay::interfaces::cli::report_writer::ReportWriter;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use serde_json::json;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Wallet API base URL (overrides FAREPAY_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Bearer token for the wallet API (overrides FAREPAY_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-estimate a quote for another vehicle type
    Reestimate {
        /// Current estimated price
        #[arg(long)]
        price: Decimal,
        /// Estimated distance in kilometres
        #[arg(long)]
        distance: Option<f64>,
        /// Base rate of the vehicle type the price was computed for
        #[arg(long)]
        from_rate: Option<Decimal>,
        /// Vehicle type key the price was computed for
        #[arg(long, default_value = "current")]
        from_vehicle: String,
        /// Base rate of the newly selected vehicle type
        #[arg(long)]
        to_rate: Option<Decimal>,
        /// Key of the newly selected vehicle type
        #[arg(long)]
        vehicle: String,
    },
    /// Resolve a payment attempt from gateway redirect URLs, in order
    Resolve {
        urls: Vec<String>,
        /// File with one redirect URL per line
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Check a recharge amount without contacting the wallet API
    ValidateAmount { amount: String },
    /// Show the wallet balance
    Balance,
    /// List one page of wallet transactions
    Transactions {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show wallet statistics for a period (today, week, month, year, all)
    Statistics {
        #[arg(long, default_value = "month")]
        period: StatisticsPeriod,
    },
    /// Start a recharge and print the checkout URL
    Recharge { amount: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("farepay=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = ReportWriter::new(stdout.lock()).pretty(cli.pretty);

    match cli.command {
        Command::Reestimate {
            price,
            distance,
            from_rate,
            from_vehicle,
            to_rate,
            vehicle,
        } => {
            let quote = PriceQuote {
                estimated_price: price,
                estimated_distance: distance,
                base_rate: from_rate,
                vehicle_type_key: VehicleTypeKey::new(from_vehicle),
            };
            let next = PriceReestimator::default()
                .reestimate(&quote, &VehicleType::new(vehicle, to_rate))
                .into_diagnostic()?;
            out.write(&next).into_diagnostic()?;
        }
        Command::Resolve { urls, events } => {
            let config = WalletConfig::default();
            let mut resolver = PaymentOutcomeResolver::new(
                config.gateway,
                Arc::new(ResponseCodeTable::vnpay()),
            );

            let mut feed: Vec<NavigationEvent> =
                urls.into_iter().map(NavigationEvent::new).collect();
            if let Some(path) = events {
                let file = File::open(path).into_diagnostic()?;
                for event in EventReader::new(file).events() {
                    feed.push(event.into_diagnostic()?);
                }
            }

            for event in &feed {
                if resolver.observe(event).is_some() {
                    tracing::debug!(url = %event.url, "terminal redirect");
                }
            }

            match resolver.outcome() {
                Some(outcome) => out.write(outcome).into_diagnostic()?,
                None => out.write(&json!({ "status": "awaiting" })).into_diagnostic()?,
            }
        }
        Command::ValidateAmount { amount } => {
            let amount = RechargeAmount::parse(&amount).into_diagnostic()?;
            out.write(&json!({ "amount": amount })).into_diagnostic()?;
        }
        Command::Balance => {
            let api = http_api(cli.api_base, cli.token)?;
            let balance = api.balance().await.into_diagnostic()?;
            out.write(&balance).into_diagnostic()?;
        }
        Command::Transactions { page } => {
            let api = http_api(cli.api_base, cli.token)?;
            let items = api
                .transactions(PageRequest {
                    page,
                    limit: farepay::config::TRANSACTION_PAGE_SIZE,
                })
                .await
                .into_diagnostic()?;
            out.write(&items).into_diagnostic()?;
        }
        Command::Statistics { period } => {
            let api = http_api(cli.api_base, cli.token)?;
            let statistics = api.statistics(period).await.into_diagnostic()?;
            out.write(&statistics).into_diagnostic()?;
        }
        Command::Recharge { amount } => {
            let config = load_config(cli.api_base, cli.token)?;
            let api = HttpWalletApi::from_config(&config).into_diagnostic()?;
            let wallet = WalletService::new(Box::new(api), config);
            let pending = wallet.start_recharge(&amount).await.into_diagnostic()?;
            out.write(&json!({
                "amount": pending.amount,
                "paymentUrl": pending.payment_url,
            }))
            .into_diagnostic()?;
        }
    }

    Ok(())
}

fn load_config(api_base: Option<String>, token: Option<String>) -> Result<WalletConfig> {
    let mut config = WalletConfig::from_env().into_diagnostic()?;
    if let Some(api_base) = api_base {
        config.api_base = api_base;
    }
    if token.is_some() {
        config.api_token = token;
    }
    config.validate().into_diagnostic()?;
    Ok(config)
}

fn http_api(api_base: Option<String>, token: Option<String>) -> Result<HttpWalletApi> {
    let config = load_config(api_base, token)?;
    HttpWalletApi::from_config(&config).into_diagnostic()
}
