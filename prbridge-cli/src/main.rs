use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::env;
use uuid::Uuid;

/// prbridge: operator CLI for the PR-offer lifecycle service
#[derive(Parser, Debug)]
#[command(name = "prbridge")]
#[command(about = "Drive PR offers through their lifecycle", long_about = None)]
struct Cli {
    /// Base URL of the server (or PRBRIDGE_URL environment variable)
    #[arg(long)]
    server_url: Option<String>,

    /// Session token from `prbridge login` (or PRBRIDGE_SESSION)
    #[arg(long)]
    session: Option<String>,

    /// CSRF token from `prbridge login` (or PRBRIDGE_CSRF)
    #[arg(long)]
    csrf: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a session and print the tokens to export
    Login(LoginArgs),
    /// Create a new offer (brand session)
    Create(CreateArgs),
    /// Accept a pending offer, supplying the shipping address (creator session)
    Accept(AcceptArgs),
    /// Decline a pending offer (creator session)
    Decline(DeclineArgs),
    /// Mark the product shipped (brand session)
    Ship(ShipArgs),
    /// Confirm the product arrived (creator session)
    Receive(OfferRefArgs),
    /// Flag that content work has begun (creator session)
    StartContent(OfferRefArgs),
    /// Submit content URLs (creator session)
    SubmitContent(SubmitContentArgs),
    /// Sign off on submitted content (brand session)
    Complete(OfferRefArgs),
    /// Show one offer
    Show(OfferRefArgs),
    /// List the session party's offers
    List,
    /// Find creators whose wishlist intersects the given categories
    Match(MatchArgs),
    /// Register the creator session's category wishlist
    Preferences(PreferencesArgs),
    /// Show the lifecycle dashboard
    Status,
}

#[derive(Parser, Debug)]
struct LoginArgs {
    /// Party id (brand or creator UUID)
    #[arg(long)]
    party_id: Uuid,

    /// Role of the party
    #[arg(long, value_parser = ["brand", "creator"])]
    role: String,
}

#[derive(Parser, Debug)]
struct CreateArgs {
    #[arg(long)]
    creator_id: Uuid,

    #[arg(long)]
    title: String,

    #[arg(long)]
    products: String,

    /// Nominal value of the products, e.g. 89.99
    #[arg(long)]
    value: Option<String>,

    /// Days after product receipt by which content is due
    #[arg(long, default_value_t = 14)]
    deadline_days: u32,

    /// Deliverable, repeatable; "description@platform" or just "description"
    #[arg(long = "deliverable", num_args = 1..)]
    deliverables: Vec<String>,

    #[arg(long)]
    requirements: Option<String>,

    /// Target category, repeatable
    #[arg(long = "category")]
    categories: Vec<String>,
}

#[derive(Parser, Debug)]
struct AcceptArgs {
    id: Uuid,

    #[arg(long)]
    recipient: String,
    #[arg(long)]
    line1: String,
    #[arg(long)]
    line2: Option<String>,
    #[arg(long)]
    city: String,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    postal_code: String,
    #[arg(long)]
    country: String,

    #[arg(long)]
    clothing: Option<String>,
    #[arg(long)]
    shoe: Option<String>,
    #[arg(long)]
    notes: Option<String>,

    /// Status the offer is expected to be in (compare-and-swap token)
    #[arg(long)]
    expected: Option<String>,
}

#[derive(Parser, Debug)]
struct DeclineArgs {
    id: Uuid,

    #[arg(long)]
    reason: Option<String>,

    #[arg(long)]
    expected: Option<String>,
}

#[derive(Parser, Debug)]
struct ShipArgs {
    id: Uuid,

    #[arg(long)]
    tracking: Option<String>,

    #[arg(long)]
    expected: Option<String>,
}

#[derive(Parser, Debug)]
struct OfferRefArgs {
    id: Uuid,

    #[arg(long)]
    expected: Option<String>,
}

#[derive(Parser, Debug)]
struct SubmitContentArgs {
    id: Uuid,

    /// Content URL, repeatable
    #[arg(long = "url", num_args = 1..)]
    urls: Vec<String>,

    #[arg(long, default_value = "post")]
    kind: String,

    #[arg(long, default_value = "instagram")]
    platform: String,

    #[arg(long)]
    expected: Option<String>,
}

#[derive(Parser, Debug)]
struct MatchArgs {
    /// Target category, repeatable
    #[arg(long = "category", num_args = 1..)]
    categories: Vec<String>,
}

#[derive(Parser, Debug)]
struct PreferencesArgs {
    #[arg(long)]
    display_name: String,

    /// Wishlist category, repeatable
    #[arg(long = "category", num_args = 1..)]
    categories: Vec<String>,
}

struct Api {
    client: reqwest::Client,
    base_url: String,
    session: Option<String>,
    csrf: Option<String>,
}

impl Api {
    fn new(cli: &Cli) -> Self {
        let base_url = cli
            .server_url
            .clone()
            .or_else(|| env::var("PRBRIDGE_URL").ok())
            .unwrap_or_else(|| "http://localhost:8080".to_string());
        let session = cli
            .session
            .clone()
            .or_else(|| env::var("PRBRIDGE_SESSION").ok());
        let csrf = cli.csrf.clone().or_else(|| env::var("PRBRIDGE_CSRF").ok());
        Self {
            client: reqwest::Client::new(),
            base_url,
            session,
            csrf,
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let session = self.session.as_deref().ok_or_else(|| {
            anyhow!("no session token; run `prbridge login` and export PRBRIDGE_SESSION")
        })?;
        let csrf = self.csrf.as_deref().ok_or_else(|| {
            anyhow!("no CSRF token; run `prbridge login` and export PRBRIDGE_CSRF")
        })?;
        Ok((session, csrf))
    }

    async fn public_post(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base_url))?;
        Self::parse(response).await
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value> {
        let (session, csrf) = self.credentials()?;
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("cookie", format!("session={}", session))
            .header("x-csrf-token", csrf);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base_url))?;
        Self::parse(response).await
    }

    async fn parse(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or_else(|_| json!({ "error": "non-JSON response" }));
        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            bail!("server returned {}: {}", status, message);
        }
        Ok(body)
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_deliverables(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|entry| match entry.split_once('@') {
            Some((description, platform)) => json!({
                "description": description,
                "platform": platform,
            }),
            None => json!({ "description": entry }),
        })
        .collect()
}

fn transition_body(expected: &Option<String>) -> Value {
    match expected {
        Some(expected) => json!({ "expected_status": expected }),
        None => json!({}),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = Api::new(&cli);

    match &cli.command {
        Commands::Login(args) => {
            let body = api
                .public_post(
                    "/session",
                    json!({ "party_id": args.party_id, "role": args.role }),
                )
                .await?;
            let session = body["session_token"]
                .as_str()
                .context("response missing session_token")?;
            let csrf = body["csrf_token"]
                .as_str()
                .context("response missing csrf_token")?;
            println!("export PRBRIDGE_SESSION={}", session);
            println!("export PRBRIDGE_CSRF={}", csrf);
        }

        Commands::Create(args) => {
            let mut body = json!({
                "creator_id": args.creator_id,
                "offer_title": args.title,
                "products_offered": args.products,
                "deliverables_required": parse_deliverables(&args.deliverables),
                "content_deadline_days": args.deadline_days,
                "target_categories": args.categories,
            });
            if let Some(value) = &args.value {
                body["products_value"] = json!(value);
            }
            if let Some(requirements) = &args.requirements {
                body["mandatory_requirements"] = json!(requirements);
            }
            let offer = api.send(reqwest::Method::POST, "/pr-offers", Some(body)).await?;
            print_json(&offer)?;
        }

        Commands::Accept(args) => {
            let body = json!({
                "shipping_address": {
                    "recipient": args.recipient,
                    "line1": args.line1,
                    "line2": args.line2,
                    "city": args.city,
                    "region": args.region,
                    "postal_code": args.postal_code,
                    "country": args.country,
                },
                "size_preferences": {
                    "clothing": args.clothing,
                    "shoe": args.shoe,
                    "notes": args.notes,
                },
                "expected_status": args.expected,
            });
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/accept", args.id),
                    Some(body),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::Decline(args) => {
            let body = json!({
                "declined_reason": args.reason,
                "expected_status": args.expected,
            });
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/decline", args.id),
                    Some(body),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::Ship(args) => {
            let body = json!({
                "tracking_number": args.tracking,
                "expected_status": args.expected,
            });
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/ship", args.id),
                    Some(body),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::Receive(args) => {
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/receive", args.id),
                    Some(transition_body(&args.expected)),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::StartContent(args) => {
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/start-content", args.id),
                    Some(transition_body(&args.expected)),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::SubmitContent(args) => {
            let urls: Vec<Value> = args
                .urls
                .iter()
                .map(|url| {
                    json!({
                        "url": url,
                        "type": args.kind,
                        "platform": args.platform,
                    })
                })
                .collect();
            let body = json!({
                "content_urls": urls,
                "expected_status": args.expected,
            });
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/submit-content", args.id),
                    Some(body),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::Complete(args) => {
            let offer = api
                .send(
                    reqwest::Method::POST,
                    &format!("/pr-offers/{}/complete", args.id),
                    Some(transition_body(&args.expected)),
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::Show(args) => {
            let offer = api
                .send(
                    reqwest::Method::GET,
                    &format!("/pr-offers/{}", args.id),
                    None,
                )
                .await?;
            print_json(&offer)?;
        }

        Commands::List => {
            let offers = api.send(reqwest::Method::GET, "/pr-offers", None).await?;
            print_json(&offers)?;
        }

        Commands::Match(args) => {
            let body = json!({ "target_categories": args.categories });
            let matched = api
                .send(
                    reqwest::Method::POST,
                    "/pr-offers/matched-creators",
                    Some(body),
                )
                .await?;
            print_json(&matched)?;
        }

        Commands::Preferences(args) => {
            let body = json!({
                "display_name": args.display_name,
                "categories": args.categories,
            });
            let profile = api
                .send(reqwest::Method::PUT, "/creators/preferences", Some(body))
                .await?;
            print_json(&profile)?;
        }

        Commands::Status => {
            let response = api
                .client
                .get(format!("{}/status", api.base_url))
                .send()
                .await
                .with_context(|| format!("failed to reach {}", api.base_url))?;
            let status = Api::parse(response).await?;
            print_json(&status)?;
        }
    }

    Ok(())
}
