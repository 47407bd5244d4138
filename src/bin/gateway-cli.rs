use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use rag_gateway::auth::TokenIssuer;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client CLI for the RAG gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Bearer token for protected routes.
    #[arg(short, long, env = "RAG_GATEWAY_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a token locally with the shared signing secret
    Token {
        #[arg(long, env = "API_SECRET_KEY")]
        secret: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
    /// Check gateway health
    Health,
    /// List workspaces owned by the token's subject
    Workspaces,
    /// Create a workspace
    CreateWorkspace {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "ar")]
        language: String,
    },
    /// Ask a question against a workspace
    Chat {
        workspace_id: String,
        query: String,
        #[arg(long, default_value = "ar")]
        language: String,
        #[arg(long, default_value = "saudi")]
        cultural_context: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
    }

    match cli.command {
        Commands::Token {
            secret,
            subject,
            email,
            role,
            ttl_secs,
        } => {
            let token = TokenIssuer::new(&secret, ttl_secs).issue(
                &subject,
                email.as_deref(),
                role.as_deref(),
            )?;
            println!("{}", token.access_token);
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Workspaces => {
            let res = client
                .get(format!("{}/workspaces", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::CreateWorkspace {
            name,
            description,
            language,
        } => {
            let res = client
                .post(format!("{}/workspaces", cli.url))
                .headers(headers)
                .json(&json!({
                    "name": name,
                    "description": description,
                    "language": language,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Chat {
            workspace_id,
            query,
            language,
            cultural_context,
        } => {
            let res = client
                .post(format!("{}/chat/query", cli.url))
                .headers(headers)
                .json(&json!({
                    "query": query,
                    "workspace_id": workspace_id,
                    "language": language,
                    "cultural_context": cultural_context,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(remaining) = res.headers().get("x-ratelimit-remaining") {
        eprintln!("Rate limit remaining: {}", remaining.to_str().unwrap_or("?"));
    }
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
