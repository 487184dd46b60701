use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for a chaos relay instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service identity
    Health,
    /// Dump the Prometheus exposition
    Metrics,
    /// Send a payload through the relay chain
    Process {
        /// Items of the JSON array to send
        items: Vec<String>,

        /// W3C traceparent to continue an existing trace
        #[arg(long)]
        traceparent: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/", base)).send().await?;
            print_json(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            let status = res.status();
            let text = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: relay returned status {}", status);
            }
            println!("{}", text);
        }
        Commands::Process { items, traceparent } => {
            let mut headers = HeaderMap::new();
            if let Some(traceparent) = traceparent {
                headers.insert("traceparent", HeaderValue::from_str(&traceparent)?);
            }

            let res = client
                .post(format!("{}/process", base))
                .headers(headers)
                .json(&items)
                .send()
                .await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(id) = res.headers().get("x-request-id") {
        eprintln!("x-request-id: {}", id.to_str().unwrap_or("<binary>"));
    }

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
