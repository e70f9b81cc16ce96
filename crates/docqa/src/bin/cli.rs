//! Command-line client for the document QA server
//!
//! Run with: cargo run -p docqa --features cli --bin docqa -- ask "What is covered?"

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;

use docqa::tracking::FileStats;
use docqa::types::{
    CleanupResponse, HealthResponse, MessageResponse, QueryRequest, QueryResponse, SyncResponse,
    SyncStatusResponse, UploadResponse,
};

const DEFAULT_URL: &str = "http://localhost:8000";

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions about your documents")]
struct Cli {
    /// Server base URL (default: $DOCQA_URL or http://localhost:8000)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload documents for indexing
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a question
    Ask {
        question: String,
        /// Answer in the context of earlier questions
        #[arg(short, long)]
        conversation: bool,
    },
    /// Process files added to the upload directory
    Sync,
    /// Show processed and pending files
    Status,
    /// Clear conversation memory
    ClearMemory,
    /// Upload directory size and age report
    Stats,
    /// Delete uploads past the retention window
    Cleanup,
    /// Check that the server is up
    Health,
}

struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    fn new(base: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let response = self.http.get(format!("{}{}", self.base, path)).send().await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let response = self.http.post(format!("{}{}", self.base, path)).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            bail!("{}: {}", status, message);
        }
        Ok(response.json().await?)
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base = cli
        .url
        .or_else(|| std::env::var("DOCQA_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let client = Client::new(base)?;

    match cli.command {
        Command::Upload { files } => upload(&client, files).await,
        Command::Ask {
            question,
            conversation,
        } => ask(&client, question, conversation).await,
        Command::Sync => sync(&client).await,
        Command::Status => status(&client).await,
        Command::ClearMemory => {
            let response: MessageResponse = client.post("/clear_memory/").await?;
            println!("{} {}", style("✓").green(), response.message);
            Ok(())
        }
        Command::Stats => stats(&client).await,
        Command::Cleanup => {
            let response: CleanupResponse = client.post("/files/cleanup").await?;
            println!("{} {}", style("✓").green(), response.message);
            for file in &response.deleted_files {
                println!("  {}", style(file).dim());
            }
            Ok(())
        }
        Command::Health => {
            let response: HealthResponse = client.get("/health").await?;
            println!("{} server is {}", style("✓").green(), response.status);
            Ok(())
        }
    }
}

async fn upload(client: &Client, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("  {bar:40.cyan/blue} {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("█▓░"));
    }

    let mut form = Form::new();
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} is not a file", path.display()))?;
        pb.set_message(name.clone());
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        form = form.part("files", Part::bytes(data).file_name(name));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let sending = spinner("Uploading...");
    let response = client
        .http
        .post(format!("{}/upload/", client.base))
        .multipart(form)
        .send()
        .await?;
    let response: UploadResponse = Client::decode(response).await?;
    sending.finish_and_clear();

    println!("{} {}", style("✓").green(), response.message);
    for file in &response.files {
        println!("  {}", style(file).dim());
    }
    Ok(())
}

async fn ask(client: &Client, question: String, conversation: bool) -> anyhow::Result<()> {
    let mut request = QueryRequest::new(question);
    if conversation {
        request = request.with_conversation();
    }

    let pb = spinner("Thinking...");
    let response = client
        .http
        .post(format!("{}/query/", client.base))
        .json(&request)
        .send()
        .await?;
    let response: QueryResponse = Client::decode(response).await?;
    pb.finish_and_clear();

    println!("{}\n", response.answer);
    if !response.sources.is_empty() {
        println!("{}", style("Sources").bold());
        for (i, source) in response.sources.iter().enumerate() {
            let location = match source.page {
                Some(page) => format!("{}, page {}", source.source, page),
                None => source.source.clone(),
            };
            println!("  [{}] {}", i + 1, style(location).cyan());
            println!("      {}", style(source.content.replace('\n', " ")).dim());
        }
    }
    println!(
        "\n{}",
        style(format!("{:.2}s", response.processing_time)).dim()
    );
    Ok(())
}

async fn sync(client: &Client) -> anyhow::Result<()> {
    let pb = spinner("Syncing upload folder...");
    let response: SyncResponse = client.post("/sync/").await?;
    pb.finish_and_clear();

    println!(
        "{} {} files: {} new, {} unchanged, {} failed ({:.2}s)",
        style("✓").green(),
        response.total_files_in_folder,
        response.new_files_processed,
        response.already_processed,
        response.failed,
        response.processing_time
    );
    for file in &response.processed_files {
        println!("  {} {}", style("+").green(), file);
    }
    for failed in &response.failed_files {
        println!("  {} {} - {}", style("✗").red(), failed.file, failed.error);
    }
    Ok(())
}

async fn status(client: &Client) -> anyhow::Result<()> {
    let response: SyncStatusResponse = client.get("/sync/status").await?;
    println!(
        "{} ({} files)",
        style("Upload folder").bold(),
        response.total_files
    );
    for file in &response.processed_files {
        println!(
            "  {} {} ({} bytes, processed {})",
            style("✓").green(),
            file.filename,
            file.size,
            file.processed_at
        );
    }
    for file in &response.pending_files {
        println!(
            "  {} {} ({} bytes, pending)",
            style("○").yellow(),
            file.filename,
            file.size
        );
    }
    Ok(())
}

async fn stats(client: &Client) -> anyhow::Result<()> {
    let stats: FileStats = client.get("/files/stats").await?;
    println!("{}", style("Uploads").bold());
    println!("  files:      {}", stats.total_files);
    println!("  size:       {:.2} MB", stats.total_size_mb);
    println!("  0-7 days:   {}", stats.files_by_age.up_to_week);
    println!("  8-30 days:  {}", stats.files_by_age.up_to_month);
    println!("  30+ days:   {}", stats.files_by_age.older);
    println!("  retention:  {} days", stats.retention_days);
    Ok(())
}
