use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use daybook::config::Config;
use daybook::core::{ConversationState, Identity, JournalStore, MetricValue, PromptBank, PromptSelector};
use daybook::http_client::ServiceClient;
use daybook::journal::JournalService;
use daybook::services::{NluClient, PlacesClient, WeatherClient, WikiClient};

pub use commands::{Args, Commands, MetricCommands, PageCommands, PromptsCommands};

mod commands;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Everything a journal command needs, resolved from config.
struct Session {
    who: Identity,
    service: JournalService,
}

fn open_session(config: &Config, user: Option<String>) -> Result<Session> {
    let store = JournalStore::new(config.journal_file())
        .with_context(|| format!("Failed to open {}", config.journal_file().display()))?;
    let bank = PromptBank::load(&config.prompts_file())
        .with_context(|| format!("Invalid prompt bank {}", config.prompts_file().display()))?;
    let http = ServiceClient::new(config.http_timeout())?;
    let analyzer = NluClient::new(http, config.resolved_services().nlu);

    Ok(Session {
        who: config.identity(user),
        service: JournalService::new(store, analyzer, PromptSelector::new(bank)),
    })
}

pub async fn run(args: Args) -> Result<()> {
    let config = Config::new(args.data_dir.clone())?;

    match args.command {
        Commands::Init => handle_init(&config),
        Commands::Prompts { command } => handle_prompts(&config, command),
        Commands::Weather => handle_weather(&config).await,
        Commands::Places { latitude, longitude } => handle_places(&config, latitude, longitude).await,
        Commands::Wiki { query } => handle_wiki(&config, &query).await,
        command => {
            let mut session = open_session(&config, args.user)?;
            handle_journal(&mut session, command).await
        }
    }
}

fn handle_init(config: &Config) -> Result<()> {
    config.save()?;
    println!("Config: {}", config.data_dir.join("config.json").display());
    println!("Prompts: {}", config.prompts_file().display());
    println!("Journal: {}", config.journal_file().display());
    Ok(())
}

fn handle_prompts(config: &Config, command: PromptsCommands) -> Result<()> {
    match command {
        PromptsCommands::Check { file } => {
            let path: PathBuf = file.unwrap_or_else(|| config.prompts_file());
            PromptBank::load(&path)
                .with_context(|| format!("Prompt bank {} is invalid", path.display()))?;
            println!("✅ {} covers every sentiment", path.display());
            Ok(())
        }
    }
}

async fn handle_weather(config: &Config) -> Result<()> {
    let client = WeatherClient::new(
        ServiceClient::new(config.http_timeout())?,
        config.resolved_services().weather,
    )
    .with_cache_file(config.weather_cache_file());
    print_json(&client.current().await?)
}

async fn handle_places(config: &Config, latitude: f64, longitude: f64) -> Result<()> {
    let client = PlacesClient::new(
        ServiceClient::new(config.http_timeout())?,
        config.resolved_services().places,
    );
    print_json(&client.points_of_interest(latitude, longitude).await?)
}

async fn handle_wiki(config: &Config, query: &str) -> Result<()> {
    let client = WikiClient::new(
        ServiceClient::new(config.http_timeout())?,
        config.resolved_services().wiki,
    );
    print_json(&client.article(query).await?)
}

async fn handle_journal(session: &mut Session, command: Commands) -> Result<()> {
    let Session { who, service } = session;

    match command {
        Commands::Today { date } => print_json(&service.open_today(who, date.unwrap_or_else(today))?),
        Commands::Page { command } => handle_page(service, who, command),
        Commands::Entry { date } => print_json(&json!({ "content": service.entry(who, date)? })),
        Commands::Metric { command } => handle_metric(service, who, command),
        Commands::Mood { page: Some(date), .. } => print_json(&service.score_page(who, date).await?),
        Commands::Mood { text, .. } => match service.score_text(text.as_deref().unwrap_or("")).await? {
            Some(scores) => print_json(&scores),
            None => print_json(&json!({ "success": false })),
        },
        Commands::Prompt { text, last_obj, last_sentiment } => {
            let state = ConversationState::from_client(last_obj.as_deref(), last_sentiment.as_deref());
            let prompt = service.prompt(&text, &state, &mut rand::thread_rng()).await?;
            info!(sentiment = %prompt.sentiment, "prompt selected");
            print_json(&prompt)
        }
        Commands::Graph => print_json(&service.graph(who)),
        other => anyhow::bail!("{:?} is not a journal command", other),
    }
}

fn handle_page(service: &mut JournalService, who: &Identity, command: PageCommands) -> Result<()> {
    match command {
        PageCommands::List => print_json(&service.pages(who)),
        PageCommands::Show { date } => print_json(&service.page(who, date)?),
        PageCommands::Write { date, content, file, new } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("either --content or --file is required"),
            };
            let page = if new {
                service.create_page(who, date, content)?
            } else {
                service.write_page(who, date, content)?
            };
            print_json(&page)
        }
        PageCommands::Delete { date } => {
            service.delete_page(who, date)?;
            print_json(&json!({ "success": true }))
        }
    }
}

fn handle_metric(service: &mut JournalService, who: &Identity, command: MetricCommands) -> Result<()> {
    match command {
        MetricCommands::List { date } => print_json(&service.metrics(who, date)?),
        MetricCommands::Get { date, name } => print_json(&service.metric(who, date, &name)?),
        MetricCommands::Set { date, name, value } => {
            let value = MetricValue::try_from(value)?;
            print_json(&service.set_metric(who, date, &name, value)?)
        }
        MetricCommands::Delete { date, name } => {
            service.delete_metric(who, date, &name)?;
            print_json(&json!({ "success": true }))
        }
    }
}
