use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dixit_ai::ai::ProviderAdapters;
use dixit_ai::app::{App, RoundOptions};
use dixit_ai::config::Config;
use dixit_ai::game::{self, GameState};
use dixit_ai::models::Provider;
use dixit_ai::registry;
use dixit_ai::server::{self, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dixit-ai")]
#[command(about = "Play Dixit against AI image generators")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Play one round in the terminal.
    Play {
        #[arg(long, value_parser = parse_provider_arg)]
        provider: Provider,
        /// The story the images should illustrate.
        #[arg(long)]
        prompt: String,
        /// Generation models; picked at random when omitted.
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        /// How many random models to pick when --models is omitted.
        #[arg(long, default_value_t = 3)]
        count: usize,
        /// Vision model that scores the images.
        #[arg(long)]
        judge: String,
        /// Inspiration image URL or title; a random title when omitted.
        #[arg(long)]
        inspiration: Option<String>,
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
}

fn parse_provider_arg(input: &str) -> std::result::Result<Provider, String> {
    input.parse().map_err(|_| {
        let names: Vec<&str> = Provider::ALL.iter().map(|p| p.as_str()).collect();
        format!(
            "Invalid provider '{}'. Expected one of: {}",
            input,
            names.join(", ")
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dixit_ai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match args.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
            let adapters = ProviderAdapters::from_config(&config).await?;
            info!("Starting dixit-ai server");
            server::run(addr, Arc::new(AppState::new(adapters))).await?;
        }
        Command::Play {
            provider,
            prompt,
            models,
            count,
            judge,
            inspiration,
            output_dir,
        } => {
            let mut rng = rand::thread_rng();
            let app = App::from_config(&config, output_dir).await?;

            let inspiration = match inspiration {
                Some(value) => value,
                None => {
                    let (title, description) = game::random_inspiration(&mut rng);
                    info!("Inspiration: {} ({})", title, description);
                    title.to_string()
                }
            };

            let models = if models.is_empty() {
                registry::random_generation_models(provider, count, &mut rng)
            } else {
                models
            };

            let mut state = GameState::new();
            state.select_image(inspiration)?;
            state.submit_prompt(&prompt)?;

            let options = RoundOptions {
                provider,
                models,
                judge_model: judge,
            };
            let ranking = app.play_round(&mut state, &options).await?;

            println!("{} · {}", state.step.title(), state.user_prompt);
            for ranked in &ranking {
                println!(
                    "{:>2}. {:<45} {:>3}/100  {}",
                    ranked.rank, ranked.model, ranked.score, ranked.reasoning
                );
            }

            for path in app.save_images(&state)? {
                println!("saved {}", path.display());
            }
        }
    }

    Ok(())
}
