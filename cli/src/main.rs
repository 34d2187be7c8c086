use anyhow::{Context, Result};
use autodeploy_core::agent::{DeveloperRequest, DeveloperResponse};
use autodeploy_core::{AgentFactory, Config, Host, OpenAiClient, Tone};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod console;
mod driver;
mod preflight;

use console::Console;
use driver::{Driver, Outcome};

/// Containerize a project with the help of an LLM agent.
#[derive(Parser, Debug)]
#[command(name = "autodeploy", version, about)]
struct Args {
    /// Root of the project (a git repository).
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Deployment name; defaults to the directory name.
    #[arg(long, env = "AUTODEPLOY_NAME")]
    name: Option<String>,

    /// Command that starts the application.
    #[arg(long)]
    command: Option<String>,

    /// Env file whose variables are passed to test containers.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Create and switch to this branch before committing anything.
    #[arg(long)]
    branch: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is the common case.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let config = Config::from_env()?;

    // Only log to stderr so it does not interleave with the conversation
    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    info!("Starting autodeploy");

    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Project path {:?} does not exist", args.path))?;
    let mut console = Console::stdio();
    introduce(&mut console, &config);

    let branch = preflight::check_repository(&root).await?;
    match &args.branch {
        Some(new_branch) => {
            preflight::checkout_branch(&root, new_branch).await?;
            console.announce(&format!("Switched to branch '{}'", new_branch));
        }
        None => console.announce(&format!("Continuing on branch '{}'", branch)),
    }

    let name = deployment_name(&mut console, args.name.as_deref(), &root)?;
    let command = match args.command {
        Some(command) => Some(command),
        None => {
            let answer = console.input("Command to run the application (press Enter to skip): ")?;
            Some(answer.trim().to_string()).filter(|c| !c.is_empty())
        }
    };
    let environment = match &args.env_file {
        Some(path) => preflight::load_env(&root, path)?,
        None => BTreeMap::new(),
    };

    let model = OpenAiClient::from_config(&config).await?;
    let factory = AgentFactory::from_config(&config, &root, Arc::new(model)).with_environment(environment);
    let developer = Arc::new(factory.developer()?);

    let mut driver = Driver::new(console);
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let outcome = driver
        .run(developer, DeveloperRequest { name, command }, interrupt)
        .await;

    match outcome {
        Ok(Outcome::Complete(response)) => {
            if let Some(host) = driver.host_mut() {
                summarize(host, &response);
            }
        }
        Ok(Outcome::Interrupted) => {
            // The console may still be held by a prompt blocked on stdin.
            Console::stdio().say("Interrupted. Nothing more will run.", Tone::Alert);
            std::process::exit(130);
        }
        Err(e) => {
            let recent: Vec<String> = driver.recent_events().map(str::to_string).collect();
            let mut fallback = Console::stdio();
            let host: &mut dyn Host = match driver.host_mut() {
                Some(host) => host,
                None => &mut fallback,
            };
            host.say("The run failed. Last events:", Tone::Alert);
            for event in &recent {
                host.say(event, Tone::Log);
            }
            return Err(e.into());
        }
    }

    info!("autodeploy shutting down");
    Ok(())
}

fn introduce(console: &mut Console<impl BufRead, impl Write>, config: &Config) {
    console.announce("Let's get your project running in a container.");
    console.say(
        "You will need Docker and Git installed on your machine for this to work.",
        Tone::Plain,
    );
    if config.openai_base_url.is_some() && config.openai_api_key.is_some() {
        console.say("OpenAI credentials found in environment variables.", Tone::Success);
        console.say(
            "This run will use tokens from your OpenAI account and may incur costs.",
            Tone::Plain,
        );
    } else {
        console.say(
            "To use your own LLM, set AUTODEPLOY_OPENAI_BASE_URL, AUTODEPLOY_OPENAI_API_KEY and AUTODEPLOY_MODEL_NAME.",
            Tone::Log,
        );
    }
    console.say("Changes are committed to the current git branch.", Tone::Info);
}

fn deployment_name(
    console: &mut Console<impl BufRead, impl Write>,
    given: Option<&str>,
    root: &Path,
) -> Result<String> {
    if let Some(name) = given {
        preflight::validate_name(name)?;
        return Ok(name.to_string());
    }

    let default = preflight::default_name(root);
    loop {
        let answer = console.input(&format!("Name of deployment [{}]: ", default))?;
        let name = match answer.trim() {
            "" => default.clone(),
            typed => typed.to_string(),
        };
        match preflight::validate_name(&name) {
            Ok(()) => return Ok(name),
            Err(e) => console.say(&e.to_string(), Tone::Alert),
        }
    }
}

fn summarize(host: &mut impl Host, response: &DeveloperResponse) {
    host.say("The project is ready to be deployed.", Tone::Success);
    host.say(&format!("Dockerfile: {}", response.dockerfile_path), Tone::Plain);
    host.say(&format!("Command: {}", response.command), Tone::Plain);
    if let Some(port) = response.port {
        host.say(&format!("Port: {}", port), Tone::Plain);
    }
    host.say(&response.justification, Tone::Plain);
}
