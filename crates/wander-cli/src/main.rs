//! wander - terminal client for the travel planner agent

mod commands;
mod config;
mod render;
mod utils;

use clap::Parser;
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use wander_agent::{
    Controller, ControllerConfig, ControllerEvent, ControllerHandle, HttpTransport, StreamState,
    Transport,
};
use wander_proto::{ConversationId, PlannerClient};

use crate::render::Renderer;

/// wander - plan trips with the travel planner agent
#[derive(Parser, Debug)]
#[command(name = "wander")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the planner API (default: http://localhost:8000/api)
    #[arg(long)]
    server: Option<String>,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List conversations stored by the planner
    #[arg(long)]
    conversations: bool,

    /// Continue a conversation by ID
    #[arg(long)]
    conversation: Option<String>,

    /// Show a saved itinerary by ID
    #[arg(long)]
    itinerary: Option<String>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Print structured data attached to progress steps and results
    #[arg(long)]
    show_data: bool,
}

type Output = Renderer<io::Stdout>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(
                "wander_cli=debug,wander_agent=debug,wander_proto=debug",
            ))
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let server_url = cfg.server_url(args.server.as_deref());
    let show_data = cfg.show_data(args.show_data);
    let client = PlannerClient::new(server_url)?;

    if args.conversations {
        return list_conversations(&client).await;
    }

    if let Some(ref id) = args.itinerary {
        return show_itinerary(&client, id).await;
    }

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_client(client.clone()));
    let controller_config = cfg.controller_config();

    let mut controller = match args.conversation {
        Some(id) => {
            let id = ConversationId::new(id);
            describe_conversation(&client, &id).await;
            Controller::with_conversation(controller_config.clone(), transport.clone(), id)
        }
        None => Controller::new(controller_config.clone(), transport.clone()),
    };
    let mut output = Renderer::new(io::stdout(), show_data);

    // Non-interactive mode
    if let Some(command) = args.command {
        let _ctrl_c = abort_on_ctrl_c(controller.handle());
        return run_command(&mut controller, &mut output, &command).await;
    }

    let app = App {
        client,
        transport,
        controller_config,
        show_data,
    };
    run_interactive(&app, controller, &mut output).await
}

/// What interactive mode needs to start conversations
struct App {
    client: PlannerClient,
    transport: Arc<dyn Transport>,
    controller_config: ControllerConfig,
    show_data: bool,
}

impl App {
    /// Start a conversation, asking the planner for an identifier first
    async fn new_controller(&self) -> Controller {
        match self.client.new_conversation().await {
            Ok(id) => {
                tracing::info!(conversation_id = %id, "Allocated conversation");
                Controller::with_conversation(
                    self.controller_config.clone(),
                    self.transport.clone(),
                    id,
                )
            }
            Err(e) => {
                // the first stream assigns one instead
                tracing::warn!("Could not allocate conversation: {}", e);
                Controller::new(self.controller_config.clone(), self.transport.clone())
            }
        }
    }
}

/// Abort the running turn on Ctrl-C, or exit when nothing is running
fn abort_on_ctrl_c(handle: ControllerHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_busy() {
                eprintln!("\n[Aborting...]");
                handle.abort();
                handle.wait_for_idle().await;
                eprintln!("[Aborted]");
            } else {
                std::process::exit(130);
            }
        }
    })
}

/// Poll `turn` while rendering the controller events it produces
async fn drive<F: Future>(
    turn: F,
    events: &mut broadcast::Receiver<ControllerEvent>,
    output: &mut Output,
) -> F::Output {
    tokio::pin!(turn);
    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            Ok(event) = events.recv() => render_event(output, &event),
        }
    };
    while let Ok(event) = events.try_recv() {
        render_event(output, &event);
    }
    result
}

fn render_event(output: &mut Output, event: &ControllerEvent) {
    if let Err(e) = output.on_event(event) {
        tracing::warn!("Failed to write output: {}", e);
    }
}

async fn send_message(
    controller: &mut Controller,
    output: &mut Output,
    text: &str,
) -> wander_agent::Result<StreamState> {
    let mut events = controller.subscribe();
    drive(controller.submit_message(text), &mut events, output).await
}

/// Prompt for answers until the planner stops asking.
/// Returns `false` if the user quit or input ended.
async fn answer_interrupts(controller: &mut Controller, output: &mut Output) -> anyhow::Result<bool> {
    while controller.state() == StreamState::AwaitingHumanInput {
        let Some(context) = controller.interrupt() else {
            break;
        };
        let choices = render::format_interrupt(context);
        if !choices.is_empty() {
            println!("{}", choices);
        }

        let Some(input) = read_line("? ")? else {
            return Ok(false);
        };
        if input.is_empty() {
            continue;
        }
        if commands::parse_command(&input) == Some(commands::CommandResult::Exit) {
            return Ok(false);
        }
        let answer = match utils::parse_answer(&input, context) {
            Ok(answer) => answer,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let mut events = controller.subscribe();
        match drive(controller.submit_answer(answer), &mut events, output).await {
            Ok(_) => {}
            Err(e) if e.is_precondition() => println!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

async fn run_command(
    controller: &mut Controller,
    output: &mut Output,
    command: &str,
) -> anyhow::Result<()> {
    println!("wander> {}", command);
    println!();

    send_message(controller, output, command).await?;
    answer_interrupts(controller, output).await?;

    if let Some(id) = controller.conversation_id() {
        println!("\n[Conversation: {}]", id);
    }
    Ok(())
}

async fn run_interactive(
    app: &App,
    mut controller: Controller,
    output: &mut Output,
) -> anyhow::Result<()> {
    let mut ctrl_c = abort_on_ctrl_c(controller.handle());

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        match controller.conversation_id() {
            Some(id) => eprintln!("wander (conversation: {})", id),
            None => eprintln!("wander - where would you like to go?"),
        }
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        if !answer_interrupts(&mut controller, output).await? {
            break;
        }

        let Some(input) = read_line("> ")? else {
            break;
        };
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::parse_command(&input) {
            match result {
                commands::CommandResult::New => {
                    ctrl_c.abort();
                    controller = app.new_controller().await;
                    ctrl_c = abort_on_ctrl_c(controller.handle());
                    println!("Started a new conversation.");
                }
                commands::CommandResult::Status => print_status(&controller),
                commands::CommandResult::History => {
                    println!("{}", render::format_history(controller.log(), app.show_data));
                }
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Exit => break,
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!();
        match send_message(&mut controller, output, &input).await {
            Ok(_) => {}
            Err(e) if e.is_precondition() => println!("{}", e),
            Err(e) => return Err(e.into()),
        }
        println!();
    }

    ctrl_c.abort();
    Ok(())
}

/// Read one trimmed line from stdin. Returns `None` at end of input.
fn read_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn print_status(controller: &Controller) {
    let id = controller
        .conversation_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(not started)".to_string());
    println!("Conversation: {}", id);
    println!("State:        {}", controller.state());
    println!(
        "Progress:     {}/{}",
        controller.progress(),
        wander_agent::MAX_PROGRESS
    );
    if let Some(season) = controller.current_season() {
        println!("Season:       {}", season);
    }
    println!("Messages:     {}", controller.log().len());
}

async fn describe_conversation(client: &PlannerClient, id: &ConversationId) {
    match client.get_conversation(id).await {
        Ok(record) => {
            let messages = record.messages.as_ref().map(Vec::len).unwrap_or(0);
            println!(
                "Continuing conversation {} ({} messages, started {})",
                record.id,
                messages,
                utils::format_timestamp(record.created_at)
            );
        }
        Err(e) => {
            tracing::warn!(conversation_id = %id, "Could not load conversation: {}", e);
            eprintln!("Warning: could not load conversation {}: {}", id, e);
        }
    }
}

async fn list_conversations(client: &PlannerClient) -> anyhow::Result<()> {
    match client.list_conversations().await {
        Ok(conversations) => {
            if conversations.is_empty() {
                println!("No conversations found.");
            } else {
                println!("Conversations:\n");
                println!("{:<38} {:<18} Itinerary", "ID", "Created");
                println!("{}", "-".repeat(68));
                for c in conversations {
                    println!(
                        "{:<38} {:<18} {}",
                        c.id,
                        utils::format_timestamp(c.created_at),
                        if c.has_itinerary { "yes" } else { "no" }
                    );
                }
                println!("\nContinue with: wander --conversation <id>");
            }
        }
        Err(e) => {
            eprintln!("Error listing conversations: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn show_itinerary(client: &PlannerClient, id: &str) -> anyhow::Result<()> {
    let itinerary = match client.get_itinerary(id).await {
        Ok(itinerary) => itinerary,
        Err(e) => {
            eprintln!("Error loading itinerary: {}", e);
            std::process::exit(1);
        }
    };

    println!("{} ({} days)", itinerary.destination, itinerary.duration_days);
    println!("{}", "-".repeat(40));
    println!("Budget:   ${:.2}", itinerary.budget);
    if let Some(season) = &itinerary.season {
        println!("Season:   {}", season);
    }
    if let Some(dates) = &itinerary.travel_dates {
        println!("Dates:    {}", dates);
    }
    println!("Created:  {}", utils::format_timestamp(itinerary.created_at));

    if let Some(allocation) = &itinerary.budget_allocation {
        println!("\nBudget allocation:\n{}", serde_json::to_string_pretty(allocation)?);
    }
    if let Some(plan) = &itinerary.plan {
        println!("\nPlan:\n{}", serde_json::to_string_pretty(plan)?);
    }
    Ok(())
}
