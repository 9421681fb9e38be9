use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use tickwire::components::chat::ChatScenario;
use tickwire::components::server::ServerScenario;
use tickwire::prelude::*;
use tickwire::{ENGINE_NAME, VERSION as LIB_VERSION};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

type ShellEditor = Editor<ShellHelper, DefaultHistory>;

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHelper;

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let rule = "-".repeat(79);

    println!("{}", rule.dimmed());
    println!("{}", version_string);
    let notice = "\n    This software is provided 'as is', without warranty of any kind.\n    \
                  Distributed under the MIT OR Apache-2.0 license. Use at your own risk.\n";
    println!("{}", notice.dimmed());
    println!("{}", rule.dimmed());
}

/// Answers the continue checkpoint from the terminal.
struct ConsoleOperator<'a> {
    editor: &'a mut ShellEditor,
}

impl Operator for ConsoleOperator<'_> {
    fn confirm_continue(&mut self, prompt: &CheckpointPrompt) -> bool {
        let question = format!(
            "Continue the {} simulation for {} more ticks (~{}s)? (Y or N): ",
            prompt.scenario,
            prompt.refill,
            prompt.session_length().as_secs()
        );
        match self.editor.readline(&question) {
            Ok(answer) => {
                let answer = answer.trim().to_lowercase();
                let proceed = answer == "y" || answer == "yes";
                if !proceed {
                    println!("Exiting simulation.");
                }
                proceed
            }
            Err(_) => false,
        }
    }
}

/// The chat window: renders chat lines and logon notices.
struct ChatWindow;

impl Subscriber for ChatWindow {
    fn label(&self) -> &str {
        "chat-window"
    }

    fn handle(&mut self, _ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        if let Some(text) = message.text() {
            if message.channel == LOGON_NOTICE || text.ends_with("HAS LOGGED OFF.") {
                println!("{}", text.cyan().bold());
            } else {
                println!("{}", text);
            }
        }
        Ok(())
    }
}

/// The server console: one timestamped, colored block per log event.
struct ServerConsole;

impl Subscriber for ServerConsole {
    fn label(&self) -> &str {
        "server-console"
    }

    fn handle(&mut self, _ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        let Payload::Log(event) = &message.payload else {
            return Ok(());
        };
        let time = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
        let level = format!(" {} ", event.level);
        match event.level {
            LogLevel::Info => {
                println!("{} | {}\n{}", time.green(), level.black().on_green(), event.body)
            }
            LogLevel::Warning => {
                println!("{} | {}\n{}", time.yellow(), level.black().on_yellow(), event.body)
            }
            LogLevel::Critical => println!(
                "{} | {}\n{}",
                time.red().bold(),
                level.white().on_red(),
                event.body.red().bold()
            ),
        }
        Ok(())
    }
}

/// Prints scheduler lifecycle notifications.
struct SystemLine;

impl Subscriber for SystemLine {
    fn label(&self) -> &str {
        "system-line"
    }

    fn handle(&mut self, _ctx: &DispatchContext<'_>, message: &Message) -> anyhow::Result<()> {
        if let Payload::System(event) = &message.payload {
            println!("{}", format!("<-- [SYSTEM] {:?}", event).dimmed());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ScenarioKind {
    Chat,
    Server,
}

impl ScenarioKind {
    fn intro(self) -> &'static str {
        match self {
            ScenarioKind::Chat => {
                "    This simulates a chat room with several users. Users log on, greet\n    \
                 each other, chat at random intervals and eventually log off. None of\n    \
                 them knows about the others: every line travels over a named channel."
            }
            ScenarioKind::Server => {
                "    This simulates a web server receiving requests and sending responses.\n    \
                 Every event is published on the log channel and rendered by severity.\n    \
                 Requests, responses, warnings and errors are all completely random."
            }
        }
    }
}

async fn run_scenario(
    editor: &mut ShellEditor,
    kind: ScenarioKind,
    config: &SimConfig,
    seed: Option<u64>,
) -> Result<()> {
    println!("\n{}\n", kind.intro());
    if editor
        .readline("Press Enter to start the simulation: ")
        .is_err()
    {
        return Ok(());
    }

    let bus = ChannelRegistry::new();
    let system = bus.register(SystemLine);
    bus.subscribe(SYSTEM, system);
    let rng = SharedRng::from_seed_option(seed);

    let mut scheduler = match kind {
        ScenarioKind::Chat => {
            let window = bus.register(ChatWindow);
            bus.subscribe(CHAT, window);
            bus.subscribe(LOGON_NOTICE, window);
            Scheduler::new(
                config.chat.schedule.clone(),
                bus,
                rng,
                ChatScenario::new(config.chat.clone()),
            )?
        }
        ScenarioKind::Server => {
            let console = bus.register(ServerConsole);
            bus.subscribe(LOG, console);
            Scheduler::new(
                config.server.schedule.clone(),
                bus,
                rng,
                ServerScenario::new(config.server.clone()),
            )?
        }
    };

    let mut operator = ConsoleOperator { editor };
    let summary = scheduler.run(&mut operator).await?;
    println!(
        "--> Simulation stopped after {} ticks over {} session(s).",
        summary.ticks, summary.sessions
    );
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  run chat              - Starts the chat room simulation.");
    println!("  run server            - Starts the web server simulation.");
    println!("  seed <N>              - Makes the next runs reproducible with seed N.");
    println!("  seed random           - Seeds the next runs from the operating system.");
    println!("  config                - Shows the active configuration.");
    println!("  help                  - Shows this list of commands.");
    println!("  exit                  - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = SimConfig::load(config_path.as_deref())?;
    let mut seed = config.seed;
    info!(seed = ?seed, "configuration loaded");

    let mut rl: ShellEditor = Editor::new()?;
    rl.set_helper(Some(ShellHelper));

    println!(
        "{} shell is ready. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();

                if let Some(command) = args.first() {
                    match *command {
                        "run" => {
                            let kind = match args.get(1) {
                                Some(&"chat") => Some(ScenarioKind::Chat),
                                Some(&"server") => Some(ScenarioKind::Server),
                                _ => None,
                            };
                            match kind {
                                Some(kind) => {
                                    let outcome = run_scenario(&mut rl, kind, &config, seed).await;
                                    if let Err(e) = outcome {
                                        println!("Error: {}", e);
                                    }
                                }
                                None => println!("Usage: run <chat|server>"),
                            }
                        }
                        "seed" => match args.get(1) {
                            Some(&"random") => {
                                seed = None;
                                println!("--> Runs will be seeded from the operating system.");
                            }
                            Some(value) => match value.parse::<u64>() {
                                Ok(value) => {
                                    seed = Some(value);
                                    println!("--> Runs will use seed {}.", value);
                                }
                                Err(_) => println!("Error: '{}' is not a valid seed.", value),
                            },
                            None => println!("Current seed: {:?}", seed),
                        },
                        "config" => println!("{:#?}", config),
                        "help" => print_help(),
                        "exit" => break,
                        _ => println!("Unknown command: '{}'. Type 'help'.", line),
                    }
                }
            }
            Err(_) => {
                println!("Exiting tickshell...");
                break;
            }
        }
    }

    Ok(())
}
