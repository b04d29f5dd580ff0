//! Interactive streaming chat client.
//!
//! Posts each prompt to a generate endpoint and renders the streamed markdown
//! reply in place as it arrives.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a server on localhost:8080
//! streamchat
//!
//! # Use another endpoint
//! streamchat --api-url http://chat.example.com/generate
//!
//! # Disable colors (useful for piping output)
//! streamchat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/theme` - Toggle the light/dark theme
//! - `/session` - Show the session id
//! - `/new` - Start a new session
//! - `/stats` - Show request statistics
//! - `/quit` - Exit the application

use std::io::IsTerminal;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use streamchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, StreamChat, TerminalRenderer,
    bind_enter_keys, help_text, parse_command,
};
use streamchat::{
    FileStorage, HttpTransport, InputBox, MarkdownRenderer, MemoryStorage, RenderStyle, Storage,
    ThemeSwitch, Transport,
};

/// Log to stderr so stdout stays the chat surface.
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("streamchat=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Main entry point for the streamchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (args, _) = ChatArgs::from_command_line_relaxed("streamchat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color && std::io::stdout().is_terminal();

    let transport = HttpTransport::new(&config.api_url)?;
    let mut theme = ThemeSwitch::load(FileStorage::new(&config.state_path));
    let style = if use_color {
        RenderStyle::Ansi
    } else {
        RenderStyle::Plain
    };
    let markdown = MarkdownRenderer::new(style, theme.current());
    let mut chat = StreamChat::new(transport, MemoryStorage::new(), markdown);

    let mut renderer: Box<dyn Renderer> = if use_color {
        Box::new(TerminalRenderer::new(theme.current()))
    } else {
        Box::new(PlainTextRenderer::new())
    };

    let mut rl = DefaultEditor::new()?;
    bind_enter_keys(&mut rl);
    let mut input = InputBox::new();

    println!("streamchat ({})", config.api_url);
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Theme => {
                            let next = theme.toggle();
                            chat.set_theme(next);
                            renderer.set_theme(next);
                            renderer.print_info(&format!("Theme set to {next}."));
                        }
                        ChatCommand::Session => {
                            renderer.print_info(&format!("Session: {}", chat.session_id()));
                        }
                        ChatCommand::NewSession => {
                            chat.new_session();
                            renderer.print_info("Started a new session.");
                        }
                        ChatCommand::Stats => {
                            print_stats(&chat, &config);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                input.set_value(line);
                chat.send(&mut input, renderer.as_mut()).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats<T: Transport, S: Storage>(chat: &StreamChat<T, S>, config: &ChatConfig) {
    let stats = chat.stats();
    println!("    Session Statistics:");
    match stats.session_id {
        Some(ref id) => println!("      Session: {id}"),
        None => println!("      Session: (not started)"),
    }
    println!(
        "      Requests: {} ({} completed, {} failed)",
        stats.requests, stats.completed, stats.failed
    );
    println!("      Ignored sends: {}", stats.rejected);
    println!("      Theme: {}", chat.theme());
    println!("      API URL: {}", config.api_url);
    println!("      State file: {}", config.state_path.display());
}
