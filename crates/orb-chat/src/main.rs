//! A terminal chat client demonstrating how to use `orb-chat` as a library.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use orb_chat::command::{
    Command, HELP, Input, SUGGESTED_PROMPTS, read_line,
};
use orb_chat::core::load_attachment;
use orb_chat::model::{ConversationId, Message, Role, Theme};
use orb_chat::{ClientConfig, Session, SessionBuilder};
use owo_colors::OwoColorize;
use tokio::io;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

enum SessionEvent {
    Idle,
    Message(ConversationId, Message),
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let session = SessionBuilder::with_config(&config)
        .on_idle({
            let event_tx = event_tx.clone();
            move || {
                event_tx.send(SessionEvent::Idle).ok();
            }
        })
        .on_message({
            let event_tx = event_tx.clone();
            move |id, message| {
                event_tx
                    .send(SessionEvent::Message(id, message.clone()))
                    .ok();
            }
        })
        .build();

    print_welcome(&session).await;

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .expect("spinner template is valid")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut stdin = io::BufReader::new(io::stdin());

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let prompt = match Input::parse(&line) {
            Ok(Input::Empty) => continue,
            Ok(Input::Prompt(prompt)) => prompt,
            Ok(Input::Command(Command::Quit)) => break,
            Ok(Input::Command(command)) => {
                run_command(&session, command).await;
                continue;
            }
            Err(err) => {
                println!("{}", err.bright_red());
                continue;
            }
        };

        let theme = session.theme().await;
        if session.submit(prompt).await.is_none() {
            println!("{}", "Still waiting for the previous reply.".dimmed());
            continue;
        }

        let mut progress_bar = None;

        loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            match event {
                // The user's own turn is already on screen.
                SessionEvent::Message(_, message)
                    if message.role == Role::User => {}
                SessionEvent::Message(id, message) => {
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    trace!("reply for conversation {id}");
                    print_message(&message, theme);
                }
                SessionEvent::Idle => {
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    break;
                }
            }
        }
    }
}

async fn run_command(session: &Session, command: Command) {
    let theme = session.theme().await;
    match command {
        Command::New => {
            let id = session.new_conversation().await;
            println!("Started conversation {}", id.bold());
        }
        Command::List => {
            let conversations = session.conversations().await;
            if conversations.is_empty() {
                println!("{}", "No conversations yet.".dimmed());
                return;
            }
            let active = session.active_conversation().await.map(|c| c.id);
            for conversation in conversations {
                let marker = if Some(conversation.id) == active {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {} {} {}",
                    conversation.id.bold(),
                    conversation.title,
                    format!(
                        "({} messages, {})",
                        conversation.transcript.len(),
                        conversation.updated_at.format("%Y-%m-%d %H:%M")
                    )
                    .dimmed()
                );
            }
        }
        Command::Select(id) => {
            if let Err(err) = session.select_conversation(id).await {
                println!("{}", err.bright_red());
                return;
            }
            let Some(conversation) = session.conversation(id).await else {
                return;
            };
            println!("{}", conversation.title.bold());
            for message in &conversation.transcript {
                print_message(message, theme);
            }
        }
        Command::Delete(id) => {
            if session.conversation(id).await.is_none() {
                println!("{}", format!("No conversation {id}").bright_red());
                return;
            }
            session.delete_conversation(id).await;
            println!("Deleted conversation {id}");
        }
        Command::Attach(path) => match load_attachment(&path).await {
            Ok(attachment) => {
                let info = attachment.info();
                session.stage_attachment(attachment).await;
                println!(
                    "📎 {} {}",
                    info.name,
                    format!("({}, {} bytes)", info.media_type, info.size)
                        .dimmed()
                );
            }
            Err(err) => println!("{}", err.bright_red()),
        },
        Command::Files => {
            let files = session.staged_attachments().await;
            if files.is_empty() {
                println!("{}", "No files attached.".dimmed());
            }
            for info in files {
                println!(
                    "📎 {} {}",
                    info.name,
                    format!("({}, {} bytes)", info.media_type, info.size)
                        .dimmed()
                );
            }
        }
        Command::ClearFiles => {
            session.clear_attachments().await;
            println!("Removed attached files");
        }
        Command::Search(enabled) => {
            session.set_web_search(enabled).await;
            let state = if enabled { "on" } else { "off" };
            println!("Web search is {state}");
        }
        Command::Theme(theme) => {
            session.set_theme(theme).await;
            println!("Theme set to {theme}");
        }
        Command::Status => match session.backend_status().await {
            Ok(status) => println!(
                "Backend at {} reports {}",
                session.backend_url(),
                status.bright_green()
            ),
            Err(err) => {
                let url = session.backend_url();
                let text = format!("Backend at {url} is unreachable: {err}");
                println!("{}", text.bright_red());
            }
        },
        Command::Help => {
            for (usage, description) in HELP {
                println!("  {:<20} {}", usage.bold(), description);
            }
        }
        Command::Quit => {}
    }
}

async fn print_welcome(session: &Session) {
    let conversations = session.conversations().await;
    println!("{}", "Welcome to Orb Chat".bold());
    if conversations.is_empty() {
        println!("Ask anything to get started, for example:");
        for prompt in SUGGESTED_PROMPTS {
            println!("  {} {}", "•".bright_cyan(), prompt);
        }
    } else {
        println!(
            "You have {} conversations, type {} to browse them.",
            conversations.len(),
            "/list".bold()
        );
    }
    println!("{}", "Type /help for commands.".dimmed());
    println!();
}

fn print_message(message: &Message, theme: Theme) {
    match message.role {
        Role::User => {
            println!("{}🙂 {}", BAR_CHAR.bright_green(), message.content)
        }
        Role::Assistant => match theme {
            Theme::Dark => println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                message.content.bright_white()
            ),
            Theme::Light => println!(
                "{}🤖 {}",
                BAR_CHAR.blue(),
                message.content.black()
            ),
        },
    }
}
