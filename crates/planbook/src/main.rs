//! A terminal front end of the planbook assistant.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use planbook::core::ConversationStore;
use planbook::http::ApiConfigBuilder;
use planbook::model::{ConversationId, Message, Role, ToolInvocation};
use planbook::{Session, SessionBuilder};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;

/// The assistant message as it is being streamed.
struct Reply {
    content: String,
    tool_calls: Vec<ToolInvocation>,
    streaming: bool,
}

enum Flow {
    Continue,
    Quit,
}

const BAR_CHAR: &str = "▎";

const HELP: &str = "\
/new          start a new conversation
/list         list conversations
/open <id>    switch to a conversation
/delete <id>  delete a conversation
/quit         exit";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(base_url) = env::var("PLANBOOK_BASE_URL") else {
        eprintln!("PLANBOOK_BASE_URL environment variable is not set");
        return;
    };
    let Ok(token) = env::var("PLANBOOK_TOKEN") else {
        eprintln!("PLANBOOK_TOKEN environment variable is not set");
        return;
    };

    let config = ApiConfigBuilder::with_base_url(base_url)
        .with_token(token)
        .build();

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let mut session = SessionBuilder::with_config(config)
        .on_update(move |store| {
            if let Some(reply) = reply_of(store) {
                reply_tx.send(reply).ok();
            }
        })
        .build();

    if let Err(err) = session.refresh_conversations().await {
        eprintln!("{}", format!("Failed to list conversations: {err}").red());
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print_prompt(session.store());
        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match run_command(&mut session, command).await {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        // Updates of earlier operations are not part of this reply.
        while reply_rx.try_recv().is_ok() {}
        stream_reply(&mut session, line, &mut reply_rx, &progress_style).await;
    }
}

fn reply_of(store: &ConversationStore) -> Option<Reply> {
    let message = store.messages().last()?;
    if message.role != Role::Assistant {
        return None;
    }
    Some(Reply {
        content: message.content.clone(),
        tool_calls: message.tool_calls.clone(),
        streaming: message.streaming,
    })
}

async fn stream_reply(
    session: &mut Session,
    content: &str,
    replies: &mut mpsc::UnboundedReceiver<Reply>,
    progress_style: &ProgressStyle,
) {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style.clone());
    progress_bar.set_message("🤔 Thinking...");
    progress_bar.enable_steady_tick(Duration::from_millis(100));

    let mut printer = ReplyPrinter::default();
    let mut send = pin!(session.send(None, content));
    let result = loop {
        select! {
            result = &mut send => break result,
            Some(reply) = replies.recv() => {
                printer.print(&reply, &progress_bar);
            }
        }
    };
    while let Ok(reply) = replies.try_recv() {
        printer.print(&reply, &progress_bar);
    }

    progress_bar.finish_and_clear();
    if let Err(err) = result {
        eprintln!("{}", err.red());
        return;
    }
    println!("\n");
}

/// Prints the part of a streamed reply that has not been printed yet.
#[derive(Default)]
struct ReplyPrinter {
    printed: usize,
    announced_calls: usize,
    printed_results: Vec<bool>,
}

impl ReplyPrinter {
    fn print(&mut self, reply: &Reply, progress_bar: &ProgressBar) {
        let bar = BAR_CHAR.bright_cyan();
        progress_bar.suspend(|| {
            for call in reply.tool_calls.iter().skip(self.announced_calls) {
                println!(
                    "{bar}🔧 {} {}",
                    call.name.bright_yellow(),
                    describe_args(call).dimmed()
                );
                self.printed_results.push(false);
            }
            self.announced_calls =
                self.announced_calls.max(reply.tool_calls.len());

            for (call, printed) in
                reply.tool_calls.iter().zip(&mut self.printed_results)
            {
                if let (Some(result), false) = (&call.result, *printed) {
                    println!("{bar}✅ {}: {}", call.name, result.dimmed());
                    *printed = true;
                }
            }

            let Some(text) = reply.content.get(self.printed..) else {
                return;
            };
            if text.is_empty() {
                return;
            }
            if self.printed == 0 {
                print!("{bar}🤖 ");
            }
            print!("{}", text.bright_white());
            std::io::stdout().flush().ok();
            self.printed = reply.content.len();
        });

        if !reply.streaming {
            progress_bar.finish_and_clear();
        }
    }
}

fn describe_args(call: &ToolInvocation) -> String {
    call.args
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

async fn run_command(session: &mut Session, command: &str) -> Flow {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let id = parts.next().map(str::parse::<ConversationId>);

    let result = match (name, id) {
        ("quit" | "exit", _) => return Flow::Quit,
        ("new", _) => session.new_conversation().await.map(|id| {
            println!("Started conversation {id}.");
        }),
        ("list", _) => session.refresh_conversations().await.map(|()| {
            print_conversations(session.store());
        }),
        ("open", Some(Ok(id))) => {
            session.select_conversation(id).await.map(|()| {
                print_history(session.store().messages());
            })
        }
        ("delete", Some(Ok(id))) => {
            session.delete_conversation(id).await.map(|()| {
                println!("Deleted conversation {id}.");
            })
        }
        _ => {
            println!("{HELP}");
            return Flow::Continue;
        }
    };

    if let Err(err) = result {
        eprintln!("{}", err.red());
    }
    Flow::Continue
}

fn print_prompt(store: &ConversationStore) {
    match store.active_conversation() {
        Some(conversation) => print!("{} > ", conversation.name.bright_blue()),
        None => print!("> "),
    }
    std::io::stdout().flush().ok();
}

fn print_conversations(store: &ConversationStore) {
    if store.conversations().is_empty() {
        println!("No conversations yet.");
        return;
    }
    for conversation in store.conversations() {
        let marker = if store.active_id() == Some(conversation.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>4}  {}  {}",
            conversation.id,
            conversation.name.bright_white(),
            format!(
                "{} messages, updated {}",
                conversation.message_count,
                conversation.updated_at.format("%Y-%m-%d %H:%M")
            )
            .dimmed()
        );
    }
}

fn print_history(messages: &[Message]) {
    for message in messages {
        match message.role {
            Role::Human => {
                println!("{}🙂 {}", BAR_CHAR.bright_green(), message.content)
            }
            Role::Assistant => {
                for call in &message.tool_calls {
                    println!(
                        "{}🔧 {}",
                        BAR_CHAR.bright_cyan(),
                        call.name.bright_yellow()
                    );
                }
                println!(
                    "{}🤖 {}",
                    BAR_CHAR.bright_cyan(),
                    message.content.bright_white()
                );
            }
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
