//! Shellsmith terminal client.
//!
//! A small REPL over the session engine: create and switch sessions, send
//! messages to the generative service, watch responses stream in, and
//! export generated files as an archive.

use std::fs::File;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use engine::accumulator::Accumulator;
use engine::attachments::Attachment;
use engine::controller::{PreparedExchange, SendError, SessionController};
use engine::{exchange, export};
use providers::gemini::{GeminiClient, DEFAULT_MODEL};
use shared::settings::{AppConfig, PromptOptions};
use shared::types::{ChatSession, MessageSender, Platform, Profile, SubscriptionStatus};
use storage::config::ConfigStore;
use storage::kv::{FileStore, KeyValueStore};
use storage::scripts::ScriptStore;
use storage::sessions::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config_store = ConfigStore::new(FileStore::default_location()?);
    let mut config = config_store.load();

    if !gate_subscription(&mut config_store, &mut config)? {
        return Ok(());
    }

    if !config.onboarding_complete {
        run_onboarding(&mut config_store, &mut config)?;
    }

    let client = match GeminiClient::new(DEFAULT_MODEL) {
        Ok(client) => client,
        Err(err) => {
            // shown in place of the greeting, nothing else works without it
            println!("Error initializing the AI service: {err}");
            return Ok(());
        }
    };

    let mut controller = SessionController::new(
        SessionStore::new(FileStore::default_location()?),
        ScriptStore::new(FileStore::default_location()?),
    );
    let mut options = PromptOptions::default();
    let mut pending_files: Vec<Attachment> = Vec::new();

    println!("Shellsmith ready. Type /help for commands.");
    if let Some(session) = controller.active_session() {
        println!("Resumed session: {}", session.title);
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // /edit resends, so it needs the streaming loop and is handled here
        if let Some(args) = line.strip_prefix("/edit") {
            if let Some(prepared) =
                prepare_edit(args.trim(), &mut controller, &options, &config)
            {
                stream_exchange(&client, &mut controller, &prepared, &options).await;
            }
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !handle_command(command, &mut controller, &mut options, &mut pending_files)? {
                break;
            }
            continue;
        }

        let Some(session_id) = controller.active_session().map(|s| s.id.clone()) else {
            println!("No active session. Use /new first.");
            continue;
        };

        let files = std::mem::take(&mut pending_files);
        let prepared = match controller.prepare_exchange(
            &session_id,
            line,
            &files,
            &options,
            config.environment_profile.as_deref(),
        ) {
            Ok(prepared) => prepared,
            Err(err @ SendError::Attachment(_)) => {
                println!("Sorry, I couldn't process one of the files. ({err})");
                continue;
            }
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        stream_exchange(&client, &mut controller, &prepared, &options).await;
    }

    Ok(())
}

/// Runs one prepared exchange, printing streamed text and the final
/// citation list. Errors surface as the accumulator's error content.
async fn stream_exchange<S: KeyValueStore>(
    client: &GeminiClient,
    controller: &mut SessionController<S>,
    prepared: &PreparedExchange,
    options: &PromptOptions,
) {
    let mut accumulator = Accumulator::new(options.search_enabled);
    accumulator.start();
    if let Some(indicator) = accumulator.indicator() {
        println!("{}", indicator.label());
    }

    let mut printed = 0;
    let result = exchange::run(client, &prepared.request, &mut accumulator, |acc| {
        let text = acc.text();
        print!("{}", &text[printed..]);
        io::stdout().flush().ok();
        printed = text.len();
        controller.apply_stream_update(&prepared.session_id, &prepared.placeholder_id, acc);
    })
    .await;

    // final commit also covers the error text on failure
    controller.finish_exchange(&prepared.session_id, &prepared.placeholder_id, &accumulator);
    if let Err(err) = result {
        warn!(%err, "exchange failed");
        println!("\n{}", accumulator.text());
    } else {
        println!();
        let citations = accumulator.citations();
        if !citations.is_empty() {
            println!("Sources:");
            for citation in citations {
                println!("  - {} ({})", citation.title, citation.uri);
            }
        }
    }
}

/// Parses `/edit` arguments and truncates-and-resends through the
/// controller. With no arguments it lists the editable user messages.
fn prepare_edit<S: KeyValueStore>(
    args: &str,
    controller: &mut SessionController<S>,
    options: &PromptOptions,
    config: &AppConfig,
) -> Option<PreparedExchange> {
    let Some(session) = controller.active_session() else {
        println!("No active session.");
        return None;
    };
    if args.is_empty() {
        for message in session.messages.iter().filter(|m| m.sender == MessageSender::User) {
            println!(
                "{}  {}",
                short_id(&message.id),
                message.content.lines().next().unwrap_or_default()
            );
        }
        println!("Usage: /edit <message-id-prefix> <text>");
        return None;
    }
    let Some((prefix, new_text)) = args
        .split_once(char::is_whitespace)
        .map(|(prefix, rest)| (prefix, rest.trim()))
        .filter(|(_, rest)| !rest.is_empty())
    else {
        println!("Usage: /edit <message-id-prefix> <text>");
        return None;
    };
    let session_id = session.id.clone();
    let Some(target) = find_user_message(session, prefix) else {
        println!("No user message matches '{prefix}'");
        return None;
    };
    match controller.edit_and_resend(
        &session_id,
        &target,
        new_text,
        options,
        config.environment_profile.as_deref(),
    ) {
        Ok(prepared) => Some(prepared),
        Err(err) => {
            println!("{err}");
            None
        }
    }
}

/// Display prefix for an id. Migrated ids can be arbitrary strings, so
/// short ones and non-boundary cuts fall back to the full id.
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Resolves a user message by id prefix; assistant messages cannot be edited.
fn find_user_message(session: &ChatSession, prefix: &str) -> Option<String> {
    session
        .messages
        .iter()
        .find(|m| m.sender == MessageSender::User && m.id.starts_with(prefix))
        .map(|m| m.id.clone())
}

/// Checks the subscription gate, starting the trial on first run. Returns
/// false when the work area is blocked.
fn gate_subscription<S: KeyValueStore>(
    store: &mut ConfigStore<S>,
    config: &mut AppConfig,
) -> Result<bool> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    if config.subscription == SubscriptionStatus::None {
        store.start_trial(config, now_ms)?;
        info!("started free trial");
    }
    match store.refresh_subscription(config, now_ms)? {
        SubscriptionStatus::Expired => {
            println!("Your trial has expired. Upgrade to keep generating scripts.");
            Ok(false)
        }
        _ => Ok(true),
    }
}

fn run_onboarding<S: KeyValueStore>(
    store: &mut ConfigStore<S>,
    config: &mut AppConfig,
) -> Result<()> {
    println!("Which platform do you write scripts for? [linux/windows]");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    config.platform = Platform::parse(match line.trim().to_lowercase().as_str() {
        "windows" => "Windows",
        _ => "Linux",
    });

    println!("Describe your system (distro, shell, tools). Leave blank to skip.");
    let mut profile = String::new();
    io::stdin().lock().read_line(&mut profile)?;
    let profile = profile.trim();
    config.environment_profile = (!profile.is_empty()).then(|| profile.to_string());

    config.onboarding_complete = true;
    store.save(config).context("saving onboarding choices")
}

/// Returns false when the REPL should exit.
fn handle_command<S: KeyValueStore>(
    command: &str,
    controller: &mut SessionController<S>,
    options: &mut PromptOptions,
    pending_files: &mut Vec<Attachment>,
) -> Result<bool> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    match name {
        "help" => {
            println!(
                "/new [windows|linux] [profile...]   start a session\n\
                 /list                               list sessions\n\
                 /select <id-prefix>                 switch session\n\
                 /rename <title>                     rename active session\n\
                 /edit <message-id-prefix> <text>    rewrite a message and resend\n\
                 /delete [id-prefix]                 delete a session\n\
                 /profile <name>                     add a profile to the active session\n\
                 /attach <path>                      queue a file for the next message\n\
                 /search|/safety|/verbose on|off     toggle prompt options\n\
                 /scripts                            list saved scripts\n\
                 /save <name>                        save last assistant code block\n\
                 /export <file.tar.gz>               export generated files\n\
                 /quit                               exit"
            );
        }
        "new" => {
            let platform = match rest.first().map(|s| s.to_lowercase()) {
                Some(ref s) if s == "windows" => Platform::Windows,
                _ => Platform::Linux,
            };
            let profiles: Vec<Profile> = rest
                .iter()
                .skip(1)
                .filter_map(|s| {
                    let parsed = Profile::parse(&s.to_lowercase());
                    if parsed.is_none() {
                        println!("Unknown profile: {s}");
                    }
                    parsed
                })
                .collect();
            let id = controller.create_session(platform, profiles, None);
            println!("Started session {}", short_id(&id));
            if let Some(greeting) = controller
                .active_session()
                .and_then(|s| s.messages.first())
            {
                println!("{}", greeting.content);
            }
        }
        "list" => {
            for session in controller.sessions() {
                let marker = if controller
                    .active_session()
                    .is_some_and(|active| active.id == session.id)
                {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {}  {}  [{}] {}",
                    short_id(&session.id),
                    session.created_at.format("%Y-%m-%d %H:%M"),
                    session.platform.as_str(),
                    session.title
                );
            }
        }
        "select" => match rest.first() {
            Some(prefix) => match find_by_prefix(controller, prefix) {
                Some(id) => {
                    controller.select_session(&id)?;
                    println!("Switched to {}", controller.active_session().unwrap().title);
                }
                None => println!("No session matches '{prefix}'"),
            },
            None => println!("Usage: /select <id-prefix>"),
        },
        "rename" => {
            let title = rest.join(" ");
            match controller.active_session().map(|s| s.id.clone()) {
                Some(id) if !title.is_empty() => controller.rename_session(&id, &title)?,
                Some(_) => println!("Usage: /rename <title>"),
                None => println!("No active session."),
            }
        }
        "delete" => {
            let target = match rest.first() {
                Some(prefix) => find_by_prefix(controller, prefix),
                None => controller.active_session().map(|s| s.id.clone()),
            };
            match target {
                Some(id) => {
                    controller.delete_session(&id)?;
                    println!("Deleted.");
                }
                None => println!("Nothing to delete."),
            }
        }
        "profile" => match rest.first().and_then(|s| Profile::parse(&s.to_lowercase())) {
            Some(profile) => match controller.active_session().map(|s| s.id.clone()) {
                Some(id) => {
                    controller.add_profile(&id, profile)?;
                    println!("Added {}.", profile.display_name());
                }
                None => println!("No active session."),
            },
            None => println!("Usage: /profile <name>"),
        },
        "attach" => match rest.first() {
            Some(path) => match std::fs::read(path) {
                Ok(data) => {
                    let name = path.rsplit('/').next().unwrap_or(path).to_string();
                    println!("Attached {name} ({} bytes)", data.len());
                    pending_files.push(Attachment { name, data });
                }
                Err(err) => println!("Could not read {path}: {err}"),
            },
            None => println!("Usage: /attach <path>"),
        },
        "search" => options.search_enabled = parse_toggle(&rest, options.search_enabled),
        "safety" => options.safety_mode = parse_toggle(&rest, options.safety_mode),
        "verbose" => options.verbose_comments = parse_toggle(&rest, options.verbose_comments),
        "scripts" => {
            for script in controller.scripts() {
                println!(
                    "{}  {}  [{}] {}",
                    short_id(&script.id),
                    script.created_at.format("%Y-%m-%d"),
                    script.language,
                    script.name
                );
            }
        }
        "save" => {
            let name = rest.join(" ");
            let Some(session) = controller.active_session() else {
                println!("No active session.");
                return Ok(true);
            };
            let code = session
                .messages
                .iter()
                .rev()
                .find(|m| m.sender == MessageSender::Assistant)
                .and_then(|m| last_code_block(&m.content));
            match code {
                Some(code) if !name.is_empty() => {
                    let id = session.id.clone();
                    controller.save_script(&name, &code, &id)?;
                    println!("Saved script '{name}'.");
                }
                Some(_) => println!("Usage: /save <name>"),
                None => println!("No code block found in the last response."),
            }
        }
        "export" => match (rest.first(), controller.active_session()) {
            (Some(path), Some(session)) => {
                let file = File::create(path).with_context(|| format!("creating {path}"))?;
                match export::export_session(session, file) {
                    Ok(count) => println!("Wrote {count} file(s) to {path}"),
                    Err(err) => println!("{err}"),
                }
            }
            (None, _) => println!("Usage: /export <file.tar.gz>"),
            (_, None) => println!("No active session."),
        },
        "quit" | "exit" => return Ok(false),
        other => println!("Unknown command: /{other}"),
    }
    Ok(true)
}

fn find_by_prefix<S: KeyValueStore>(
    controller: &SessionController<S>,
    prefix: &str,
) -> Option<String> {
    controller
        .sessions()
        .iter()
        .find(|s| s.id.starts_with(prefix))
        .map(|s| s.id.clone())
}

fn parse_toggle(rest: &[&str], current: bool) -> bool {
    match rest.first() {
        Some(&"on") => true,
        Some(&"off") => false,
        _ => {
            println!("Usage: on|off (currently {})", if current { "on" } else { "off" });
            current
        }
    }
}

/// Last fenced code block in a message, without the fence lines.
fn last_code_block(content: &str) -> Option<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            match current.take() {
                Some(block) => blocks.push(block.join("\n")),
                None => current = Some(Vec::new()),
            }
        } else if let Some(block) = current.as_mut() {
            block.push(line);
        }
    }
    blocks.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::ChatMessage;

    #[test]
    fn test_short_id_tolerates_legacy_ids() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        // migrated sessions keep whatever id they were stored with
        assert_eq!(short_id("s1"), "s1");
        assert_eq!(short_id(""), "");
        // a multibyte character straddling the cut keeps the full id
        assert_eq!(short_id("日本語abcdef"), "日本語abcdef");
    }

    #[test]
    fn test_find_user_message_skips_assistant_messages() {
        let mut session = ChatSession::new(Platform::Linux, vec![], None);
        session.messages.push(ChatMessage::assistant("hello"));
        session.messages.push(ChatMessage::user("first question"));
        let target = session.messages[1].id.clone();

        let prefix = short_id(&target);
        assert_eq!(find_user_message(&session, prefix), Some(target));
        assert_eq!(find_user_message(&session, "no-such-prefix"), None);
    }
}
