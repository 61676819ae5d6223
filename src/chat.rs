//! # Chat front end
//!
//! Wires configuration, the completion client and the message log into a
//! [`TurnController`], and drives it either once ([`ask`]) or from an
//! interactive loop ([`interactive_mode`]).
//!
//! Each pass of the interactive loop renders one input field (its key comes
//! from the session's [`crate::staging::InputStaging`]), binds the typed line
//! to it, submits, and then drains the pending submission into the
//! controller. Lines starting with `/` are commands; `//` sends the rest of
//! the line, with a single leading `/`, as an ordinary message:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/new` | new conversation id, empty transcript |
//! | `/model <name>` | switch to an allow-listed model |
//! | `/models` | list the allow-list |
//! | `/temp <x>` | temperature in [0.0, 1.5] |
//! | `/id` | show the conversation id |
//! | `/history` | re-render the transcript |
//! | `/help` | this table |
//! | `/exit` | leave |

use std::error::Error;
use std::io::{BufRead, Write};
use tracing::{debug, info};

use crate::{
    completion::{CompletionClient, HttpCompletionService},
    config::FrostConfig,
    controller::{TurnController, TurnReport},
    error::ChatError,
    history::Turn,
    persistence::SqliteTurnStore,
    render,
    session::ChatSession,
};

const HELP: &str = "\
/new            start a new conversation
/model <name>   switch model
/models         list allowed models
/temp <x>       set temperature (0.0 to 1.5)
/id             show the conversation id
/history        show the transcript
/help           show this help
/exit           quit
//text          send \"/text\" as a message";

/// A slash command typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    New,
    Model(String),
    Models,
    Temperature(String),
    Id,
    History,
    Help,
    Exit,
    Unknown(String),
}

/// Parse a prompt line; `None` when it is an ordinary message.
///
/// A line starting with `//` is a message, see [`unescape_message`].
pub fn parse_command(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    if rest.starts_with('/') {
        return None;
    }
    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim().to_string()),
        None => (rest, String::new()),
    };

    let command = match name {
        "new" => ReplCommand::New,
        "model" => ReplCommand::Model(argument),
        "models" => ReplCommand::Models,
        "temp" | "temperature" => ReplCommand::Temperature(argument),
        "id" => ReplCommand::Id,
        "history" => ReplCommand::History,
        "help" => ReplCommand::Help,
        "exit" | "quit" => ReplCommand::Exit,
        other => ReplCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Turn an escaped `//text` line into the message `/text`.
pub fn unescape_message(line: &str) -> &str {
    match line.trim_start().strip_prefix('/') {
        Some(rest) if rest.starts_with('/') => rest,
        _ => line,
    }
}

/// Build a controller talking HTTP to `config.api_base` and logging to
/// `config.session_db_url`.
pub fn build_controller(config: &FrostConfig) -> Result<TurnController, ChatError> {
    let service = HttpCompletionService::new(&config.api_base, &config.api_key)?;
    let client = CompletionClient::new(Box::new(service), config.allowed_models.clone());
    let store = SqliteTurnStore::open(&config.session_db_url)?;
    Ok(TurnController::new(client, Box::new(store), config.system_prompt.clone()))
}

/// Apply command-line overrides to a fresh session.
pub fn apply_overrides(
    session: &mut ChatSession,
    model: Option<&str>,
    temperature: Option<f64>,
) -> Result<(), ChatError> {
    if let Some(model) = model {
        session.settings.set_model(model)?;
    }
    if let Some(temperature) = temperature {
        session.settings.set_temperature(temperature)?;
    }
    Ok(())
}

/// Run a single turn and print the outcome.
///
/// # Errors
/// Returns the turn's blocking error (invalid model, empty answer, failed
/// completion); persistence problems are only printed as warnings.
pub async fn ask<W: Write>(
    controller: &mut TurnController,
    session: &mut ChatSession,
    question: &str,
    out: &mut W,
) -> Result<String, Box<dyn Error>> {
    let spinner = render::waiting_spinner();
    let report = controller.handle_user_message(session, question).await;
    spinner.finish_and_clear();

    for warning in &report.warnings {
        render::print_warning(out, warning)?;
    }

    match report.reply() {
        Some(reply) => {
            render::print_markdown(out, reply)?;
            out.flush()?;
            Ok(reply.to_string())
        }
        None => Err(report.error().unwrap_or(ChatError::EmptyCompletion).into()),
    }
}

/// Interactive conversation until `/exit` or end of input.
pub async fn interactive_mode<R: BufRead, W: Write>(
    controller: &mut TurnController,
    session: &mut ChatSession,
    mut input: R,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    render::print_status(out, session)?;
    writeln!(out, "Type /help for commands.\n")?;

    loop {
        let key = session.staging.field_key();
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            debug!("End of input, leaving chat");
            break;
        }

        if let Some(command) = parse_command(&line) {
            if !run_command(command, controller, session, out)? {
                break;
            }
            continue;
        }

        session.staging.bind(key, unescape_message(&line))?;
        if !session.staging.submit(key) {
            continue;
        }

        let spinner = render::waiting_spinner();
        let report = controller.process_pending(session).await;
        spinner.finish_and_clear();

        if let Some(report) = report {
            print_report(out, &report)?;
        }
    }

    info!("Chat ended for conversation {}", session.conversation_id());
    Ok(())
}

/// Render the visible result of a turn: warnings, then the reply or error.
pub fn print_report<W: Write>(out: &mut W, report: &TurnReport) -> Result<(), Box<dyn Error>> {
    for warning in &report.warnings {
        render::print_warning(out, warning)?;
    }
    match report.reply() {
        Some(reply) => render::print_turn(out, &Turn::assistant(reply))?,
        None => {
            if let Some(err) = report.error() {
                render::print_error(out, &err)?;
            }
        }
    }
    Ok(())
}

/// Returns `false` when the loop should stop.
fn run_command<W: Write>(
    command: ReplCommand,
    controller: &TurnController,
    session: &mut ChatSession,
    out: &mut W,
) -> Result<bool, Box<dyn Error>> {
    match command {
        ReplCommand::Exit => return Ok(false),
        ReplCommand::New => {
            session.reset();
            writeln!(out, "New conversation.")?;
            render::print_status(out, session)?;
        }
        ReplCommand::Model(name) => match session.settings.set_model(&name) {
            Ok(()) => render::print_status(out, session)?,
            Err(err) => render::print_error(out, &err)?,
        },
        ReplCommand::Models => {
            for model in controller.client().allowed_models() {
                let marker = if model == session.settings.model() { "*" } else { " " };
                writeln!(out, "{marker} {model}")?;
            }
        }
        ReplCommand::Temperature(value) => {
            let parsed = value
                .parse::<f64>()
                .map_err(|_| ChatError::Config(format!("temperature is not a number: {value}")))
                .and_then(|t| session.settings.set_temperature(t));
            match parsed {
                Ok(()) => render::print_status(out, session)?,
                Err(err) => render::print_error(out, &err)?,
            }
        }
        ReplCommand::Id => writeln!(out, "conversation_id: {}", session.conversation_id())?,
        ReplCommand::History => render::print_transcript(out, session.history.turns())?,
        ReplCommand::Help => writeln!(out, "{HELP}")?,
        ReplCommand::Unknown(name) => writeln!(
            out,
            "Unknown command /{name}. Type /help, or start with // to send it as a message."
        )?,
    }
    Ok(true)
}
