//! Interactive chat loop and transcript rendering

use anyhow::Result;
use console::{style, Color};
use cothink_agent::{ChatController, SendOutcome};
use cothink_core::persona::PersonaRegistry;
use cothink_core::session::{Message, Role};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /persona <id>       switch persona
  /concise on|off     toggle 2-3 sentence replies
  /edit <id> <text>   rewrite a message and regenerate the reply
  /history            show the conversation
  /personas           list personas
  /clear              start over
  /quit               exit";

enum Flow {
    Continue,
    Quit,
}

pub async fn run_repl(controller: &ChatController) -> Result<()> {
    for message in controller.snapshot() {
        print_message(controller.personas(), &message);
    }
    println!("{}", style("Type /help for commands.").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(controller)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match handle_command(controller, command).await? {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        let outcome = controller.send(line).await;
        print_outcome(controller, &outcome);
    }

    Ok(())
}

fn print_prompt(controller: &ChatController) -> Result<()> {
    let persona = controller.selected_persona();
    let marker = if controller.concise() { " (concise)" } else { "" };
    print!("{} ", style(format!("{}{}>", persona, marker)).cyan().bold());
    std::io::stdout().flush()?;
    Ok(())
}

async fn handle_command(controller: &ChatController, command: &str) -> Result<Flow> {
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));

    match name {
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => println!("{}", HELP),
        "persona" => match controller.select_persona(rest) {
            Ok(()) => println!("Now talking to {}", persona_label(controller.personas(), rest)),
            Err(e) => println!("{} {}", style("Error:").red(), e),
        },
        "concise" => match rest {
            "on" => controller.set_concise(true),
            "off" => controller.set_concise(false),
            _ => println!("Usage: /concise on|off"),
        },
        "edit" => match parse_edit_args(rest) {
            Err(problem) => println!("{} Usage: /edit <id> <text>", problem),
            Ok((id, text)) => {
                let outcome = controller.edit_and_regenerate(id, text).await;
                if outcome == SendOutcome::Ignored {
                    println!("No user message with id {}", id);
                } else {
                    print_outcome(controller, &outcome);
                }
            }
        },
        "history" => {
            for message in controller.snapshot() {
                print_message(controller.personas(), &message);
            }
        }
        "personas" => print_personas(controller.personas(), &controller.selected_persona()),
        "clear" => {
            controller.reset();
            for message in controller.snapshot() {
                print_message(controller.personas(), &message);
            }
            print_unsaved_warning(controller);
        }
        other => println!("Unknown command /{}. Type /help for commands.", other),
    }

    Ok(Flow::Continue)
}

/// Split `/edit` arguments into a message id and non-blank replacement text
fn parse_edit_args(args: &str) -> std::result::Result<(u64, &str), String> {
    let (id, text) = args.trim().split_once(char::is_whitespace).unwrap_or((args.trim(), ""));
    if id.is_empty() {
        return Err("Missing message id.".to_string());
    }
    let id = id
        .parse::<u64>()
        .map_err(|_| format!("'{}' is not a message id.", id))?;
    let text = text.trim();
    if text.is_empty() {
        return Err("Replacement text is empty.".to_string());
    }
    Ok((id, text))
}

pub fn print_outcome(controller: &ChatController, outcome: &SendOutcome) {
    let personas = controller.personas();
    match outcome {
        SendOutcome::Replied(message) => print_message(personas, message),
        SendOutcome::Failed(message) => {
            print_message(personas, message);
            println!("{}", style("The relay could not be reached, see the log.").red().dim());
        }
        SendOutcome::Stale => {
            println!("{}", style("Conversation was cleared, reply dropped.").dim())
        }
        SendOutcome::Busy => println!("{}", style("Still waiting for the last reply.").yellow()),
        SendOutcome::Ignored => {}
    }
    print_unsaved_warning(controller);
}

fn print_unsaved_warning(controller: &ChatController) {
    if !controller.is_saved() {
        println!(
            "{}",
            style("Conversation could not be saved, see the log.").yellow()
        );
    }
}

pub fn print_message(personas: &PersonaRegistry, message: &Message) {
    let id = style(format!("[{}]", message.id)).dim();
    match message.role {
        Role::User => println!("{} {}: {}", id, style("You").bold(), message.text),
        Role::Assistant => println!(
            "{} {}: {}",
            id,
            persona_label(personas, &message.model_tag),
            message.text
        ),
    }
}

pub fn print_personas(personas: &PersonaRegistry, selected: &str) {
    println!("{}", style("Personas:").bold());
    for persona in personas.all() {
        let marker = if persona.id == selected { "*" } else { " " };
        println!(
            "{} {:<8} {} ({})",
            marker,
            persona.id,
            persona_label(personas, &persona.id),
            style(&persona.model).dim()
        );
    }
}

fn persona_label(personas: &PersonaRegistry, id: &str) -> String {
    match personas.get(id) {
        Some(persona) => format!(
            "{} {}",
            persona.icon,
            style(&persona.name).fg(color(&persona.color)).bold()
        ),
        None => style(id).bold().to_string(),
    }
}

fn color(name: &str) -> Color {
    match name {
        "purple" => Color::Magenta,
        "green" => Color::Green,
        "blue" => Color::Blue,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "cyan" => Color::Cyan,
        _ => Color::White,
    }
}
