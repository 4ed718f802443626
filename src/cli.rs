//! Command line parsing

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::api::{NewPersona, PromptChange, RemoteCommand};
use crate::data::{Field, LoopName};

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Help,
    /// Run a session and log state changes
    Watch,
    /// Execute one command and exit
    Send(RemoteCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub mode: Mode,
}

/// Parse arguments, excluding the program name
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut rest = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Ok(Invocation {
                    config_path,
                    mode: Mode::Help,
                })
            }
            "-c" | "--config" => {
                let path = iter.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(path));
            }
            _ => rest.push(arg.clone()),
        }
    }

    let mode = match rest.split_first() {
        None => Mode::Watch,
        Some((first, [])) if first == "watch" => Mode::Watch,
        Some((first, args)) if first == "send" => Mode::Send(parse_command(args)?),
        Some((first, _)) => bail!("Unknown subcommand '{}'", first),
    };

    Ok(Invocation { config_path, mode })
}

/// Parse `send` arguments into a command
pub fn parse_command(args: &[String]) -> Result<RemoteCommand> {
    let Some((name, args)) = args.split_first() else {
        bail!("send requires a command; see --help");
    };

    let command = match name.as_str() {
        "loops" => {
            let mut awareness = None;
            let mut sensors = None;
            let mut iter = args.iter();
            while let Some(arg) = iter.next() {
                let loop_name: LoopName = arg
                    .trim_start_matches("--")
                    .parse()
                    .with_context(|| format!("Unexpected argument '{}'", arg))?;
                let value = iter
                    .next()
                    .with_context(|| format!("{} requires on or off", arg))?;
                let enabled = parse_switch(value)?;
                match loop_name {
                    LoopName::Awareness => awareness = Some(enabled),
                    LoopName::Sensors => sensors = Some(enabled),
                }
            }
            if awareness.is_none() && sensors.is_none() {
                bail!("loops requires --awareness and/or --sensors");
            }
            RemoteCommand::SetLoops { awareness, sensors }
        }
        "action" => RemoteCommand::TriggerAction {
            name: single(name, args)?,
        },
        "persona" => RemoteCommand::SwitchPersona {
            name: single(name, args)?,
        },
        "create-persona" => {
            let (positional, options) = split_options(args)?;
            let [persona] = positional.as_slice() else {
                bail!("create-persona requires exactly one name");
            };
            let mut new_persona = NewPersona {
                name: persona.clone(),
                ..Default::default()
            };
            for (key, value) in options {
                let slot = match key.as_str() {
                    "voice" => &mut new_persona.voice,
                    "description" => &mut new_persona.description,
                    "prompt" => &mut new_persona.prompt,
                    "motivation" => &mut new_persona.default_motivation,
                    "image-prompt" => &mut new_persona.image_prompt,
                    other => bail!("Unknown option --{}", other),
                };
                *slot = Some(value);
            }
            RemoteCommand::CreatePersona(new_persona)
        }
        "prompt" => {
            let (positional, options) = split_options(args)?;
            if positional.is_empty() {
                bail!("prompt requires the prompt text");
            }
            let mut change = PromptChange {
                prompt: positional.join(" "),
                ..Default::default()
            };
            for (key, value) in options {
                // An empty value clears the field
                let field = if value.is_empty() {
                    Field::Null
                } else {
                    Field::Value(value)
                };
                match key.as_str() {
                    "voice" => change.voice = field,
                    "motivation" => change.default_motivation = field,
                    "image-prompt" => change.image_prompt = field,
                    other => bail!("Unknown option --{}", other),
                }
            }
            RemoteCommand::UpdatePrompt(change)
        }
        "goal" => RemoteCommand::SetGoal {
            goal: text(name, args)?,
        },
        "instruct" => RemoteCommand::Instruct {
            instructions: text(name, args)?,
        },
        "awareness" => RemoteCommand::CustomAwareness {
            message: text(name, args)?,
        },
        "camera" => {
            let (positional, options) = split_options(args)?;
            let [state] = positional.as_slice() else {
                bail!("camera requires on or off");
            };
            let mut frame_rate = None;
            for (key, value) in options {
                match key.as_str() {
                    "fps" => {
                        let fps: u32 = value
                            .parse()
                            .with_context(|| format!("Invalid frame rate '{}'", value))?;
                        frame_rate = Some(fps);
                    }
                    other => bail!("Unknown option --{}", other),
                }
            }
            RemoteCommand::UpdateCamera {
                enabled: parse_switch(state)?,
                frame_rate,
            }
        }
        "shutdown" => {
            if !args.is_empty() {
                bail!("shutdown takes no arguments");
            }
            RemoteCommand::Shutdown
        }
        other => bail!("Unknown command '{}'", other),
    };

    Ok(command)
}

fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("Expected on or off, got '{}'", other),
    }
}

fn single(command: &str, args: &[String]) -> Result<String> {
    match args {
        [value] if !value.trim().is_empty() => Ok(value.clone()),
        _ => bail!("{} requires exactly one argument", command),
    }
}

fn text(command: &str, args: &[String]) -> Result<String> {
    if args.is_empty() {
        bail!("{} requires text", command);
    }
    Ok(args.join(" "))
}

/// Separate positional arguments from `--key value` pairs
fn split_options(args: &[String]) -> Result<(Vec<String>, Vec<(String, String)>)> {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(key) => {
                let value = iter
                    .next()
                    .with_context(|| format!("--{} requires a value", key))?;
                options.push((key.to_string(), value.clone()));
            }
            None => positional.push(arg.clone()),
        }
    }
    Ok((positional, options))
}
