//! Line-oriented command scripts.
//!
//! Each line drives one dispatcher operation. Subscriptions created by a script
//! report every delivery they receive as an output line.

use anyhow::{anyhow, bail, Context, Result};
use herald_core::{Callback, Dispatcher, Propagation, PublishMode, Selector, SubscribeOptions};
use parking_lot::Mutex;
use serde_json::Value;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// A parsed script command.
#[derive(Debug, Clone)]
pub enum Command {
    /// Add a reporting subscriber.
    Subscribe {
        channel: String,
        priority: Option<i64>,
        context: Option<String>,
        stop: bool,
    },
    /// Publish a JSON payload.
    Publish {
        channel: String,
        data: Value,
        mode: PublishMode,
    },
    /// Remove subscriptions.
    Unsubscribe(Selector),
    /// List channels with subscribers.
    Channels,
    /// Change the hierarchy separator.
    Separator(String),
    /// Toggle dispatcher diagnostics.
    Log(bool),
    /// Print dispatcher statistics.
    Stats,
}

/// Parse one script line.
///
/// Returns `Ok(None)` for blank lines and `#` comments.
///
/// # Errors
///
/// Returns an error if the line is not a valid command.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "subscribe" => parse_subscribe(rest)?,
        "publish" => parse_publish(rest)?,
        "unsubscribe" => Command::Unsubscribe(parse_selector(rest)?),
        "channels" => Command::Channels,
        "stats" => Command::Stats,
        "separator" => {
            if rest.is_empty() {
                bail!("separator needs a value");
            }
            Command::Separator(rest.to_string())
        }
        "log" => match rest {
            "on" => Command::Log(true),
            "off" => Command::Log(false),
            other => bail!("expected `on` or `off`, got `{}`", other),
        },
        other => bail!("unknown command `{}`", other),
    };
    Ok(Some(command))
}

fn parse_subscribe(rest: &str) -> Result<Command> {
    let mut words = rest.split_whitespace();
    let channel = words
        .next()
        .ok_or_else(|| anyhow!("subscribe needs a channel"))?
        .to_string();

    let mut priority = None;
    let mut context = None;
    let mut stop = false;
    for word in words {
        if let Some(value) = word.strip_prefix("priority=") {
            priority = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid priority `{}`", value))?,
            );
        } else if let Some(value) = word.strip_prefix("context=") {
            context = Some(value.to_string());
        } else if word == "stop" {
            stop = true;
        } else {
            bail!("unknown subscribe option `{}`", word);
        }
    }

    Ok(Command::Subscribe {
        channel,
        priority,
        context,
        stop,
    })
}

fn parse_publish(rest: &str) -> Result<Command> {
    let (channel, mut payload) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if channel.is_empty() {
        bail!("publish needs a channel");
    }

    let mut mode = PublishMode::Broadcast;
    if let Some((head, last)) = payload.trim_end().rsplit_once(char::is_whitespace) {
        if is_mode_name(last) {
            mode = last.parse().unwrap_or_default();
            payload = head;
        }
    } else if is_mode_name(payload.trim()) {
        mode = payload.trim().parse().unwrap_or_default();
        payload = "";
    }

    let payload = payload.trim();
    let data = if payload.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(payload).with_context(|| format!("invalid JSON payload `{}`", payload))?
    };

    Ok(Command::Publish {
        channel: channel.to_string(),
        data,
        mode,
    })
}

fn is_mode_name(word: &str) -> bool {
    matches!(word, "sticky" | "rootless" | "ordered" | "broadcast")
}

fn parse_selector(rest: &str) -> Result<Selector> {
    let words: Vec<_> = rest.split_whitespace().collect();
    match words.as_slice() {
        ["token", token] => Ok(Selector::token(*token)),
        ["channel", channel] => Ok(Selector::channel(*channel)),
        ["channel", channel, option] => {
            let context = option
                .strip_prefix("context=")
                .ok_or_else(|| anyhow!("unknown unsubscribe option `{}`", option))?;
            Ok(Selector::channel_context(*channel, context))
        }
        ["context", context] => Ok(Selector::context(*context)),
        _ => bail!("expected `token <t>`, `channel <c> [context=<id>]` or `context <id>`"),
    }
}

/// Executes commands against a dispatcher and collects their output.
pub struct Runner {
    dispatcher: Dispatcher,
    /// Lines written by delivering callbacks.
    deliveries: Arc<Mutex<Vec<String>>>,
    next_label: usize,
}

impl Runner {
    /// Create a runner around a dispatcher.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            deliveries: Arc::new(Mutex::new(Vec::new())),
            next_label: 1,
        }
    }

    /// Get the underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Parse and run one line, returning its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be parsed or the dispatcher rejects it.
    pub fn execute_line(&mut self, line: &str) -> Result<Vec<String>> {
        match parse_line(line)? {
            Some(command) => self.execute(command),
            None => Ok(Vec::new()),
        }
    }

    /// Run one command, returning its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatcher rejects the command.
    pub fn execute(&mut self, command: Command) -> Result<Vec<String>> {
        debug!(?command, "Executing");
        let mut lines = Vec::new();

        match command {
            Command::Subscribe {
                channel,
                priority,
                context,
                stop,
            } => {
                let label = format!("#{}", self.next_label);
                self.next_label += 1;

                let mut options = SubscribeOptions::new();
                if let Some(priority) = priority {
                    options = options.with_priority(priority);
                }
                if let Some(context) = context {
                    options = options.with_context(context);
                }

                let token = self.dispatcher.subscribe(
                    &channel,
                    self.reporter(label.clone(), stop),
                    options,
                )?;
                lines.push(format!("{} subscribed to {} (token {})", label, channel, token));
            }
            Command::Publish {
                channel,
                data,
                mode,
            } => {
                let delivered = self.dispatcher.publish_counted(&channel, data, mode);
                lines.extend(self.drain_deliveries());
                lines.push(format!(
                    "published {} ({}) to {} subscribers",
                    channel, mode, delivered
                ));
            }
            Command::Unsubscribe(selector) => {
                let removed = self.dispatcher.unsubscribe(selector);
                lines.push(format!("removed {}", removed));
            }
            Command::Channels => {
                lines.push(format!("channels: {}", self.dispatcher.channels().join(", ")));
            }
            Command::Separator(separator) => {
                self.dispatcher.set_separator(&separator)?;
                lines.push(format!("separator set to {}", separator));
            }
            Command::Log(enabled) => {
                self.dispatcher.print_log(enabled);
                lines.push(format!("log {}", if enabled { "on" } else { "off" }));
            }
            Command::Stats => {
                let stats = self.dispatcher.stats();
                lines.push(format!(
                    "channels={} subscriptions={} sticky={}",
                    stats.channel_count, stats.subscription_count, stats.sticky_count
                ));
            }
        }

        // Sticky replays happen during subscribe; report them after its line.
        lines.extend(self.drain_deliveries());
        Ok(lines)
    }

    /// Run every line of `input`, writing output to `out`.
    ///
    /// Bad lines are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        for (number, line) in input.lines().enumerate() {
            let line = line.context("Failed to read script line")?;
            match self.execute_line(&line) {
                Ok(lines) => {
                    for text in lines {
                        writeln!(out, "{}", text)?;
                    }
                }
                Err(e) => {
                    warn!(line = number + 1, error = %e, "Skipping script line");
                    writeln!(out, "error on line {}: {:#}", number + 1, e)?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Build a callback that records `<label> <- <channel> <data>` per delivery.
    fn reporter(&self, label: String, stop: bool) -> Callback<Value> {
        let deliveries = Arc::clone(&self.deliveries);
        Callback::new(move |message, _| {
            deliveries
                .lock()
                .push(format!("{} <- {} {}", label, message.channel, message.data));
            if stop {
                Propagation::Stop
            } else {
                Propagation::Continue
            }
        })
    }

    fn drain_deliveries(&self) -> Vec<String> {
        std::mem::take(&mut *self.deliveries.lock())
    }
}
