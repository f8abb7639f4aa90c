// SPDX-License-Identifier: MIT

//! Interactive session loop: read a prompt, route it, send the invocation
//! over the transport, render the answer, repeat. Routing misses and tool
//! failures print as one-line messages and never end the session.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;

use crate::market::{PriceRecord, PriceSource};
use crate::router::Router;
use crate::tools::stock::{Comparison, Relation, COMPARE_STOCKS, GET_STOCK_PRICE};
use crate::tools::ToolInvocation;
use crate::transport::Transport;

pub struct ChatSession {
    router: Router,
    transport: Box<dyn Transport>,
}

impl ChatSession {
    pub fn new(router: Router, transport: Box<dyn Transport>) -> Self {
        Self { router, transport }
    }

    /// Runs the interactive REPL until `exit`, `quit`, or EOF.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        self.print_welcome();

        loop {
            match rl.readline(">> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                        println!("Bye!");
                        break;
                    }
                    let _ = rl.add_history_entry(line);
                    self.process_prompt(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        self.transport.shutdown().await?;
        Ok(())
    }

    /// Routes and executes one prompt, then tears the transport down. Used
    /// by the one-shot `ask` subcommand.
    pub async fn ask(mut self, prompt: &str) -> anyhow::Result<()> {
        self.process_prompt(prompt).await;
        self.transport.shutdown().await?;
        Ok(())
    }

    /// One prompt, one printed line. Infallible on purpose: every failure
    /// renders as a message and the caller keeps looping.
    async fn process_prompt(&mut self, prompt: &str) {
        let decision = match self.router.route(prompt).await {
            Ok(decision) => decision,
            Err(err) => {
                println!("{} {}", "!".yellow().bold(), err);
                return;
            }
        };
        log::info!(
            "routed via {} to {}",
            decision.origin,
            decision.invocation.tool
        );

        match self.transport.send(&decision.invocation).await {
            Ok(result) => {
                println!("{}", render_result(&decision.invocation, &result).green());
            }
            Err(err) => {
                println!("{} {}", "!".yellow().bold(), err);
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "stockline - stock query assistant".cyan().bold());
        if self.router.ai_enabled() {
            println!(
                "{}",
                "Routing: Deepseek classifier with keyword fallback".dimmed()
            );
        } else {
            println!(
                "{}",
                "Routing: keyword heuristic (no Deepseek key configured)".dimmed()
            );
        }
        println!(
            "{}",
            "Ask about one price ('price of AAPL?') or compare two ('AAPL vs MSFT').".dimmed()
        );
        println!("{}", "Type 'exit' or 'quit' to leave.".dimmed());
        println!();
    }
}

/// Turns a tool result into the sentence shown to the user.
pub fn render_result(invocation: &ToolInvocation, result: &Value) -> String {
    match invocation.tool.as_str() {
        GET_STOCK_PRICE => match serde_json::from_value::<PriceRecord>(result.clone()) {
            Ok(record) => format!(
                "The current price of {} is ${:.2} ({}, as of {}).",
                record.symbol,
                record.price,
                source_label(record.source),
                record.as_of
            ),
            Err(_) => unexpected_payload(),
        },
        COMPARE_STOCKS => match serde_json::from_value::<Comparison>(result.clone()) {
            Ok(comparison) => render_comparison(&comparison),
            Err(_) => unexpected_payload(),
        },
        _ => unexpected_payload(),
    }
}

fn render_comparison(comparison: &Comparison) -> String {
    let one = &comparison.symbol_one;
    let two = &comparison.symbol_two;
    match comparison.relation {
        Relation::Higher => format!(
            "{} (${:.2}, {}) is trading higher than {} (${:.2}, {}).",
            one.symbol,
            one.price,
            source_label(one.source),
            two.symbol,
            two.price,
            source_label(two.source)
        ),
        Relation::Lower => format!(
            "{} (${:.2}, {}) is trading lower than {} (${:.2}, {}).",
            one.symbol,
            one.price,
            source_label(one.source),
            two.symbol,
            two.price,
            source_label(two.source)
        ),
        Relation::Equal => format!(
            "{} and {} are trading at the same price (${:.2}).",
            one.symbol, two.symbol, one.price
        ),
    }
}

fn source_label(source: PriceSource) -> &'static str {
    match source {
        PriceSource::Live => "live",
        PriceSource::Cache => "offline cache",
    }
}

fn unexpected_payload() -> String {
    "Received a tool response in an unexpected shape.".to_string()
}
