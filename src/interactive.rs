//! Single-card mode: prompt for one contact on the terminal and render it

use anyhow::{Context, Result};
use console::style;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use crate::card::{CardEngine, CardOutcome, CardResult};
use crate::cli::Args;
use crate::contacts::ContactRecord;
use crate::json_output::JsonMessage;
use crate::utils::is_valid_hex_color;

pub const DEFAULT_OUTPUT_FILE: &str = "contact_card.png";

/// Everything collected from the prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answers {
    pub record: ContactRecord,
    pub text_color: String,
    pub logo: String,
    pub output_file: String,
}

/// Line-based prompts with optional bracketed defaults
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask once; an empty answer yields the default (or an empty string)
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) => write!(self.output, "{} [{}]: ", label, default)?,
            None => write!(self.output, "{}: ", label)?,
        }
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read from standard input")?;
        let answer = line.trim();

        if answer.is_empty() {
            if read == 0 && default.is_none() {
                return Err(anyhow::anyhow!("Input closed while asking for {}", label));
            }
            return Ok(default.unwrap_or_default().to_string());
        }

        Ok(answer.to_string())
    }

    /// Ask until a non-empty answer is given
    pub fn ask_required(&mut self, label: &str) -> Result<String> {
        loop {
            let answer = self.ask(label, None)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "{} is required.", label)?;
        }
    }

    /// Ask until the answer is a hex colour
    pub fn ask_color(&mut self, label: &str, default: &str) -> Result<String> {
        loop {
            let answer = self.ask(label, Some(default))?;
            if is_valid_hex_color(&answer) {
                return Ok(answer);
            }
            writeln!(self.output, "'{}' is not a hex colour like #5046e3.", answer)?;
        }
    }

    /// Run the prompts in card order
    pub fn collect(&mut self, args: &Args) -> Result<Answers> {
        let name = self.ask_required("Name")?;
        let title = self.ask("Job title", None)?;
        let email = self.ask("Email", None)?;
        let phone = self.ask("Phone", None)?;
        let company = self.ask("Company", None)?;
        let bg_color = self.ask_color("Background color", args.default_background())?;
        let text_color = self.ask_color("Text color", args.text_color())?;
        let logo = self.ask("Logo path or URL", Some(args.logo()))?;
        let profile_image = self.ask("Profile image path or URL (optional)", None)?;
        let linkedin_url = self.ask("LinkedIn URL (optional)", None)?;
        let output_file = self.ask("Output filename", Some(DEFAULT_OUTPUT_FILE))?;

        Ok(Answers {
            record: ContactRecord {
                name,
                title,
                email,
                phone,
                company,
                bg_color,
                profile_image,
                linkedin_url,
            },
            text_color,
            logo,
            output_file,
        })
    }
}

/// Prompt on the terminal and write one card
///
/// Prompts go to stderr in JSON mode so stdout carries only JSON lines.
pub fn run(args: &Args) -> Result<CardResult> {
    let stdin = std::io::stdin();
    let answers = if args.json_progress {
        Prompter::new(stdin.lock(), std::io::stderr().lock()).collect(args)?
    } else {
        Prompter::new(stdin.lock(), std::io::stdout().lock()).collect(args)?
    };

    let mut config = args.render_config();
    config.logo = answers.logo.clone();
    config.text_color = answers.text_color.clone();
    config.require_logo = false;

    let engine = CardEngine::new(config)?;
    let output_path = output_path(args, &answers.output_file);

    if !engine.config().dry_run {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }

    let start = Instant::now();
    let outcome = engine.render_to_file(&answers.record, &output_path)?;

    Ok(CardResult {
        row: 1,
        name: answers.record.name,
        output_path,
        duration: start.elapsed(),
        outcome: Ok(outcome),
    })
}

/// Report the single card: one JSON line in JSON mode, a styled line otherwise
pub fn announce<W: Write>(result: &CardResult, json_mode: bool, out: &mut W) -> Result<()> {
    if json_mode {
        if let Some(json) = JsonMessage::from_result(result).to_json() {
            writeln!(out, "{}", json)?;
        }
        return Ok(());
    }

    let path = result.output_path.display();
    writeln!(out)?;
    match &result.outcome {
        Ok(CardOutcome::Rendered { saved: true, .. }) => {
            writeln!(out, "{} {}", style("✓ Card written to").green(), style(path).bold())?
        }
        Ok(CardOutcome::Rendered { .. }) => {
            writeln!(out, "{} {}", style("✓ Dry run: card rendered for").green(), style(path).bold())?
        }
        Ok(CardOutcome::Skipped(_)) => writeln!(
            out,
            "{} {} already exists and --skip-existing is set",
            style("⊘ Skipped:").yellow(),
            path
        )?,
        Err(e) => writeln!(out, "{} {:#}", style("✗ Card failed:").red(), e)?,
    }
    Ok(())
}

/// Relative filenames land in the output directory
pub fn output_path(args: &Args, output_file: &str) -> PathBuf {
    let file = PathBuf::from(output_file);
    if file.is_absolute() {
        file
    } else {
        args.output_dir().join(file)
    }
}
