use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::ProgressBar;
use std::time::Instant;

use contact_card_generator::card::{CardEngine, CardResult, RenderConfig};
use contact_card_generator::cli::Args;
use contact_card_generator::contacts::read_contacts;
use contact_card_generator::interactive;
use contact_card_generator::json_output::JsonMessage;
use contact_card_generator::report::BatchReport;
use contact_card_generator::utils::{
    create_progress_bar, error_println, format_duration, validate_inputs, verbose_println,
};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let mut args = Args::parse();
    args.load_and_merge_config()?;

    let json_mode = args.json_progress;

    if !json_mode {
        // Print banner
        println!("{}", style("Contact Card Generator").bold().blue());
        println!("{}", style("vCard QR business cards from a contact list").dim());
        println!();
    }

    validate_inputs(&args)?;

    if args.interactive {
        let result = interactive::run(&args)?;
        interactive::announce(&result, json_mode, &mut std::io::stdout().lock())?;
        return Ok(());
    }

    let config = args.render_config();
    if config.verbose {
        print_configuration(&args, &config);
    }

    let output_dir = args.output_dir();

    // Create output directory (skip in dry-run mode)
    if !config.dry_run {
        std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;
    } else {
        verbose_println(config.verbose, "Dry run mode: Skipping output directory creation");
    }

    let input = args
        .input
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No contact file given"))?;
    let rows = read_contacts(input)?;

    if rows.is_empty() {
        if json_mode {
            JsonMessage::summary(0, 0, 0, 0, start_time.elapsed().as_secs_f64());
        } else {
            println!("{}", style("No contacts found in the input file").red());
        }
        return Ok(());
    }

    let dry_run_mode = config.dry_run;
    let engine = CardEngine::new(config)?;

    let total = rows.len();
    let progress = if json_mode {
        ProgressBar::hidden()
    } else {
        let pb = create_progress_bar(total as u64);
        pb.set_message("Rendering cards");
        pb
    };

    let results = engine.process_batch(&rows, &output_dir, |count, result| {
        if json_mode {
            JsonMessage::from_result(result).emit();
            JsonMessage::progress(count, total, format!("Row {}", result.row));
        } else {
            progress.inc(1);
            progress.set_message(result.name.clone());
        }
    });

    progress.finish_with_message("✓ Processing complete!");

    let rendered = results.iter().filter(|r| r.is_rendered()).count();
    let skipped = results.iter().filter(|r| r.is_skipped()).count();
    let failed = results.len() - rendered - skipped;
    let total_time = start_time.elapsed();

    if json_mode {
        JsonMessage::summary(results.len(), rendered, failed, skipped, total_time.as_secs_f64());
        return Ok(());
    }

    println!();
    print_summary(&results, dry_run_mode, engine.detector_name());

    if args.report {
        BatchReport::new(&results).print();
    }

    println!();
    println!(
        "{} {}",
        style("Total time:").bold(),
        style(format_duration(total_time)).cyan()
    );
    if rendered > 0 {
        println!(
            "{} {}",
            style("Average per card:").bold(),
            style(format_duration(total_time / rendered as u32)).dim()
        );
    }

    Ok(())
}

fn print_configuration(args: &Args, config: &RenderConfig) {
    println!("{}", style("Configuration:").bold());
    println!("  Input: {:?}", args.input);
    println!("  Output directory: {}", args.output_dir().display());
    println!("  Logo: {}", config.logo);
    println!("  Fonts: {} / {}", config.font_bold, config.font_regular);
    println!("  Text color: {}", config.text_color);
    println!("  Default background: {}", config.default_background);
    println!("  Created by: {}", config.created_by);
    println!(
        "  QR code: version {}, error correction {}",
        config.qr.version, config.qr.error_correction
    );
    println!("  Face model: {}", config.face_model.display());
    println!("  Parallel jobs: {}", config.parallel_jobs);
    if config.skip_existing {
        println!("  Existing cards: skipped");
    }
    if config.dry_run {
        println!("  Dry run mode: enabled (simulation only - no files will be created)");
    }
    println!();
}

fn print_summary(results: &[CardResult], dry_run_mode: bool, detector_name: &str) {
    let rendered = results.iter().filter(|r| r.is_rendered()).count();
    let skipped = results.iter().filter(|r| r.is_skipped()).count();
    let failed = results.len() - rendered - skipped;
    let faces = results.iter().filter(|r| r.face_found()).count();

    let header = if dry_run_mode {
        style("Dry Run Results Summary:").bold().cyan()
    } else {
        style("Results Summary:").bold().green()
    };
    println!("{}", header);

    let rendered_label = if dry_run_mode {
        "Would be written"
    } else {
        "Cards written"
    };
    println!("  {}: {}", rendered_label, style(rendered).bold().green());
    if failed > 0 {
        println!("  Failed: {}", style(failed).bold().red());
    }
    if skipped > 0 {
        println!("  Skipped (already exist): {}", style(skipped).bold().yellow());
    }
    println!(
        "  Faces detected ({}): {}",
        detector_name,
        style(faces).bold().cyan()
    );

    if failed > 0 {
        println!();
        println!("{}", style("Failures:").bold().red());
        for result in results.iter().filter(|r| r.outcome.is_err()) {
            if let Err(e) = &result.outcome {
                error_println(&format!("{:#}", e));
            }
        }
    }
}
