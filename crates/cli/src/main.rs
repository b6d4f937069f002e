mod cli;
mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enrollment_core::billing::FeeCategory;
use enrollment_core::render::{PrintSpooler, RenderOptions};
use enrollment_core::workflow::{LoadState, Notice, StepOutcome};
use enrollment_core::{
    load_config, validate_config, CommandSpooler, EnrollmentBackend, FsDocumentSink, HttpBackend,
    Orchestrator, PaymentTerms, Peso, StudentId,
};

use cli::{AdviseArgs, BillArgs, Cli, Command, CorArgs, StudentArgs};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine config path
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("ENROLL_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("enrollment.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let backend: Arc<dyn EnrollmentBackend> = Arc::new(
        HttpBackend::new(&config.backend).context("Failed to create backend client")?,
    );
    info!("Using {} backend at {}", backend.name(), config.backend.url);

    let spooler: Arc<dyn PrintSpooler> = match &cli.command {
        Command::Cor(args) if args.printer != "lp" => {
            Arc::new(CommandSpooler::new(args.printer.clone(), Vec::new()))
        }
        _ => Arc::new(CommandSpooler::default()),
    };
    let sink = Arc::new(FsDocumentSink::new(config.render.output_dir.clone()));
    let orchestrator = Orchestrator::new(&config, backend, sink, spooler);

    let result = match cli.command {
        Command::Request(args) => request(&orchestrator, args, cli.json).await,
        Command::Evaluate(args) => evaluate(&orchestrator, args, cli.json).await,
        Command::Advise(args) => advise(&orchestrator, args, cli.json).await,
        Command::Bill(args) => bill(&orchestrator, args, cli.json).await,
        Command::Cor(args) => cor(&orchestrator, args, cli.json).await,
    };

    if let Some(path) = &cli.metrics_out {
        match metrics::encode_metrics() {
            Ok(text) => std::fs::write(path, text)
                .with_context(|| format!("Failed to write metrics to {:?}", path))?,
            Err(e) => warn!("Failed to encode metrics: {}", e),
        }
    }

    result
}

async fn request(orchestrator: &Orchestrator, args: StudentArgs, json: bool) -> Result<()> {
    let id = StudentId::new(args.student);
    let student = settle(orchestrator.request_enrollment(&id).await, json)?;
    if json {
        print_json(&student)
    } else {
        println!(
            "{} ({}) is now {}",
            student.full_name(),
            student.id,
            student.enrollment_status
        );
        Ok(())
    }
}

async fn evaluate(orchestrator: &Orchestrator, args: StudentArgs, json: bool) -> Result<()> {
    let id = StudentId::new(args.student);
    let evaluation = settle(orchestrator.evaluation(&id).await, json)?;

    if json {
        let courses: Vec<_> = evaluation
            .courses
            .iter()
            .map(|c| {
                json!({
                    "code": c.row.course.code,
                    "title": c.row.course.title,
                    "grades": c.grades.value(),
                    "passed": c.is_passed(),
                })
            })
            .collect();
        return print_json(&json!({
            "student_id": evaluation.student.id,
            "school_year": evaluation.school_year,
            "courses": courses,
        }));
    }

    println!(
        "{} ({}), school year {}",
        evaluation.student.full_name(),
        evaluation.student.id,
        evaluation.school_year
    );
    if evaluation.courses.is_empty() {
        println!("  No enrollments found.");
    }
    for course in &evaluation.courses {
        let grade = match &course.grades {
            LoadState::Ready(grades) => grades
                .iter()
                .map(|g| {
                    format!(
                        "{} {}",
                        g.grade.as_deref().unwrap_or("-"),
                        g.remarks.as_deref().unwrap_or("")
                    )
                    .trim()
                    .to_string()
                })
                .collect::<Vec<_>>()
                .join(", "),
            LoadState::Failed(notice) => format!("unavailable: {}", notice.message),
            LoadState::Idle | LoadState::Loading => "-".to_string(),
        };
        println!(
            "  {:<10} {:<40} {}",
            course.row.course.code, course.row.course.title, grade
        );
    }
    Ok(())
}

async fn advise(orchestrator: &Orchestrator, args: AdviseArgs, json: bool) -> Result<()> {
    let id = StudentId::new(args.student);
    let mut view = settle(orchestrator.load_advising(&id).await, json)?;
    if view.mandatory {
        warn!("Student {} requires advising before billing", id);
    }

    let selection = &mut view.selection;
    for code in &args.remove {
        selection.remove_code(code)?;
    }
    for (index, code) in &args.replace {
        selection.replace(*index, code)?;
    }
    for code in &args.add {
        selection.add(code)?;
    }
    if args.add_first {
        selection.add_first()?;
    }

    let totals = selection.totals();
    if json && args.dry_run {
        return print_json(&json!({
            "student_id": id,
            "codes": selection.codes(),
            "pool": selection.pool().iter().map(|c| &c.code).collect::<Vec<_>>(),
            "totals": totals,
        }));
    }
    if !json {
        println!("Advised courses for {}:", view.student.full_name());
        for (row, course) in selection.placed().iter().enumerate() {
            println!(
                "  {:>2}. {:<10} {:<40} {} unit(s)",
                row + 1,
                course.code,
                course.title,
                course.total_units()
            );
        }
        println!(
            "  {} course(s), {} unit(s), {} hour(s)",
            totals.courses, totals.units, totals.hours
        );
        let pool: Vec<&str> = selection.pool().iter().map(|c| c.code.as_str()).collect();
        if !pool.is_empty() {
            println!("  Eligible: {}", pool.join(", "));
        }
    }
    if args.dry_run {
        return Ok(());
    }

    let advised = settle(orchestrator.submit_advising(&id, &view.selection).await, json)?;
    if json {
        print_json(&json!({
            "student": advised.student,
            "stamp": advised.stamp,
        }))
    } else {
        println!(
            "{} is now {} (advising revision {})",
            advised.student.id, advised.student.enrollment_status, advised.stamp.revision
        );
        Ok(())
    }
}

async fn bill(orchestrator: &Orchestrator, args: BillArgs, json: bool) -> Result<()> {
    let id = StudentId::new(args.student);
    let terms = if args.voucher {
        PaymentTerms::voucher()
    } else {
        PaymentTerms::cash(args.received)
    };
    let view = settle(orchestrator.billing(&id, terms).await, json)?;

    if !json {
        println!("Billing for {} ({})", view.student.full_name(), view.student.id);
        for course in &view.courses {
            println!("  {:<10} {}", course.code, course.title);
        }
        println!(
            "  {} course(s), {} unit(s), {} hour(s)",
            view.totals.courses, view.totals.units, view.totals.hours
        );
        for category in FeeCategory::ALL {
            println!("  {}", category.label());
            let lines: Vec<_> = view
                .lines
                .iter()
                .filter(|l| l.category() == category)
                .collect();
            if lines.is_empty() {
                println!("    No billings available.");
            }
            for line in lines {
                println!("    {:<30} {:>12}", line.billing.name, Peso(line.price).to_string());
            }
            println!(
                "    {:<30} {:>12}",
                "Total",
                Peso(view.invoice.total_for(category)).to_string()
            );
        }
        println!("  Grand total    {}", Peso(view.invoice.grand_total));
        println!("  Amount needed  {}", Peso(view.invoice.amount_needed));
        println!("  Change         {}", Peso(view.invoice.change));
        println!("  Balance        {}", Peso(view.invoice.balance));
    }

    if !args.confirm {
        return if json {
            print_json(&json!({
                "student_id": id,
                "totals": view.totals,
                "invoice": view.invoice,
            }))
        } else {
            Ok(())
        };
    }

    let student = settle(orchestrator.confirm_billing(&id, &view).await, json)?;
    if json {
        print_json(&json!({
            "student": student,
            "invoice": view.invoice,
        }))
    } else {
        println!("{} is now {}", student.id, student.enrollment_status);
        Ok(())
    }
}

async fn cor(orchestrator: &Orchestrator, args: CorArgs, json: bool) -> Result<()> {
    let id = StudentId::new(args.student);
    let options = RenderOptions {
        save: args.save,
        print: args.print,
        slice: args.slice,
    };
    let registration = settle(orchestrator.registration(&id, options).await, json)?;
    let output = &registration.output;

    if json {
        return print_json(&json!({
            "document": output.document,
            "manifest": output.saved.as_ref().map(|s| &s.manifest),
            "pages": output.saved.as_ref().map(|s| &s.pages),
            "printed": output.printed,
        }));
    }

    if output.document.image.media_type == "text/plain" {
        println!("{}", String::from_utf8_lossy(&output.document.image.data));
    }
    println!(
        "{} page(s), {} mode",
        output.document.page_count(),
        output.document.mode.as_str()
    );
    if let Some(saved) = &output.saved {
        for page in &saved.pages {
            println!("Saved {}", page.display());
        }
    }
    if output.printed {
        println!("Sent to printer");
    }
    Ok(())
}

/// Unwrap a step outcome, reporting its notice when the step did not complete.
fn settle<T>(outcome: StepOutcome<T>, json: bool) -> Result<T> {
    let (notice, redirect) = match outcome {
        StepOutcome::Ready(value) => return Ok(value),
        StepOutcome::Redirect { to, notice } => (notice, Some(to)),
        StepOutcome::Notice(notice) => (notice, None),
    };
    report(&notice, json)?;
    match redirect {
        Some(to) => bail!("{} (continue from the {:?} step)", notice.title, to),
        None => bail!("{}", notice.title),
    }
}

fn report(notice: &Notice, json: bool) -> Result<()> {
    if json {
        return print_json(notice);
    }
    eprintln!("{}: {}", notice.title, notice.message);
    if notice.is_retryable() {
        eprintln!("The request can be retried.");
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
