//! Command-line arguments.
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Enrollment lifecycle client.
#[derive(Parser, Debug)]
#[command(
    name = "enroll",
    version,
    about = "Advise, bill and register students against the enrollment API",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file (defaults to $ENROLL_CONFIG, then enrollment.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write Prometheus metrics to this file when the command finishes
    #[arg(long, global = true, value_name = "FILE")]
    pub metrics_out: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask for enrollment (NOT_ENROLLED -> PENDING_REQUEST)
    Request(StudentArgs),
    /// Show prior enrollments and grades for the school year
    Evaluate(StudentArgs),
    /// Edit and submit the advised course set (-> WAITLISTED)
    Advise(AdviseArgs),
    /// Price the advised courses, optionally confirming (-> ENROLLED)
    Bill(BillArgs),
    /// Render the certificate of registration
    Cor(CorArgs),
}

#[derive(Args, Debug)]
pub struct StudentArgs {
    /// Student id
    pub student: String,
}

#[derive(Args, Debug)]
pub struct AdviseArgs {
    /// Student id
    pub student: String,

    /// Place a course from the eligible pool (repeatable)
    #[arg(long, value_name = "CODE")]
    pub add: Vec<String>,

    /// Return a placed course to the pool (repeatable)
    #[arg(long, value_name = "CODE")]
    pub remove: Vec<String>,

    /// Swap the course in a row (1-based) for a pool course (repeatable)
    #[arg(long, value_name = "ROW=CODE", value_parser = parse_replacement)]
    pub replace: Vec<(usize, String)>,

    /// Place the first eligible course
    #[arg(long)]
    pub add_first: bool,

    /// Show the edited selection without submitting it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct BillArgs {
    /// Student id
    pub student: String,

    /// Amount received from the student
    #[arg(long, value_name = "AMOUNT", default_value_t = Decimal::ZERO)]
    pub received: Decimal,

    /// Free-tuition voucher
    #[arg(long)]
    pub voucher: bool,

    /// Confirm the invoice and enroll the student
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Args, Debug)]
pub struct CorArgs {
    /// Student id
    pub student: String,

    /// Paginate instead of fitting onto one page
    #[arg(long)]
    pub slice: bool,

    /// Write the document to the configured output directory
    #[arg(long)]
    pub save: bool,

    /// Send the document to the print spooler
    #[arg(long)]
    pub print: bool,

    /// Spooler program used with --print
    #[arg(long, value_name = "PROGRAM", default_value = "lp")]
    pub printer: String,
}

/// Parse `ROW=CODE` with a 1-based row into a 0-based index.
fn parse_replacement(value: &str) -> Result<(usize, String), String> {
    let (row, code) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=CODE, got '{}'", value))?;
    let row: usize = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row '{}'", row))?;
    if row == 0 {
        return Err("rows start at 1".to_string());
    }
    let code = code.trim();
    if code.is_empty() {
        return Err("course code cannot be blank".to_string());
    }
    Ok((row - 1, code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_advise_edits() {
        let cli = Cli::try_parse_from([
            "enroll", "advise", "2021-0001", "--add", "CS102", "--add", "PE1", "--remove",
            "MATH101", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Advise(args) => {
                assert_eq!(args.student, "2021-0001");
                assert_eq!(args.add, vec!["CS102", "PE1"]);
                assert_eq!(args.remove, vec!["MATH101"]);
                assert!(args.dry_run);
                assert!(!args.add_first);
            }
            other => panic!("expected advise, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bill_with_global_flags() {
        let cli = Cli::try_parse_from([
            "enroll", "bill", "7", "--received", "4000", "--confirm", "--json", "--config",
            "custom.toml",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Bill(args) => {
                assert_eq!(args.received, Decimal::from(4000));
                assert!(args.confirm);
                assert!(!args.voucher);
            }
            other => panic!("expected bill, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_replacement() {
        assert_eq!(parse_replacement("2=CS102"), Ok((1, "CS102".to_string())));
        assert!(parse_replacement("0=CS102").is_err());
        assert!(parse_replacement("CS102").is_err());
        assert!(parse_replacement("1= ").is_err());
    }
}
