use crate::app::commands::{MigrateRequest, PlanRequest, Selection};
use crate::domain::model::{OfferingId, PeriodId, ProfessorId};
use clap::{Args, Parser, Subcommand};
use std::str::FromStr;

#[derive(Debug, Clone, Parser)]
#[command(name = "roster-migrate")]
#[command(about = "Migrate class enrollments from one school period to the next")]
pub struct CliConfig {
    /// Path to TOML configuration file; falls back to SUPABASE_* environment variables
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the periods of the school
    Periods,
    /// Show the signed-in user and role
    Whoami,
    /// Load both rosters and show the default pairing
    Preview(PlanArgs),
    /// Copy enrollments of the selected classes into their paired classes
    Migrate(MigrateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Source (previous) period id
    #[arg(long)]
    pub from: i64,

    /// Target (new) period id
    #[arg(long)]
    pub to: i64,

    /// Replace the default target of a class: SOURCE=TARGET
    #[arg(long = "pair", value_name = "SOURCE=TARGET")]
    pub pairs: Vec<Assignment>,

    /// Reassign the professor of a pairing: SOURCE=PROFESSOR
    #[arg(long = "professor", value_name = "SOURCE=PROFESSOR")]
    pub professors: Vec<Assignment>,

    /// Remove the pairing of a source class
    #[arg(long = "unpair", value_delimiter = ',')]
    pub unpair: Vec<i64>,

    /// Write the preview to a .csv or .json file
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Source class ids to migrate
    #[arg(long, value_delimiter = ',', conflicts_with = "all")]
    pub select: Vec<i64>,

    /// Migrate every source class
    #[arg(long)]
    pub all: bool,

    /// Stage the enrollments without writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// `LEFT=RIGHT` pair of numeric ids given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub source: i64,
    pub value: i64,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = s
            .split_once('=')
            .ok_or_else(|| format!("expected SOURCE=ID, got '{}'", s))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not a numeric id", part.trim()))
        };
        Ok(Self {
            source: parse(left)?,
            value: parse(right)?,
        })
    }
}

impl Assignment {
    pub fn as_pair(&self) -> (OfferingId, OfferingId) {
        (OfferingId(self.source), OfferingId(self.value))
    }

    pub fn as_professor(&self) -> (OfferingId, ProfessorId) {
        (OfferingId(self.source), ProfessorId(self.value))
    }
}

impl PlanArgs {
    pub fn periods(&self) -> (PeriodId, PeriodId) {
        (PeriodId(self.from), PeriodId(self.to))
    }
}

impl From<&PlanArgs> for PlanRequest {
    fn from(args: &PlanArgs) -> Self {
        let (source, target) = args.periods();
        Self {
            source,
            target,
            unpair: args.unpair.iter().copied().map(OfferingId).collect(),
            pairs: args.pairs.iter().map(Assignment::as_pair).collect(),
            professors: args.professors.iter().map(Assignment::as_professor).collect(),
        }
    }
}

impl From<&MigrateArgs> for MigrateRequest {
    fn from(args: &MigrateArgs) -> Self {
        let selection = if args.all {
            Selection::All
        } else {
            Selection::Only(args.select.iter().copied().map(OfferingId).collect())
        };
        Self {
            plan: PlanRequest::from(&args.plan),
            selection,
            dry_run: args.dry_run,
        }
    }
}
