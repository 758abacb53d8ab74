use clap::{Args, Parser, Subcommand, ValueEnum};
use cadence_core::models::{EditScope, Pattern, RecurrenceUnit};

/// Cadence: recurring tasks that keep up with the calendar
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the SQLite database (overrides the configured path)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Skip the catch-up pass that runs before each command
    #[arg(long, global = true)]
    pub no_catch_up: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new occurrence, optionally starting a recurring series
    Add(AddCommand),
    /// List occurrences
    List(ListCommand),
    /// Mark an occurrence as completed
    Done(DoneCommand),
    /// Edit an occurrence or its series
    Edit(EditCommand),
    /// Delete an occurrence
    Delete(DeleteCommand),
    /// Bring overdue recurring series up to date
    CatchUp,
    /// Show the next due dates of a series
    Preview(PreviewCommand),
}

/// Built-in repetition patterns accepted by `--every`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternArg {
    Daily,
    /// Monday to Friday
    Weekdays,
    Weekly,
    /// Every other week
    Biweekly,
    Monthly,
    Yearly,
}

impl From<PatternArg> for Pattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Daily => Pattern::Daily,
            PatternArg::Weekdays => Pattern::Weekdays,
            PatternArg::Weekly => Pattern::Weekly,
            PatternArg::Biweekly => Pattern::Biweekly,
            PatternArg::Monthly => Pattern::Monthly,
            PatternArg::Yearly => Pattern::Yearly,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitArg {
    Day,
    Week,
    Month,
    Year,
}

impl From<UnitArg> for RecurrenceUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Day => RecurrenceUnit::Day,
            UnitArg::Week => RecurrenceUnit::Week,
            UnitArg::Month => RecurrenceUnit::Month,
            UnitArg::Year => RecurrenceUnit::Year,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    /// Only the selected occurrence
    Occurrence,
    /// The selected occurrence and its pending future occurrences
    Future,
}

impl From<ScopeArg> for EditScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Occurrence => EditScope::ThisOccurrence,
            ScopeArg::Future => EditScope::ThisAndFuture,
        }
    }
}

/// Repetition flags shared by `add` and `edit`
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Built-in repetition pattern
    #[arg(long, value_enum, conflicts_with = "interval")]
    pub every: Option<PatternArg>,

    /// Custom rule: repeat every N units
    #[arg(long, requires = "unit")]
    pub interval: Option<u32>,

    /// Custom rule unit
    #[arg(long, value_enum, requires = "interval")]
    pub unit: Option<UnitArg>,

    /// Custom rule weekdays (e.g. "mon,wed,fri")
    #[arg(long, requires = "interval", conflicts_with = "day_of_month")]
    pub on: Option<String>,

    /// Custom rule day of month (1-31, clamped to short months)
    #[arg(long, requires = "interval")]
    pub day_of_month: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the occurrence
    pub title: String,
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Due date (e.g. "tomorrow 9am", "2025-06-01 08:00")
    #[arg(short, long)]
    pub due: Option<String>,
    #[command(flatten)]
    pub rule: RuleArgs,
    /// Last instant the series may produce occurrences
    #[arg(long)]
    pub until: Option<String>,
    /// Number of further occurrences the series may produce
    #[arg(long, conflicts_with = "until")]
    pub count: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Include completed occurrences
    #[arg(short, long)]
    pub all: bool,
    /// Only recurring occurrences
    #[arg(short, long)]
    pub recurring: bool,
    /// Only occurrences whose title contains this text
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DoneCommand {
    /// The ID (or ID prefix) of the occurrence to complete
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or ID prefix) of the occurrence to edit
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, conflicts_with = "notes")]
    pub notes_clear: bool,

    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, conflicts_with = "due")]
    pub due_clear: bool,

    #[command(flatten)]
    pub rule: RuleArgs,
    /// Stop repeating (turn the occurrence into a one-off)
    #[arg(long, conflicts_with_all = ["every", "interval"])]
    pub no_recurrence: bool,

    #[arg(long)]
    pub until: Option<String>,
    #[arg(long, conflicts_with = "until")]
    pub until_clear: bool,

    #[arg(long)]
    pub count: Option<u32>,
    #[arg(long, conflicts_with = "count")]
    pub count_clear: bool,

    /// How far the edit reaches in a series (prompted when omitted on a terminal)
    #[arg(long, value_enum)]
    pub scope: Option<ScopeArg>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID (or ID prefix) of the occurrence to delete
    pub id: String,
    /// Force deletion without confirmation
    #[arg(short, long)]
    pub force: bool,
    /// Also delete every later occurrence of the series
    #[arg(long)]
    pub future: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The ID (or ID prefix) of a series member
    pub id: String,
    /// Number of dates to show (defaults to the configured count)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}
