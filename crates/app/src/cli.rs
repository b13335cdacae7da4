use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::TripId;

#[derive(Parser, Debug)]
#[command(name = "tripsplit")]
#[command(about = "Shared trip expenses: who owes whom")]
pub struct Cli {
    /// Settings file (TOML). Defaults to `./settings.toml` when present.
    #[arg(long, env = "TRIPSPLIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database snapshot (JSON); overrides `store.path`.
    #[arg(long, env = "TRIPSPLIT_DB")]
    pub db: Option<PathBuf>,

    /// Member id acting on the database.
    #[arg(long = "as", env = "TRIPSPLIT_MEMBER", global = true)]
    pub as_member: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Member(Member),
    Trip(Trip),
    Expense(Expense),
    /// Show what you owe and what you are owed across all trips.
    Balances,
}

#[derive(Args, Debug)]
pub struct Member {
    #[command(subcommand)]
    pub command: MemberCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Register a member id with its email.
    Add(MemberAddArgs),
}

#[derive(Args, Debug)]
pub struct MemberAddArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub email: String,
}

#[derive(Args, Debug)]
pub struct Trip {
    #[command(subcommand)]
    pub command: TripCommand,
}

#[derive(Subcommand, Debug)]
pub enum TripCommand {
    /// Create a trip and invite people by email.
    Create(TripCreateArgs),
    /// List your trips.
    List,
    /// Show a trip with its expenses.
    Show(TripRefArgs),
    /// Close a trip and settle balances (creator only).
    Complete(TripRefArgs),
    /// Apply the balances of a closed trip whose ledger update failed.
    RetryLedger(TripRefArgs),
}

#[derive(Args, Debug)]
pub struct TripCreateArgs {
    #[arg(long)]
    pub name: String,
    /// Email of a person to invite; repeat for more.
    #[arg(long = "invite", required = true)]
    pub invitees: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TripRefArgs {
    #[arg(long)]
    pub trip: TripId,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    /// Add an expense. Without --share or --even it is split evenly across
    /// all trip members.
    Add(ExpenseAddArgs),
}

#[derive(Args, Debug)]
pub struct ExpenseAddArgs {
    #[arg(long)]
    pub trip: TripId,
    #[arg(long)]
    pub description: String,
    /// Total amount, e.g. `90` or `12.50`.
    #[arg(long)]
    pub amount: String,
    /// Member who paid; defaults to the acting member.
    #[arg(long)]
    pub paid_by: Option<String>,
    /// Custom share as `member=amount`; repeat for each participant.
    #[arg(long = "share", conflicts_with = "even")]
    pub shares: Vec<String>,
    /// Split evenly across these members.
    #[arg(long, num_args = 1..)]
    pub even: Vec<String>,
    /// Expense date (`YYYY-MM-DD`); defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}
