//! Handlers of the `tripsplit` subcommands.
use std::collections::BTreeMap;

use engine::{
    Engine, EngineError, ExpenseDraft, LedgerLine, MemberId, MoneyCents, SessionContext, Trip, split_evenly,
};

use crate::{
    cli::{Command, ExpenseAddArgs, ExpenseCommand, MemberCommand, TripCommand},
    error::{AppError, Result},
};

/// Token of the sessions opened by the command line.
const CLI_TOKEN: &str = "cli";

pub async fn run(engine: &Engine, acting: Option<&str>, command: Command) -> Result<()> {
    match command {
        Command::Member(member) => match member.command {
            MemberCommand::Add(args) => {
                let member_id = MemberId::new(args.id.trim());
                engine.register_member(&member_id, &args.email).await?;
                println!("registered {member_id}");
                Ok(())
            }
        },
        Command::Trip(trip) => {
            let ctx = sign_in(engine, acting).await?;
            run_trip(engine, &ctx, trip.command).await
        }
        Command::Expense(expense) => {
            let ctx = sign_in(engine, acting).await?;
            match expense.command {
                ExpenseCommand::Add(args) => add_expense(engine, &ctx, args).await,
            }
        }
        Command::Balances => {
            let ctx = sign_in(engine, acting).await?;
            let view = engine.balances(&ctx).await?;
            print_lines("owed to you", &view.owed_to_me);
            print_lines("you owe", &view.i_owe);
            Ok(())
        }
    }
}

async fn run_trip(engine: &Engine, ctx: &SessionContext, command: TripCommand) -> Result<()> {
    match command {
        TripCommand::Create(args) => {
            let created = engine.create_trip(ctx, &args.name, &args.invitees).await?;
            println!("{}", created.trip_id);
            for email in created.unresolved {
                eprintln!("warning: nobody registered with {email}, not added");
            }
        }
        TripCommand::List => {
            for trip in engine.trips(ctx).await? {
                println!(
                    "{}  {:<9}  {} ({} members)",
                    trip.id,
                    status_label(&trip),
                    trip.name,
                    trip.members.len()
                );
            }
        }
        TripCommand::Show(args) => {
            let trip = engine.trip(ctx, args.trip).await?;
            print_trip(&trip);
        }
        TripCommand::Complete(args) => {
            let balances = engine.complete_trip(ctx, args.trip).await?;
            for (member_id, balance) in balances {
                println!("{member_id:<20} {balance:>12}");
            }
        }
        TripCommand::RetryLedger(args) => {
            engine.retry_ledger_patch(ctx, args.trip).await?;
            println!("ledger of trip {} applied", args.trip);
        }
    }
    Ok(())
}

async fn sign_in(engine: &Engine, acting: Option<&str>) -> Result<SessionContext> {
    let member_id = acting
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Usage("pass --as <member id> or set TRIPSPLIT_MEMBER".to_string()))?;
    let session = engine.open_session(CLI_TOKEN, &MemberId::new(member_id)).await?;
    Ok(SessionContext::signed_in(session))
}

async fn add_expense(engine: &Engine, ctx: &SessionContext, args: ExpenseAddArgs) -> Result<()> {
    let amount: MoneyCents = args.amount.parse()?;
    let paid_by = match args.paid_by {
        Some(id) => MemberId::new(id.trim()),
        None => ctx
            .current()
            .map(|session| session.member_id().clone())
            .ok_or(EngineError::Unauthenticated)?,
    };

    let shares = if !args.shares.is_empty() {
        parse_shares(&args.shares)?
    } else if !args.even.is_empty() {
        let participants: Vec<MemberId> =
            args.even.iter().map(|id| MemberId::new(id.trim())).collect();
        split_evenly(amount, &participants)?
    } else {
        let trip = engine.trip(ctx, args.trip).await?;
        let participants: Vec<MemberId> = trip.members.into_keys().collect();
        split_evenly(amount, &participants)?
    };

    let expense_id = engine
        .add_expense(
            ctx,
            args.trip,
            ExpenseDraft {
                description: args.description,
                amount,
                paid_by,
                date: args.date,
                shares,
            },
        )
        .await?;
    println!("{expense_id}");
    Ok(())
}

/// Parses `member=amount` pairs.
fn parse_shares(raw: &[String]) -> Result<BTreeMap<MemberId, MoneyCents>> {
    let mut shares = BTreeMap::new();
    for pair in raw {
        let (member, amount) = pair
            .split_once('=')
            .ok_or_else(|| AppError::Usage(format!("expected member=amount, got {pair}")))?;
        let member = member.trim();
        if member.is_empty() {
            return Err(AppError::Usage(format!("missing member in {pair}")));
        }
        let amount: MoneyCents = amount.trim().parse()?;
        if shares.insert(MemberId::new(member), amount).is_some() {
            return Err(AppError::Usage(format!("{member} has more than one share")));
        }
    }
    Ok(shares)
}

fn status_label(trip: &Trip) -> &'static str {
    if trip.status.is_completed() {
        "completed"
    } else {
        "active"
    }
}

fn print_trip(trip: &Trip) {
    println!("{} [{}]", trip.name, status_label(trip));
    println!("created by {}", trip.creator_id);
    for (member_id, member) in &trip.members {
        println!("  member {member_id} <{}>", member.email);
    }
    let mut expenses: Vec<_> = trip.expenses.values().collect();
    expenses.sort_by_key(|expense| expense.date);
    for expense in expenses {
        println!(
            "  {}  {:>10}  paid by {:<12} {}",
            expense.date, expense.amount, expense.paid_by, expense.description
        );
    }
    if let Some(balances) = &trip.balances {
        println!("balances:");
        for (member_id, balance) in balances {
            println!("  {member_id:<20} {balance:>12}");
        }
    }
}

fn print_lines(title: &str, lines: &[LedgerLine]) {
    println!("{title}:");
    if lines.is_empty() {
        println!("  nothing");
    }
    for line in lines {
        let who = line.email.as_deref().unwrap_or(line.member_id.as_str());
        println!("  {who:<30} {:>12}", line.amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_are_parsed() {
        let shares = parse_shares(&["alice=60".to_string(), " bob = 30.5 ".to_string()]).unwrap();
        assert_eq!(shares[&MemberId::from("alice")], MoneyCents::new(6000));
        assert_eq!(shares[&MemberId::from("bob")], MoneyCents::new(3050));
    }

    #[test]
    fn malformed_shares_are_rejected() {
        assert!(parse_shares(&["alice60".to_string()]).is_err());
        assert!(parse_shares(&["=60".to_string()]).is_err());
        assert!(parse_shares(&["alice=abc".to_string()]).is_err());
        assert!(parse_shares(&["alice=1".to_string(), "alice=2".to_string()]).is_err());
    }
}
