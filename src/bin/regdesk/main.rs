//! regdesk CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::bail;
use regdesk::poller::PollPhase;
use regdesk::roster::{self, AdminDecision, RosterFilter};
use regdesk::{Console, GuardOutcome};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Roles allowed to use the admin operations.
const ADMIN_ROLES: &[&str] = &["admin"];

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("regdesk v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration and the console
    let config = cli.to_config()?;
    let console = Console::build(config)?;

    match cli.command {
        Command::Login { token } => login(&console, &token).await,
        Command::Logout => {
            console.logout()?;
            println!("Signed out.");
            Ok(())
        }
        Command::List {
            college,
            status,
            from,
            to,
            search,
        } => {
            let filter = RosterFilter {
                college,
                payment_status: status.map(Into::into),
                from,
                to,
                search,
            };
            list(&console, &filter).await
        }
        Command::Accept { id, yes } => decide(&console, &id, AdminDecision::Accept, yes).await,
        Command::Reject { id, yes } => decide(&console, &id, AdminDecision::Reject, yes).await,
        Command::Refund { id, yes } => decide(&console, &id, AdminDecision::Refund, yes).await,
        Command::Status { ids, recheck } => status(&console, &ids, recheck).await,
    }
}

async fn login(console: &Console, token: &str) -> color_eyre::Result<()> {
    match console.login(token).await {
        Ok(role) => {
            println!("Signed in with role '{role}'.");
            Ok(())
        }
        Err(e) if e.is_session_invalid() => bail!("the backend rejected this token"),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the route guard for the admin allow-list, or bail with a
/// user-facing message.
async fn ensure_admin(console: &Console) -> color_eyre::Result<String> {
    match console.authorize(ADMIN_ROLES).await {
        GuardOutcome::Granted { role } => Ok(role),
        GuardOutcome::Denied { role } => {
            bail!("access denied: role '{role}' may not use the admin console")
        }
        GuardOutcome::Unauthenticated => {
            bail!("no valid session - run `regdesk login --token <TOKEN>` first")
        }
    }
}

async fn fetch_candidates(console: &Console) -> color_eyre::Result<Vec<regdesk::api::types::Candidate>> {
    match console.candidates().await {
        Ok(candidates) => Ok(candidates),
        Err(e) if e.is_session_invalid() => {
            bail!("session expired - run `regdesk login --token <TOKEN>` again")
        }
        Err(e) => Err(e.into()),
    }
}

async fn list(console: &Console, filter: &RosterFilter) -> color_eyre::Result<()> {
    ensure_admin(console).await?;
    let candidates = fetch_candidates(console).await?;
    let rows = roster::filter(&candidates, filter);

    println!(
        "{:<26} {:<16} {:<28} {:<10} {:<12}",
        "Name", "Phone", "College/Company", "Payment", "Registered"
    );
    for candidate in &rows {
        let organization = candidate
            .college
            .as_deref()
            .or(candidate.company_name.as_deref())
            .unwrap_or("-");
        let registered = candidate
            .registration_date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
        println!(
            "{:<26} {:<16} {:<28} {:<10} {:<12}",
            truncate(&candidate.name, 24),
            candidate.whatsapp_number.as_deref().unwrap_or("-"),
            truncate(organization, 26),
            candidate.payment_status.to_string(),
            registered,
        );
    }

    let summary = roster::summarize(rows.iter().copied());
    println!(
        "\n{} records | paid {} | pending {} | failed {} | refunded {}",
        summary.total, summary.paid, summary.pending, summary.failed, summary.refunded
    );
    Ok(())
}

async fn decide(
    console: &Console,
    id: &str,
    decision: AdminDecision,
    yes: bool,
) -> color_eyre::Result<()> {
    ensure_admin(console).await?;

    let candidates = fetch_candidates(console).await?;
    let Some(candidate) = candidates.into_iter().find(|c| c.id == id) else {
        bail!("no registration with id {id}")
    };
    println!(
        "{} - currently {} ({id})",
        candidate.name, candidate.payment_status
    );

    if !yes && !confirm(&format!("Really {decision} this registration?"))? {
        println!("Aborted.");
        return Ok(());
    }

    let update = match console.decide(id, decision).await {
        Ok(update) => update,
        Err(e) if e.is_session_invalid() => {
            bail!("session expired - run `regdesk login --token <TOKEN>` again")
        }
        // Local state stays untouched; the action can be retried as-is.
        Err(e) => bail!("failed to {decision} {id}: {e}"),
    };

    let mut merged = candidate;
    roster::apply_update(&mut merged, &update);
    println!(
        "{} is now {} ({}).",
        merged.name, merged.payment_status, update.admin_action
    );
    Ok(())
}

async fn status(console: &Console, ids: &[String], recheck: bool) -> color_eyre::Result<()> {
    for id in ids {
        if !recheck && console.is_confirmed(id) {
            println!("{id}: payment confirmed (already verified this session)");
            continue;
        }

        let (session, canceller) = console.poll_session(id);
        let mut task = session.spawn();
        let report = loop {
            tokio::select! {
                result = &mut task => break result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("cancelling poll for {id}");
                    canceller.cancel();
                }
            }
        };

        match report.phase {
            PollPhase::Success => match &report.last_snapshot {
                Some(candidate) => {
                    let amount = candidate
                        .payment_amount
                        .map_or_else(|| "N/A".to_string(), |a| format!("{a}"));
                    println!(
                        "{id}: payment confirmed - {} paid Rs. {amount}",
                        candidate.name
                    );
                }
                None => println!("{id}: payment confirmed"),
            },
            PollPhase::Failed => {
                let reason = report
                    .last_snapshot
                    .as_ref()
                    .and_then(|c| c.payment_failure_reason.as_deref());
                match reason {
                    Some(reason) => println!("{id}: payment failed ({reason})"),
                    None => println!("{id}: payment failed"),
                }
            }
            PollPhase::Pending => println!(
                "{id}: still processing after {} attempt(s) - run again with --recheck",
                report.attempts
            ),
            PollPhase::Invalid => println!("{id}: not a valid registration id"),
            PollPhase::Error => println!("{id}: verification unavailable - try again later"),
            PollPhase::Loading => {}
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> color_eyre::Result<bool> {
    use std::io::Write as _;

    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
