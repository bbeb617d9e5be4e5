mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use reqtrack_core::{
    create_backend, export, get_config_path, models, Config, FinanceStatus, NewRequest, Request,
    RequestBackend, RequestField, RequestFilter, RequestStatus,
};

use crate::cli::{Cli, Command};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let store_config = config.store_config(cli.file.as_deref(), cli.dry_run);
    log::debug!("Using data file {:?}", store_config.path);
    let backend = create_backend(&store_config)?;
    let backend = backend.as_ref();
    if cli.dry_run {
        eprintln!(
            "{}",
            format!(
                "Dry run: changes stay in the {} store, {} is not modified",
                backend.backend_type(),
                store_config.path.display()
            )
            .yellow()
        );
    }

    match &cli.command {
        Command::Submit {
            name,
            purpose,
            amount,
            interactive,
        } => {
            // Default to interactive mode if no specific arguments are provided
            let should_be_interactive =
                *interactive || (name.is_none() && purpose.is_none() && amount.is_none());

            let submission = if should_be_interactive {
                prompts::prompt_new_request()?
            } else {
                submission_from_args(name, purpose, amount)?
            };
            submit_request(backend, submission)?;
        }
        Command::List {
            status,
            finance_status,
            requester,
        } => {
            let filter = RequestFilter {
                status: status.as_deref().map(RequestStatus::from_str).transpose()?,
                finance_status: finance_status
                    .as_deref()
                    .map(FinanceStatus::from_str)
                    .transpose()?,
                requester: requester.clone(),
            };
            list_requests(backend, &filter)?;
        }
        Command::Show { id } => {
            show_request(&backend.get_request(id)?);
        }
        Command::Status { id, status } => {
            let status: RequestStatus = status.parse()?;
            let request = backend.update_status(id, status)?;
            println!(
                "{} {} is now {}",
                "Updated:".green(),
                request.reference_id,
                status_label(request.status)
            );
        }
        Command::Finance {
            id,
            finance_status,
            issue_date,
        } => {
            update_finance(backend, id, finance_status, issue_date.as_deref())?;
        }
        Command::Liquidate {
            id,
            liquidated,
            returned,
            invoices,
        } => {
            let liquidated = parse_amount("liquidated", liquidated)?;
            let returned = parse_amount("returned", returned)?;
            let request = backend.update_liquidation(id, liquidated, returned, invoices)?;
            println!(
                "{} {} liquidated {}, returned {}, outstanding {}",
                "Updated:".green(),
                request.reference_id,
                liquidated,
                returned,
                request.outstanding()
            );
        }
        Command::Edit {
            id,
            set,
            interactive,
        } => {
            let changes = if *interactive || set.is_empty() {
                let request = backend.get_request(id)?;
                prompts::prompt_edit_request(&request)?
            } else {
                parse_assignments(set)?
            };
            let request = backend.edit_request(id, &changes)?;
            println!("{} {}", "Edited:".green(), request.reference_id);
            show_request(&request);
        }
        Command::Summary => {
            show_summary(backend)?;
        }
        Command::Export { output } => {
            let requests = backend.read_all()?;
            export::export_json(&requests, output)?;
            println!("Exported to JSON: {}", output.display());
            println!("  Total requests: {}", requests.len());
        }
        Command::Path => {
            println!("{}", backend.path().display());
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }
    match get_config_path() {
        Ok(path) => Config::load_or_default(path),
        Err(e) => {
            log::warn!("No config file location: {:#}", e);
            Ok(Config::default())
        }
    }
}

fn submission_from_args(
    name: &Option<String>,
    purpose: &Option<String>,
    amount: &Option<String>,
) -> Result<NewRequest> {
    let name = name
        .clone()
        .context("Requester name is required. Use --name to specify it.")?;
    let purpose = purpose
        .clone()
        .context("Purpose is required. Use --purpose to specify it.")?;
    let amount = amount
        .as_deref()
        .context("Amount is required. Use --amount to specify it.")?;
    let amount = models::parse_positive_amount(amount)?;

    Ok(NewRequest::new(name, purpose, amount))
}

fn submit_request(backend: &dyn RequestBackend, submission: NewRequest) -> Result<()> {
    let request = backend.submit(submission)?;

    println!("{}", "Request submitted successfully!".green());
    println!("Reference ID: {}", request.reference_id.green());
    println!("Submitted: {}", request.submission_date.format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}

fn update_finance(
    backend: &dyn RequestBackend,
    id: &str,
    finance_status: &str,
    issue_date: Option<&str>,
) -> Result<()> {
    let finance_status: FinanceStatus = finance_status.parse()?;
    let issue_date = match issue_date {
        Some(date) => models::parse_optional_date(date)?,
        None if finance_status == FinanceStatus::Issued => {
            Some(chrono::Local::now().date_naive())
        }
        None => None,
    };

    let request = backend.update_finance_status(id, finance_status, issue_date)?;
    let date = request
        .issue_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} {} finance status is now {} (issue date {})",
        "Updated:".green(),
        request.reference_id,
        finance_label(request.finance_status),
        date
    );

    Ok(())
}

fn list_requests(backend: &dyn RequestBackend, filter: &RequestFilter) -> Result<()> {
    let requests = backend.list_requests(filter)?;

    if requests.is_empty() {
        println!("{}", "No requests found.".yellow());
        return Ok(());
    }

    println!(
        "{:<9} | {:<10} | {:<20} | {:<30} | {:>12} | {:<9} | {:<8}",
        "ID", "Submitted", "Requester", "Purpose", "Amount", "Status", "Finance"
    );
    println!("{}", "-".repeat(116));

    for req in requests {
        println!(
            "{:<9} | {:<10} | {:<20} | {:<30} | {:>12} | {:<9} | {:<8}",
            req.reference_id,
            req.submission_date.format("%Y-%m-%d").to_string(),
            truncate(&req.requester_name, 20),
            truncate(&req.purpose, 30),
            req.amount_requested.to_string(),
            status_label(req.status),
            finance_label(req.finance_status)
        );
    }

    Ok(())
}

fn show_request(req: &Request) {
    for field in RequestField::ALL {
        let value = match field {
            RequestField::Status => status_label(req.status).to_string(),
            RequestField::FinanceStatus => finance_label(req.finance_status).to_string(),
            _ => {
                let value = req.field_value(field);
                if value.is_empty() {
                    "-".to_string()
                } else {
                    value
                }
            }
        };
        println!("{}: {}", field.header().blue(), value);
    }
    if req.liquidated.is_some() || req.returned.is_some() {
        println!("{}: {}", "Outstanding".blue(), req.outstanding());
    }
}

fn show_summary(backend: &dyn RequestBackend) -> Result<()> {
    let summary = backend.summary()?;

    println!("{}: {}", "Requests".blue(), summary.total_requests);
    println!(
        "  {} {}  {} {}  {} {}",
        status_label(RequestStatus::Pending),
        summary.pending,
        status_label(RequestStatus::Approved),
        summary.approved,
        status_label(RequestStatus::Declined),
        summary.declined
    );
    println!("{}: {}", "Issued".blue(), summary.issued);
    println!("{}: {}", "Total requested".blue(), summary.total_requested);
    println!("{}: {}", "Total issued".blue(), summary.total_issued);
    println!("{}: {}", "Total liquidated".blue(), summary.total_liquidated);
    println!("{}: {}", "Total returned".blue(), summary.total_returned);
    println!("{}: {}", "Outstanding".blue(), summary.outstanding);

    Ok(())
}

/// Parses `COLUMN=VALUE` pairs; the value may be empty to clear a column
fn parse_assignments(assignments: &[String]) -> Result<BTreeMap<String, String>> {
    let mut changes = BTreeMap::new();
    for assignment in assignments {
        let (column, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected COLUMN=VALUE, got '{}'", assignment))?;
        changes.insert(column.trim().to_string(), value.to_string());
    }
    Ok(changes)
}

fn parse_amount(label: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .with_context(|| format!("Invalid {} amount '{}'", label, value))
}

fn status_label(status: RequestStatus) -> ColoredString {
    match status {
        RequestStatus::Pending => "Pending".yellow(),
        RequestStatus::Approved => "Approved".green(),
        RequestStatus::Declined => "Declined".red(),
    }
}

fn finance_label(status: FinanceStatus) -> ColoredString {
    match status {
        FinanceStatus::Pending => "Pending".yellow(),
        FinanceStatus::Issued => "Issued".green(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() <= width {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
