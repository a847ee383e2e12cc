mod cli;
mod ui;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{BranchCommand, Cli, Command, CompanyCommand, EmployeeCommand, ReportCommand};
use manut::ManutError;
use manut::config::ManutConfig;
use manut::service::TicketService;
use manut::store::SqliteRepository;
use manut::work_order::NewTicket;
use ui::Printer;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let printer = Printer::default();
    match run(cli, &printer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            printer.error(&format!("{err:#}"));
            ExitCode::from(exit_status(&err))
        }
    }
}

/// `2` when the input was rejected, `1` for everything else.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ManutError>() {
        Some(e) if e.is_client_error() => 2,
        _ => 1,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "manut=debug" } else { "manut=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, printer: &Printer) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ManutConfig::load_from(path)?,
        None => ManutConfig::load()?,
    };
    if let Some(db) = cli.database {
        config.database_path = db;
    }

    let repo = SqliteRepository::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let service = TicketService::new(repo, &config);

    match cli.command {
        Command::Open {
            area,
            responsible,
            description,
            branch,
            number,
        } => {
            let mut draft = NewTicket::new(area, responsible, description);
            draft.branch = branch;
            let number = match number {
                Some(n) => service.create_with_number(n, draft)?,
                None => service.create(draft)?,
            };
            printer.success(&format!("Ticket #{number} opened"));
        }
        Command::List { json } => {
            let views = service.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                printer.tickets(&views);
            }
        }
        Command::Show { number, json } => {
            let view = service.get(number)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                printer.ticket(&view);
            }
        }
        Command::Status { number, status } => {
            let transition = service.update_status(number, &status)?;
            printer.transition(&transition);
        }
        Command::Delete { number } => {
            if service.delete(number)? {
                printer.success(&format!("Ticket #{number} deleted"));
            } else {
                printer.warning(&format!("Ticket #{number} not found"));
            }
        }
        Command::Stats { json } => {
            let stats = service.statistics()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                printer.statistics(&stats);
            }
        }
        Command::Report(cmd) => match cmd {
            ReportCommand::Performance { json } => {
                let rows = service.performance_report()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    printer.performance(&rows);
                }
            }
            ReportCommand::Period { from, to, json } => {
                let report = service.period_report(from, to)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    printer.period(&report);
                }
            }
        },
        Command::Names => {
            for name in service.list_responsible_names()? {
                println!("{name}");
            }
        }
        Command::Employee(cmd) => match cmd {
            EmployeeCommand::Add {
                registration,
                name,
                role,
            } => {
                let employee = service.create_employee(registration, &name, &role)?;
                printer.success(&format!("Employee {} registered", employee.name));
            }
            EmployeeCommand::Remove { registration } => {
                if service.delete_employee(registration)? {
                    printer.success(&format!("Employee {registration} removed"));
                } else {
                    printer.warning(&format!("Employee {registration} not found"));
                }
            }
            EmployeeCommand::List => printer.employees(&service.list_employees()?),
        },
        Command::Company(cmd) => match cmd {
            CompanyCommand::Add { cnpj, legal_name } => {
                let company = service.create_company(&cnpj, &legal_name)?;
                printer.success(&format!("Company {} registered", company.legal_name));
            }
            CompanyCommand::Remove { cnpj } => {
                if service.delete_company(&cnpj)? {
                    printer.success(&format!("Company {cnpj} removed"));
                } else {
                    printer.warning(&format!("Company {cnpj} not found"));
                }
            }
            CompanyCommand::List => printer.companies(&service.list_companies()?),
        },
        Command::Branch(cmd) => match cmd {
            BranchCommand::Add { cnpj, name } => {
                let branch = service.create_branch(&cnpj, &name)?;
                printer.success(&format!("Branch {} registered", branch.name));
            }
            BranchCommand::Remove { cnpj } => {
                if service.delete_branch(&cnpj)? {
                    printer.success(&format!("Branch {cnpj} removed"));
                } else {
                    printer.warning(&format!("Branch {cnpj} not found"));
                }
            }
            BranchCommand::List => printer.branches(&service.list_branches()?),
        },
    }

    if cli.verbose {
        printer.cache(&service.cache_stats());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_input_exits_with_two() {
        let err = anyhow::Error::from(ManutError::TicketNotFound(4));
        assert_eq!(exit_status(&err), 2);

        let err = anyhow::Error::from(ManutError::UnknownStatus("Pausada".into()))
            .context("status update failed");
        assert_eq!(exit_status(&err), 2);
    }

    #[test]
    fn infrastructure_failures_exit_with_one() {
        let err = anyhow::Error::from(ManutError::StoreUnavailable("locked".into()));
        assert_eq!(exit_status(&err), 1);
        assert_eq!(exit_status(&anyhow::anyhow!("config unreadable")), 1);
    }
}
