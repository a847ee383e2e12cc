//! Interface de linha de comando do manut baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] e flags globais
//! (--config, --database, --verbose).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// manut: ordens de serviço de manutenção.
#[derive(Debug, Parser)]
#[command(name = "manut", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./manut.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Caminho do banco SQLite; tem precedência sobre a configuração.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Abre uma nova ordem de serviço.
    Open {
        /// Área da manutenção (Elétrica, Hidráulica, Civil...).
        #[arg(long)]
        area: String,

        /// Nome do colaborador responsável.
        #[arg(long)]
        responsible: String,

        /// Descrição do serviço.
        #[arg(long)]
        description: String,

        /// CNPJ da filial atendida.
        #[arg(long)]
        branch: Option<String>,

        /// Número explícito em vez da numeração automática.
        #[arg(long)]
        number: Option<u32>,
    },

    /// Lista todas as ordens, mais recentes primeiro.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Mostra uma ordem.
    Show {
        number: u32,

        #[arg(long)]
        json: bool,
    },

    /// Altera o status de uma ordem (Open, InProgress, Completed, Cancelled).
    Status { number: u32, status: String },

    /// Remove uma ordem.
    Delete { number: u32 },

    /// Estatísticas das ordens.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Relatórios de desempenho e por período.
    #[command(subcommand)]
    Report(ReportCommand),

    /// Nomes disponíveis como responsáveis.
    Names,

    /// Cadastro de colaboradores.
    #[command(subcommand)]
    Employee(EmployeeCommand),

    /// Cadastro de empresas.
    #[command(subcommand)]
    Company(CompanyCommand),

    /// Cadastro de filiais.
    #[command(subcommand)]
    Branch(BranchCommand),
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Desempenho por responsável.
    Performance {
        #[arg(long)]
        json: bool,
    },
    /// Ordens abertas entre duas datas (AAAA-MM-DD, inclusivas).
    Period {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum CompanyCommand {
    /// Cadastra uma empresa.
    Add { cnpj: String, legal_name: String },
    /// Remove uma empresa pelo CNPJ.
    Remove { cnpj: String },
    /// Lista as empresas.
    List,
}

#[derive(Debug, Subcommand)]
pub enum EmployeeCommand {
    /// Cadastra um colaborador.
    Add {
        registration: u32,
        name: String,
        #[arg(long, default_value = "")]
        role: String,
    },
    /// Remove um colaborador pela matrícula.
    Remove { registration: u32 },
    /// Lista os colaboradores.
    List,
}

#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// Cadastra uma filial.
    Add { cnpj: String, name: String },
    /// Remove uma filial pelo CNPJ.
    Remove { cnpj: String },
    /// Lista as filiais.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_open_subcommand() {
        let cli = Cli::parse_from([
            "manut",
            "open",
            "--area",
            "Electrical",
            "--responsible",
            "A. Silva",
            "--description",
            "Replace breaker",
        ]);
        match cli.command {
            Command::Open {
                area,
                branch,
                number,
                ..
            } => {
                assert_eq!(area, "Electrical");
                assert!(branch.is_none());
                assert!(number.is_none());
            }
            _ => panic!("expected Open command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "manut",
            "--database",
            "/tmp/x.db",
            "--verbose",
            "status",
            "3",
            "Concluída",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Command::Status { number, status } => {
                assert_eq!(number, 3);
                assert_eq!(status, "Concluída");
            }
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn cli_parses_nested_roster_commands() {
        let cli = Cli::parse_from(["manut", "employee", "add", "12", "Ana", "--role", "Civil"]);
        assert!(matches!(
            cli.command,
            Command::Employee(EmployeeCommand::Add { registration: 12, .. })
        ));

        let cli = Cli::parse_from(["manut", "branch", "remove", "11222333000144"]);
        assert!(matches!(cli.command, Command::Branch(BranchCommand::Remove { .. })));
    }

    #[test]
    fn cli_parses_period_report_dates() {
        let cli = Cli::parse_from([
            "manut", "report", "period", "--from", "2024-05-01", "--to", "2024-05-31",
        ]);
        match cli.command {
            Command::Report(ReportCommand::Period { from, to, json }) => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
                assert_eq!(to, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
                assert!(!json);
            }
            _ => panic!("expected Report Period command"),
        }

        assert!(
            Cli::try_parse_from(["manut", "report", "period", "--from", "01/05/2024", "--to", "2024-05-31"])
                .is_err()
        );
        let cli = Cli::parse_from(["manut", "company", "add", "11222333000144", "Acme SA"]);
        assert!(matches!(cli.command, Command::Company(CompanyCommand::Add { .. })));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
