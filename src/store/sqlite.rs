//! Repositório relacional sobre SQLite.
//!
//! O esquema é criado na abertura. A restrição `CHECK` da tabela `tickets`
//! impede que uma linha com data de conclusão incoerente com o status seja
//! gravada. A conexão fica atrás de um mutex, mantido apenas durante um
//! único comando SQL.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ffi, params};
use tracing::debug;

use super::{Repository, StoreError, inconsistent};
use crate::work_order::{Branch, Company, Employee, StatusUpdate, Ticket, TicketStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    number       INTEGER PRIMARY KEY,
    opened_on    TEXT NOT NULL,
    area         TEXT NOT NULL,
    status       TEXT NOT NULL,
    responsible  TEXT NOT NULL,
    description  TEXT NOT NULL,
    branch       TEXT,
    completed_on TEXT,
    CHECK ((completed_on IS NOT NULL) = (status IN ('Completed', 'Cancelled')))
);
CREATE TABLE IF NOT EXISTS employees (
    registration INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    role         TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS companies (
    cnpj       TEXT PRIMARY KEY,
    legal_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS branches (
    cnpj TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
";

const TICKET_COLUMNS: &str =
    "number, opened_on, area, status, responsible, description, branch, completed_on";

impl ToSql for TicketStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TicketStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<TicketStatus>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn map_err(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                StoreError::UniqueViolation
            }
            _ => match e.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen => {
                    StoreError::Unavailable(err.to_string())
                }
                _ => StoreError::Backend(err.to_string()),
            },
        },
        _ => StoreError::Backend(err.to_string()),
    }
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        number: row.get(0)?,
        opened_on: row.get(1)?,
        area: row.get(2)?,
        status: row.get(3)?,
        responsible: row.get(4)?,
        description: row.get(5)?,
        branch: row.get(6)?,
        completed_on: row.get(7)?,
    })
}

/// Repository backed by a single SQLite connection.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (or creates) the database file at `path` and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(map_err)?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(map_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(map_err)?;
        conn.execute_batch(SCHEMA).map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))
    }
}

impl Repository for SqliteRepository {
    fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        if !ticket.is_consistent() {
            return Err(inconsistent(ticket.number));
        }
        self.conn()?
            .execute(
                &format!("INSERT INTO tickets ({TICKET_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    ticket.number,
                    ticket.opened_on,
                    ticket.area,
                    ticket.status,
                    ticket.responsible,
                    ticket.description,
                    ticket.branch,
                    ticket.completed_on,
                ],
            )
            .map_err(map_err)?;
        Ok(())
    }

    fn update_ticket(&self, number: u32, update: &StatusUpdate) -> Result<bool, StoreError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE tickets SET status = ?1, completed_on = ?2 WHERE number = ?3",
                params![update.status, update.completed_on, number],
            )
            .map_err(map_err)?;
        Ok(changed > 0)
    }

    fn delete_ticket(&self, number: u32) -> Result<bool, StoreError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM tickets WHERE number = ?1", params![number])
            .map_err(map_err)?;
        Ok(removed > 0)
    }

    fn max_ticket_number(&self) -> Result<Option<u32>, StoreError> {
        self.conn()?
            .query_row("SELECT MAX(number) FROM tickets", [], |row| {
                row.get::<_, Option<u32>>(0)
            })
            .map_err(map_err)
    }

    fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY opened_on DESC, number DESC"
            ))
            .map_err(map_err)?;
        let rows = stmt
            .query_map([], ticket_from_row)
            .map_err(map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_err)?;
        Ok(rows)
    }

    fn get_ticket(&self, number: u32) -> Result<Option<Ticket>, StoreError> {
        self.conn()?
            .query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE number = ?1"),
                params![number],
                ticket_from_row,
            )
            .optional()
            .map_err(map_err)
    }

    fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        self.conn()?
            .execute(
                "INSERT INTO employees (registration, name, role) VALUES (?1, ?2, ?3)",
                params![employee.registration, employee.name, employee.role],
            )
            .map_err(map_err)?;
        Ok(())
    }

    fn delete_employee(&self, registration: u32) -> Result<bool, StoreError> {
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM employees WHERE registration = ?1",
                params![registration],
            )
            .map_err(map_err)?;
        Ok(removed > 0)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT registration, name, role FROM employees ORDER BY name")
            .map_err(map_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Employee {
                    registration: row.get(0)?,
                    name: row.get(1)?,
                    role: row.get(2)?,
                })
            })
            .map_err(map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_err)?;
        Ok(rows)
    }

    fn insert_company(&self, company: &Company) -> Result<(), StoreError> {
        self.conn()?
            .execute(
                "INSERT INTO companies (cnpj, legal_name) VALUES (?1, ?2)",
                params![company.cnpj, company.legal_name],
            )
            .map_err(map_err)?;
        Ok(())
    }

    fn delete_company(&self, cnpj: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM companies WHERE cnpj = ?1", params![cnpj])
            .map_err(map_err)?;
        Ok(removed > 0)
    }

    fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT cnpj, legal_name FROM companies ORDER BY legal_name")
            .map_err(map_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Company {
                    cnpj: row.get(0)?,
                    legal_name: row.get(1)?,
                })
            })
            .map_err(map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_err)?;
        Ok(rows)
    }

    fn insert_branch(&self, branch: &Branch) -> Result<(), StoreError> {
        self.conn()?
            .execute(
                "INSERT INTO branches (cnpj, name) VALUES (?1, ?2)",
                params![branch.cnpj, branch.name],
            )
            .map_err(map_err)?;
        Ok(())
    }

    fn delete_branch(&self, cnpj: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM branches WHERE cnpj = ?1", params![cnpj])
            .map_err(map_err)?;
        Ok(removed > 0)
    }

    fn list_branches(&self) -> Result<Vec<Branch>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT cnpj, name FROM branches ORDER BY name")
            .map_err(map_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Branch {
                    cnpj: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_err)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_order::{LifecycleEngine, NewTicket};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn ticket(number: u32) -> Ticket {
        Ticket::open(
            number,
            &NewTicket::new("Electrical", "A. Silva", "Replace breaker")
                .with_branch("11222333000144"),
            date(1),
        )
    }

    #[test]
    fn ticket_round_trips_through_sql() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_ticket(&ticket(1)).unwrap();
        let loaded = repo.get_ticket(1).unwrap().unwrap();
        assert_eq!(loaded, ticket(1));
        assert!(repo.get_ticket(2).unwrap().is_none());
    }

    #[test]
    fn primary_key_collision_maps_to_unique_violation() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_ticket(&ticket(1)).unwrap();
        assert_eq!(
            repo.insert_ticket(&ticket(1)),
            Err(StoreError::UniqueViolation)
        );
    }

    #[test]
    fn check_constraint_rejects_inconsistent_update() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_ticket(&ticket(1)).unwrap();
        let bad = StatusUpdate {
            status: TicketStatus::Open,
            completed_on: Some(date(2)),
        };
        assert!(matches!(
            repo.update_ticket(1, &bad),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn status_update_is_persisted() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_ticket(&ticket(1)).unwrap();
        let update = LifecycleEngine::plan(TicketStatus::Completed, date(4));
        assert!(repo.update_ticket(1, &update).unwrap());
        assert!(!repo.update_ticket(99, &update).unwrap());

        let loaded = repo.get_ticket(1).unwrap().unwrap();
        assert_eq!(loaded.status, TicketStatus::Completed);
        assert_eq!(loaded.completed_on, Some(date(4)));
    }

    #[test]
    fn max_and_delete() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert_eq!(repo.max_ticket_number().unwrap(), None);
        repo.insert_ticket(&ticket(3)).unwrap();
        repo.insert_ticket(&ticket(7)).unwrap();
        assert_eq!(repo.max_ticket_number().unwrap(), Some(7));
        assert!(repo.delete_ticket(7).unwrap());
        assert!(!repo.delete_ticket(7).unwrap());
        assert_eq!(repo.list_tickets().unwrap().len(), 1);
    }

    #[test]
    fn roster_tables() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_employee(&Employee::new(7, "Carla", "Encanadora").unwrap())
            .unwrap();
        repo.insert_employee(&Employee::new(3, "Bruno", "").unwrap())
            .unwrap();
        assert_eq!(
            repo.insert_employee(&Employee::new(7, "Dup", "").unwrap()),
            Err(StoreError::UniqueViolation)
        );
        let names: Vec<String> = repo
            .list_employees()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Bruno", "Carla"]);
        assert!(repo.delete_employee(3).unwrap());

        repo.insert_branch(&Branch::new("11222333000144", "Norte").unwrap())
            .unwrap();
        assert_eq!(repo.list_branches().unwrap()[0].name, "Norte");
        assert!(repo.delete_branch("11222333000144").unwrap());
        assert!(!repo.delete_branch("11222333000144").unwrap());
    }

    #[test]
    fn company_table() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let acme = Company::new("11222333000144", "Acme SA").unwrap();
        repo.insert_company(&acme).unwrap();
        assert_eq!(repo.insert_company(&acme), Err(StoreError::UniqueViolation));
        assert_eq!(repo.list_companies().unwrap(), vec![acme]);
        assert!(repo.delete_company("11222333000144").unwrap());
        assert!(repo.list_companies().unwrap().is_empty());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manut.db");
        {
            let repo = SqliteRepository::open(&path).unwrap();
            repo.insert_ticket(&ticket(1)).unwrap();
        }
        let repo = SqliteRepository::open(&path).unwrap();
        assert_eq!(repo.max_ticket_number().unwrap(), Some(1));
    }
}
