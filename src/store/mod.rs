//! Persistência das ordens de serviço e do cadastro.
//!
//! O trait [`Repository`] é a única fronteira entre o núcleo e o banco. Todas
//! as chamadas são síncronas e podem bloquear; o serviço nunca as executa
//! enquanto segura o lock do cache.

pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::work_order::{Branch, Company, Employee, StatusUpdate, Ticket};

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An insert collided with an existing primary key.
    #[error("unique constraint violated")]
    UniqueViolation,

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Backend(String),
}

/// Durable storage for tickets, employees, companies and branches.
pub trait Repository: Send + Sync {
    /// Inserts a new ticket. Fails with [`StoreError::UniqueViolation`] if the number is taken.
    fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Writes status and completion date. Returns `false` when no row matched.
    fn update_ticket(&self, number: u32, update: &StatusUpdate) -> Result<bool, StoreError>;

    /// Returns `false` when no row matched.
    fn delete_ticket(&self, number: u32) -> Result<bool, StoreError>;

    fn max_ticket_number(&self) -> Result<Option<u32>, StoreError>;

    /// All tickets, most recently opened first.
    fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError>;

    fn get_ticket(&self, number: u32) -> Result<Option<Ticket>, StoreError>;

    fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError>;

    fn delete_employee(&self, registration: u32) -> Result<bool, StoreError>;

    /// All employees ordered by name.
    fn list_employees(&self) -> Result<Vec<Employee>, StoreError>;

    fn insert_company(&self, company: &Company) -> Result<(), StoreError>;

    fn delete_company(&self, cnpj: &str) -> Result<bool, StoreError>;

    /// All companies ordered by legal name.
    fn list_companies(&self) -> Result<Vec<Company>, StoreError>;

    fn insert_branch(&self, branch: &Branch) -> Result<(), StoreError>;

    fn delete_branch(&self, cnpj: &str) -> Result<bool, StoreError>;

    /// All branches ordered by name.
    fn list_branches(&self) -> Result<Vec<Branch>, StoreError>;
}

fn inconsistent(number: u32) -> StoreError {
    StoreError::Backend(format!(
        "ticket #{number}: completion date does not match status"
    ))
}
