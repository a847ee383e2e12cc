//! Serviço de ordens de serviço: a raiz de composição do núcleo.
//!
//! O [`TicketService`] combina o repositório, o alocador de números, o motor
//! de ciclo de vida e o cache. Leituras de listagem passam pelo cache com TTL
//! por classe de recurso; toda mutação invalida, antes de retornar, as chaves
//! cujas listagens poderiam conter a entidade alterada.
//!
//! Duas buscas simultâneas para a mesma chave ausente podem consultar o banco
//! em duplicidade. Isso é aceito: o lock do cache nunca é mantido durante I/O.
//! Um resultado buscado antes de uma invalidação volta apenas para quem o
//! pediu e não é gravado no cache.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::allocator::TicketAllocator;
use crate::cache::{CacheStats, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheTtls, ManutConfig};
use crate::error::ManutError;
use crate::store::{Repository, StoreError};
use crate::validate;
use crate::work_order::{
    Branch, Company, Employee, LifecycleEngine, NewTicket, PeriodReport, ResponsiblePerformance,
    StatusUpdate, Ticket, TicketStatistics, TicketStatus, TicketView, Transition,
};

pub const TICKETS_KEY: &str = "tickets:all";
pub const EMPLOYEES_KEY: &str = "employees:all";
pub const RESPONSIBLE_NAMES_KEY: &str = "employees:names";
pub const COMPANIES_KEY: &str = "companies:all";
pub const BRANCHES_KEY: &str = "branches:all";

type Payload = Arc<dyn Any + Send + Sync>;

/// Maps a unique violation to a conflict naming `what`.
fn conflict(what: String) -> impl FnOnce(StoreError) -> ManutError {
    move |err| match err {
        StoreError::UniqueViolation => ManutError::AlreadyExists(what),
        other => other.into(),
    }
}

/// Public entry point for creating, reading and changing work orders.
pub struct TicketService<R> {
    repo: R,
    cache: CacheStore<Payload>,
    allocator: TicketAllocator,
    ttls: CacheTtls,
    clock: Arc<dyn Clock>,
}

impl<R: Repository> TicketService<R> {
    pub fn new(repo: R, config: &ManutConfig) -> Self {
        Self::with_clock(repo, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: R, config: &ManutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            cache: CacheStore::with_clock(clock.clone()),
            allocator: TicketAllocator::new(config.retry_config()),
            ttls: config.cache,
            clock,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Serves `key` from the cache, or runs `fetch` and caches its result for `ttl`.
    fn cached<T, F>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Arc<T>, ManutError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, ManutError>,
    {
        if let Some(hit) = self.cache.get(key) {
            if let Ok(value) = hit.downcast::<T>() {
                return Ok(value);
            }
        }
        // A write that lands while `fetch` runs bumps the generation, and the
        // snapshot is then handed to this caller only.
        let generation = self.cache.generation(key);
        let value = Arc::new(fetch()?);
        self.cache
            .set_if_current(key, generation, value.clone() as Payload, ttl);
        Ok(value)
    }

    fn invalidate(&self, keys: &[&str]) {
        for key in keys {
            self.cache.delete(key);
        }
    }

    // ---- tickets ----

    /// Opens a ticket under the next free number and returns that number.
    pub fn create(&self, draft: NewTicket) -> Result<u32, ManutError> {
        let draft = draft.validated()?;
        let today = self.clock.today();
        let number = self
            .allocator
            .allocate(&self.repo, |n| Ticket::open(n, &draft, today))?;
        self.invalidate(&[TICKETS_KEY]);
        info!(number, area = %draft.area, responsible = %draft.responsible, "ticket opened");
        Ok(number)
    }

    /// Opens a ticket under a caller-chosen number. A taken number is a conflict, not retried.
    pub fn create_with_number(&self, number: u32, draft: NewTicket) -> Result<u32, ManutError> {
        if number == 0 {
            return Err(ManutError::Validation(
                "ticket number must be positive".into(),
            ));
        }
        let draft = draft.validated()?;
        let ticket = Ticket::open(number, &draft, self.clock.today());
        self.repo
            .insert_ticket(&ticket)
            .map_err(conflict(format!("ticket #{number}")))?;
        self.invalidate(&[TICKETS_KEY]);
        info!(number, area = %draft.area, "ticket opened with explicit number");
        Ok(number)
    }

    /// Parses `label` and moves the ticket to that status.
    pub fn update_status(&self, number: u32, label: &str) -> Result<Transition, ManutError> {
        let status = LifecycleEngine::parse(label)?;
        self.set_status(number, status)
    }

    /// Moves the ticket to `status`, stamping or clearing the completion date.
    pub fn set_status(&self, number: u32, status: TicketStatus) -> Result<Transition, ManutError> {
        let mut ticket = self
            .repo
            .get_ticket(number)?
            .ok_or(ManutError::TicketNotFound(number))?;
        let transition = LifecycleEngine::apply(&mut ticket, status, self.clock.today());
        let update = StatusUpdate {
            status: ticket.status,
            completed_on: ticket.completed_on,
        };
        if !self.repo.update_ticket(number, &update)? {
            return Err(ManutError::TicketNotFound(number));
        }
        self.invalidate(&[TICKETS_KEY]);
        info!(
            number,
            from = %transition.from,
            to = %transition.to,
            completed_on = ?transition.completed_on,
            "ticket status changed"
        );
        Ok(transition)
    }

    /// Removes the ticket. `Ok(false)` means no ticket had that number.
    pub fn delete(&self, number: u32) -> Result<bool, ManutError> {
        let removed = self.repo.delete_ticket(number)?;
        self.invalidate(&[TICKETS_KEY]);
        if removed {
            info!(number, "ticket deleted");
        } else {
            debug!(number, "delete matched no ticket");
        }
        Ok(removed)
    }

    /// All tickets with branch names resolved, newest first.
    pub fn list(&self) -> Result<Vec<TicketView>, ManutError> {
        let views = self.cached(TICKETS_KEY, self.ttls.tickets(), || {
            let tickets = self.repo.list_tickets()?;
            let names: HashMap<String, String> = self
                .repo
                .list_branches()?
                .into_iter()
                .map(|b| (b.cnpj, b.name))
                .collect();
            Ok(tickets
                .into_iter()
                .map(|ticket| {
                    let branch_name = ticket.branch.as_ref().and_then(|c| names.get(c).cloned());
                    TicketView {
                        ticket,
                        branch_name,
                    }
                })
                .collect::<Vec<_>>())
        })?;
        Ok(views.to_vec())
    }

    /// Reads one ticket straight from the store.
    pub fn get(&self, number: u32) -> Result<TicketView, ManutError> {
        let ticket = self
            .repo
            .get_ticket(number)?
            .ok_or(ManutError::TicketNotFound(number))?;
        let branch_name = match &ticket.branch {
            Some(cnpj) => self
                .branches()?
                .iter()
                .find(|b| &b.cnpj == cnpj)
                .map(|b| b.name.clone()),
            None => None,
        };
        Ok(TicketView {
            ticket,
            branch_name,
        })
    }

    pub fn statistics(&self) -> Result<TicketStatistics, ManutError> {
        Ok(TicketStatistics::from_tickets(
            &self.list()?,
            self.clock.today(),
        ))
    }

    /// Per-responsible workload, busiest first.
    pub fn performance_report(&self) -> Result<Vec<ResponsiblePerformance>, ManutError> {
        Ok(ResponsiblePerformance::from_tickets(&self.list()?))
    }

    /// Tickets opened between `from` and `to`, both inclusive.
    pub fn period_report(&self, from: NaiveDate, to: NaiveDate) -> Result<PeriodReport, ManutError> {
        PeriodReport::from_tickets(&self.list()?, from, to)
    }

    // ---- roster ----

    pub fn create_employee(
        &self,
        registration: u32,
        name: &str,
        role: &str,
    ) -> Result<Employee, ManutError> {
        let employee = Employee::new(registration, name, role)?;
        self.repo
            .insert_employee(&employee)
            .map_err(conflict(format!("employee {registration}")))?;
        self.invalidate(&[EMPLOYEES_KEY, RESPONSIBLE_NAMES_KEY]);
        info!(registration, name = %employee.name, "employee registered");
        Ok(employee)
    }

    pub fn delete_employee(&self, registration: u32) -> Result<bool, ManutError> {
        let removed = self.repo.delete_employee(registration)?;
        self.invalidate(&[EMPLOYEES_KEY, RESPONSIBLE_NAMES_KEY]);
        if removed {
            info!(registration, "employee removed");
        }
        Ok(removed)
    }

    pub fn list_employees(&self) -> Result<Vec<Employee>, ManutError> {
        let employees = self.cached(EMPLOYEES_KEY, self.ttls.employees(), || {
            Ok(self.repo.list_employees()?)
        })?;
        Ok(employees.to_vec())
    }

    /// Employee names offered as responsible parties.
    pub fn list_responsible_names(&self) -> Result<Vec<String>, ManutError> {
        let names = self.cached(RESPONSIBLE_NAMES_KEY, self.ttls.employees(), || {
            Ok(self
                .repo
                .list_employees()?
                .into_iter()
                .map(|e| e.name)
                .collect::<Vec<_>>())
        })?;
        Ok(names.to_vec())
    }

    pub fn create_company(&self, cnpj: &str, legal_name: &str) -> Result<Company, ManutError> {
        let company = Company::new(cnpj, legal_name)?;
        self.repo
            .insert_company(&company)
            .map_err(conflict(format!("company {}", validate::format_cnpj(&company.cnpj))))?;
        self.invalidate(&[COMPANIES_KEY]);
        info!(cnpj = %company.cnpj, legal_name = %company.legal_name, "company registered");
        Ok(company)
    }

    pub fn delete_company(&self, cnpj: &str) -> Result<bool, ManutError> {
        let cnpj = validate::cnpj(cnpj)?;
        let removed = self.repo.delete_company(&cnpj)?;
        self.invalidate(&[COMPANIES_KEY]);
        if removed {
            info!(cnpj = %cnpj, "company removed");
        }
        Ok(removed)
    }

    pub fn list_companies(&self) -> Result<Vec<Company>, ManutError> {
        let companies = self.cached(COMPANIES_KEY, self.ttls.companies(), || {
            Ok(self.repo.list_companies()?)
        })?;
        Ok(companies.to_vec())
    }

    pub fn create_branch(&self, cnpj: &str, name: &str) -> Result<Branch, ManutError> {
        let branch = Branch::new(cnpj, name)?;
        self.repo
            .insert_branch(&branch)
            .map_err(conflict(format!("branch {}", validate::format_cnpj(&branch.cnpj))))?;
        // Ticket views embed branch names.
        self.invalidate(&[BRANCHES_KEY, TICKETS_KEY]);
        info!(cnpj = %branch.cnpj, name = %branch.name, "branch registered");
        Ok(branch)
    }

    pub fn delete_branch(&self, cnpj: &str) -> Result<bool, ManutError> {
        let cnpj = validate::cnpj(cnpj)?;
        let removed = self.repo.delete_branch(&cnpj)?;
        self.invalidate(&[BRANCHES_KEY, TICKETS_KEY]);
        if removed {
            info!(cnpj = %cnpj, "branch removed");
        }
        Ok(removed)
    }

    pub fn list_branches(&self) -> Result<Vec<Branch>, ManutError> {
        Ok(self.branches()?.to_vec())
    }

    fn branches(&self) -> Result<Arc<Vec<Branch>>, ManutError> {
        self.cached(BRANCHES_KEY, self.ttls.branches(), || {
            Ok(self.repo.list_branches()?)
        })
    }

    // ---- cache administration ----

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached listing, e.g. after the database was restored.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("cache cleared");
    }
}
