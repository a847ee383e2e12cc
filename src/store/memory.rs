use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Repository, StoreError, inconsistent};
use crate::work_order::{Branch, Company, Employee, StatusUpdate, Ticket};

#[derive(Default)]
struct Tables {
    tickets: BTreeMap<u32, Ticket>,
    employees: BTreeMap<u32, Employee>,
    companies: BTreeMap<String, Company>,
    branches: BTreeMap<String, Branch>,
}

/// In-process repository with the same key and consistency rules as the SQL schema.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl Repository for MemoryRepository {
    fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        if !ticket.is_consistent() {
            return Err(inconsistent(ticket.number));
        }
        let mut tables = self.tables()?;
        if tables.tickets.contains_key(&ticket.number) {
            return Err(StoreError::UniqueViolation);
        }
        tables.tickets.insert(ticket.number, ticket.clone());
        Ok(())
    }

    fn update_ticket(&self, number: u32, update: &StatusUpdate) -> Result<bool, StoreError> {
        if update.status.is_closed() != update.completed_on.is_some() {
            return Err(inconsistent(number));
        }
        let mut tables = self.tables()?;
        match tables.tickets.get_mut(&number) {
            Some(row) => {
                row.status = update.status;
                row.completed_on = update.completed_on;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_ticket(&self, number: u32) -> Result<bool, StoreError> {
        Ok(self.tables()?.tickets.remove(&number).is_some())
    }

    fn max_ticket_number(&self) -> Result<Option<u32>, StoreError> {
        Ok(self.tables()?.tickets.keys().next_back().copied())
    }

    fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let mut rows: Vec<Ticket> = self.tables()?.tickets.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.opened_on
                .cmp(&a.opened_on)
                .then_with(|| b.number.cmp(&a.number))
        });
        Ok(rows)
    }

    fn get_ticket(&self, number: u32) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tables()?.tickets.get(&number).cloned())
    }

    fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.employees.contains_key(&employee.registration) {
            return Err(StoreError::UniqueViolation);
        }
        tables
            .employees
            .insert(employee.registration, employee.clone());
        Ok(())
    }

    fn delete_employee(&self, registration: u32) -> Result<bool, StoreError> {
        Ok(self.tables()?.employees.remove(&registration).is_some())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let mut rows: Vec<Employee> = self.tables()?.employees.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    fn insert_company(&self, company: &Company) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.companies.contains_key(&company.cnpj) {
            return Err(StoreError::UniqueViolation);
        }
        tables
            .companies
            .insert(company.cnpj.clone(), company.clone());
        Ok(())
    }

    fn delete_company(&self, cnpj: &str) -> Result<bool, StoreError> {
        Ok(self.tables()?.companies.remove(cnpj).is_some())
    }

    fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        let mut rows: Vec<Company> = self.tables()?.companies.values().cloned().collect();
        rows.sort_by(|a, b| a.legal_name.cmp(&b.legal_name));
        Ok(rows)
    }

    fn insert_branch(&self, branch: &Branch) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.branches.contains_key(&branch.cnpj) {
            return Err(StoreError::UniqueViolation);
        }
        tables.branches.insert(branch.cnpj.clone(), branch.clone());
        Ok(())
    }

    fn delete_branch(&self, cnpj: &str) -> Result<bool, StoreError> {
        Ok(self.tables()?.branches.remove(cnpj).is_some())
    }

    fn list_branches(&self) -> Result<Vec<Branch>, StoreError> {
        let mut rows: Vec<Branch> = self.tables()?.branches.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}
