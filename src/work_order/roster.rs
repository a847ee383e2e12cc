use serde::{Deserialize, Serialize};

use crate::error::ManutError;
use crate::validate;

/// A technician who can be named as responsible for a work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub registration: u32,
    pub name: String,
    pub role: String,
}

impl Employee {
    pub fn new(registration: u32, name: &str, role: &str) -> Result<Self, ManutError> {
        Ok(Self {
            registration: validate::registration(registration)?,
            name: validate::required("name", name)?,
            role: role.trim().to_string(),
        })
    }
}

/// A client company, keyed by its normalized CNPJ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub cnpj: String,
    pub legal_name: String,
}

impl Company {
    pub fn new(cnpj: &str, legal_name: &str) -> Result<Self, ManutError> {
        Ok(Self {
            cnpj: validate::cnpj(cnpj)?,
            legal_name: validate::required("legal name", legal_name)?,
        })
    }
}

/// A company branch, keyed by its normalized CNPJ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub cnpj: String,
    pub name: String,
}

impl Branch {
    pub fn new(cnpj: &str, name: &str) -> Result<Self, ManutError> {
        Ok(Self {
            cnpj: validate::cnpj(cnpj)?,
            name: validate::required("name", name)?,
        })
    }
}
