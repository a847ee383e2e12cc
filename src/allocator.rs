//! Numeração automática das ordens de serviço.
//!
//! O próximo número é sempre derivado do banco (`MAX(number) + 1`) e nunca do
//! cache. Duas alocações concorrentes podem ler o mesmo valor; a chave
//! primária do repositório rejeita a segunda inserção e o [`TicketAllocator`]
//! recalcula o número e tenta de novo, até o limite de `max_retries`.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ManutError;
use crate::store::{Repository, StoreError};
use crate::work_order::Ticket;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 5,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given retry attempt using exponential backoff.
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Hands out ticket numbers and inserts the ticket under them.
#[derive(Debug, Clone, Default)]
pub struct TicketAllocator {
    retry: RetryConfig,
}

impl TicketAllocator {
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    /// `1` for an empty store, otherwise the highest number plus one.
    pub fn next_number<R: Repository + ?Sized>(repo: &R) -> Result<u32, StoreError> {
        match repo.max_ticket_number()? {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| StoreError::Backend("ticket number space exhausted".into())),
        }
    }

    /// Allocates a number, builds the ticket with it and inserts it.
    ///
    /// A unique violation means another caller took the number first; the
    /// number is recomputed and the insert retried.
    pub fn allocate<R, F>(&self, repo: &R, build: F) -> Result<u32, ManutError>
    where
        R: Repository + ?Sized,
        F: Fn(u32) -> Ticket,
    {
        let mut retries = 0;
        loop {
            let number = Self::next_number(repo)?;
            match repo.insert_ticket(&build(number)) {
                Ok(()) => return Ok(number),
                Err(StoreError::UniqueViolation) => {
                    retries += 1;
                    if retries > self.retry.max_retries {
                        warn!(number, attempts = retries, "ticket number allocation exhausted");
                        return Err(ManutError::AllocationExhausted { attempts: retries });
                    }
                    let delay_ms = self.retry.delay_for_attempt(retries);
                    debug!(
                        number,
                        retry = retries,
                        max = self.retry.max_retries,
                        delay_ms,
                        "ticket number taken, retrying"
                    );
                    if delay_ms > 0 {
                        thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
