//! Núcleo de ordens de serviço de manutenção.
//!
//! Numeração única e crescente das ordens, ciclo de vida de status com data
//! de conclusão derivada, e um cache em memória com TTL mantido coerente com
//! o banco por invalidação explícita.

pub mod allocator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod validate;
pub mod work_order;

pub use error::ManutError;
pub use service::TicketService;
