mod lifecycle;
mod roster;
mod stats;
mod ticket;

pub use lifecycle::{LifecycleEngine, Transition};
pub use roster::{Branch, Company, Employee};
pub use stats::{
    AreaShare, PeriodReport, RECENT_WINDOW_DAYS, ResponsiblePerformance, TicketStatistics,
};
pub use ticket::{NewTicket, StatusUpdate, Ticket, TicketStatus, TicketView};
