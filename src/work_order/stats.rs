use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::ticket::{Ticket, TicketStatus, TicketView};
use crate::error::ManutError;

/// Tickets opened within this many days of today count as recent.
pub const RECENT_WINDOW_DAYS: u64 = 30;

fn resolution_days(t: &Ticket) -> Option<f64> {
    match (t.status, t.completed_on) {
        (TicketStatus::Completed, Some(done)) => Some((done - t.opened_on).num_days() as f64),
        _ => None,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Aggregate figures over the current ticket listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketStatistics {
    pub total: usize,
    pub by_status: BTreeMap<TicketStatus, usize>,
    pub by_area: BTreeMap<String, usize>,
    /// Tickets opened in the last [`RECENT_WINDOW_DAYS`] days, today included.
    pub opened_recently: usize,
    /// Mean days between opening and completion for completed tickets.
    pub avg_resolution_days: Option<f64>,
}

impl TicketStatistics {
    pub fn from_tickets(tickets: &[TicketView], today: NaiveDate) -> Self {
        let mut by_status: BTreeMap<TicketStatus, usize> =
            TicketStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_area: BTreeMap<String, usize> = BTreeMap::new();
        let mut resolved = Vec::new();
        let window_start = today
            .checked_sub_days(Days::new(RECENT_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let mut opened_recently = 0;

        for view in tickets {
            let t = &view.ticket;
            *by_status.entry(t.status).or_insert(0) += 1;
            *by_area.entry(t.area.clone()).or_insert(0) += 1;
            if t.opened_on >= window_start {
                opened_recently += 1;
            }
            resolved.extend(resolution_days(t));
        }

        Self {
            total: tickets.len(),
            by_status,
            by_area,
            opened_recently,
            avg_resolution_days: mean(&resolved),
        }
    }
}

/// Workload and throughput of one responsible party.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsiblePerformance {
    pub responsible: String,
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub open: usize,
    pub avg_resolution_days: Option<f64>,
    /// Completed tickets as a percentage of `total`.
    pub completion_rate: f64,
}

impl ResponsiblePerformance {
    /// One row per responsible name, busiest first, ties by name.
    pub fn from_tickets(tickets: &[TicketView]) -> Vec<Self> {
        let mut grouped: BTreeMap<&str, (Self, Vec<f64>)> = BTreeMap::new();
        for view in tickets {
            let t = &view.ticket;
            let (row, days) = grouped.entry(t.responsible.as_str()).or_insert_with(|| {
                (
                    Self {
                        responsible: t.responsible.clone(),
                        total: 0,
                        completed: 0,
                        in_progress: 0,
                        open: 0,
                        avg_resolution_days: None,
                        completion_rate: 0.0,
                    },
                    Vec::new(),
                )
            });
            row.total += 1;
            match t.status {
                TicketStatus::Open => row.open += 1,
                TicketStatus::InProgress => row.in_progress += 1,
                TicketStatus::Completed => row.completed += 1,
                TicketStatus::Cancelled => {}
            }
            days.extend(resolution_days(t));
        }

        let mut rows: Vec<Self> = grouped
            .into_values()
            .map(|(mut row, days)| {
                row.avg_resolution_days = mean(&days);
                row.completion_rate = percent(row.completed, row.total);
                row
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total));
        rows
    }
}

/// Share of a period's tickets that fell in one area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaShare {
    pub area: String,
    pub count: usize,
    pub percent: f64,
}

/// Tickets opened between two dates, both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: usize,
    pub completed: usize,
    pub completion_rate: f64,
    pub avg_resolution_days: Option<f64>,
    /// Largest area first.
    pub by_area: Vec<AreaShare>,
}

impl PeriodReport {
    pub fn from_tickets(
        tickets: &[TicketView],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Self, ManutError> {
        if from > to {
            return Err(ManutError::Validation(format!(
                "period start {from} is after its end {to}"
            )));
        }

        let mut total = 0;
        let mut completed = 0;
        let mut resolved = Vec::new();
        let mut areas: BTreeMap<&str, usize> = BTreeMap::new();
        for view in tickets {
            let t = &view.ticket;
            if t.opened_on < from || t.opened_on > to {
                continue;
            }
            total += 1;
            if t.status == TicketStatus::Completed {
                completed += 1;
            }
            resolved.extend(resolution_days(t));
            *areas.entry(t.area.as_str()).or_insert(0) += 1;
        }

        let mut by_area: Vec<AreaShare> = areas
            .into_iter()
            .map(|(area, count)| AreaShare {
                area: area.to_string(),
                count,
                percent: percent(count, total),
            })
            .collect();
        by_area.sort_by(|a, b| b.count.cmp(&a.count));

        Ok(Self {
            from,
            to,
            total,
            completed,
            completion_rate: percent(completed, total),
            avg_resolution_days: mean(&resolved),
            by_area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_order::{LifecycleEngine, NewTicket};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn view(number: u32, area: &str, responsible: &str, opened: u32) -> TicketView {
        TicketView {
            ticket: Ticket::open(
                number,
                &NewTicket::new(area, responsible, "desc"),
                day(opened),
            ),
            branch_name: None,
        }
    }

    fn move_to(v: &mut TicketView, status: TicketStatus, on: u32) {
        LifecycleEngine::apply(&mut v.ticket, status, day(on));
    }

    /// a: Electrical/Ana, completed in 2 days; b: Electrical/Ana, completed in 6;
    /// c: Civil/Bruno, cancelled; d: Civil/Ana, open; e: Civil/Bruno, in progress.
    fn sample() -> Vec<TicketView> {
        let mut a = view(1, "Electrical", "Ana", 1);
        let mut b = view(2, "Electrical", "Ana", 1);
        let mut c = view(3, "Civil", "Bruno", 5);
        let d = view(4, "Civil", "Ana", 6);
        let mut e = view(5, "Civil", "Bruno", 20);
        move_to(&mut a, TicketStatus::Completed, 3);
        move_to(&mut b, TicketStatus::Completed, 7);
        move_to(&mut c, TicketStatus::Cancelled, 20);
        move_to(&mut e, TicketStatus::InProgress, 21);
        vec![a, b, c, d, e]
    }

    #[test]
    fn empty_listing() {
        let stats = TicketStatistics::from_tickets(&[], day(1));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.opened_recently, 0);
        assert_eq!(stats.by_status[&TicketStatus::Open], 0);
        assert!(stats.avg_resolution_days.is_none());
        assert!(ResponsiblePerformance::from_tickets(&[]).is_empty());
    }

    #[test]
    fn counts_and_average() {
        let stats = TicketStatistics::from_tickets(&sample(), day(29));
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_status[&TicketStatus::Completed], 2);
        assert_eq!(stats.by_status[&TicketStatus::Cancelled], 1);
        assert_eq!(stats.by_status[&TicketStatus::Open], 1);
        assert_eq!(stats.by_area["Civil"], 3);
        assert_eq!(stats.avg_resolution_days, Some(4.0));
    }

    #[test]
    fn recent_window_includes_its_first_day() {
        // 2024-03-02 minus 30 days is 2024-02-01.
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let stats = TicketStatistics::from_tickets(&sample(), today);
        assert_eq!(stats.opened_recently, 5);

        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let stats = TicketStatistics::from_tickets(&sample(), today);
        assert_eq!(stats.opened_recently, 3);
    }

    #[test]
    fn performance_groups_by_responsible() {
        let rows = ResponsiblePerformance::from_tickets(&sample());
        assert_eq!(rows.len(), 2);

        let ana = &rows[0];
        assert_eq!(ana.responsible, "Ana");
        assert_eq!((ana.total, ana.completed, ana.in_progress, ana.open), (3, 2, 0, 1));
        assert_eq!(ana.avg_resolution_days, Some(4.0));
        assert!((ana.completion_rate - 200.0 / 3.0).abs() < 1e-9);

        let bruno = &rows[1];
        assert_eq!((bruno.total, bruno.completed, bruno.in_progress), (2, 0, 1));
        assert!(bruno.avg_resolution_days.is_none());
        assert_eq!(bruno.completion_rate, 0.0);
    }

    #[test]
    fn period_report_is_inclusive_and_ranks_areas() {
        let report = PeriodReport::from_tickets(&sample(), day(1), day(6)).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.completed, 2);
        assert_eq!(report.completion_rate, 50.0);
        assert_eq!(report.avg_resolution_days, Some(4.0));
        assert_eq!(
            report.by_area,
            vec![
                AreaShare {
                    area: "Civil".into(),
                    count: 2,
                    percent: 50.0
                },
                AreaShare {
                    area: "Electrical".into(),
                    count: 2,
                    percent: 50.0
                },
            ]
        );
    }

    #[test]
    fn empty_and_inverted_periods() {
        let report = PeriodReport::from_tickets(&sample(), day(25), day(28)).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.completion_rate, 0.0);
        assert!(report.by_area.is_empty());

        assert!(matches!(
            PeriodReport::from_tickets(&sample(), day(6), day(1)),
            Err(ManutError::Validation(_))
        ));
    }
}
