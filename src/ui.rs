//! Saída de terminal do manut: tabelas simples com cores.
//!
//! Usa a crate `console` para estilização. Mensagens de sucesso em verde,
//! avisos em amarelo e erros em vermelho, como no restante da CLI.

use console::Style;

use manut::cache::CacheStats;
use manut::validate::format_cnpj;
use manut::work_order::{
    Branch, Company, Employee, PeriodReport, RECENT_WINDOW_DAYS, ResponsiblePerformance,
    TicketStatistics, TicketStatus, TicketView, Transition,
};

/// Estilos usados pela saída da CLI.
pub struct Printer {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl Printer {
    fn status_style(&self, status: TicketStatus) -> &Style {
        match status {
            TicketStatus::Open => &self.yellow,
            TicketStatus::InProgress => &self.dim,
            TicketStatus::Completed => &self.green,
            TicketStatus::Cancelled => &self.red,
        }
    }

    pub fn success(&self, message: &str) {
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn warning(&self, message: &str) {
        println!("  {} {message}", self.yellow.apply_to("!"));
    }

    pub fn error(&self, message: &str) {
        eprintln!("  {} {message}", self.red.apply_to("✗"));
    }

    pub fn tickets(&self, views: &[TicketView]) {
        if views.is_empty() {
            self.warning("No tickets");
            return;
        }
        println!(
            "{}",
            self.dim.apply_to(format!(
                "{:>6}  {:<10}  {:<14}  {:<10}  {:<20}  {}",
                "#", "Opened", "Area", "Status", "Responsible", "Description"
            ))
        );
        for v in views {
            let t = &v.ticket;
            println!(
                "{:>6}  {:<10}  {:<14}  {:<10}  {:<20}  {}",
                t.number,
                t.opened_on,
                t.area,
                self.status_style(t.status).apply_to(t.status),
                t.responsible,
                t.description
            );
        }
    }

    pub fn ticket(&self, view: &TicketView) {
        let t = &view.ticket;
        println!("Ticket #{}", t.number);
        println!("  Opened:      {}", t.opened_on);
        println!("  Area:        {}", t.area);
        println!(
            "  Status:      {}",
            self.status_style(t.status).apply_to(t.status)
        );
        println!("  Responsible: {}", t.responsible);
        println!("  Description: {}", t.description);
        match (&t.branch, &view.branch_name) {
            (Some(cnpj), Some(name)) => println!("  Branch:      {name} ({})", format_cnpj(cnpj)),
            (Some(cnpj), None) => println!("  Branch:      {}", format_cnpj(cnpj)),
            _ => {}
        }
        if let Some(done) = t.completed_on {
            println!("  Completed:   {done}");
        }
    }

    pub fn transition(&self, t: &Transition) {
        let done = t
            .completed_on
            .map(|d| format!(" (completed on {d})"))
            .unwrap_or_default();
        self.success(&format!(
            "Ticket #{}: {} → {}{done}",
            t.number,
            t.from,
            self.status_style(t.to).apply_to(t.to)
        ));
    }

    pub fn statistics(&self, stats: &TicketStatistics) {
        println!("Total tickets: {}", stats.total);
        for (status, count) in &stats.by_status {
            println!("  {:<12} {count}", self.status_style(*status).apply_to(status));
        }
        if !stats.by_area.is_empty() {
            println!("By area:");
            for (area, count) in &stats.by_area {
                println!("  {area:<12} {count}");
            }
        }
        println!(
            "Opened in the last {RECENT_WINDOW_DAYS} days: {}",
            stats.opened_recently
        );
        if let Some(days) = stats.avg_resolution_days {
            println!("Average resolution: {days:.1} days");
        }
    }

    pub fn performance(&self, rows: &[ResponsiblePerformance]) {
        if rows.is_empty() {
            self.warning("No tickets");
            return;
        }
        println!(
            "{}",
            self.dim.apply_to(format!(
                "{:<20}  {:>5}  {:>5}  {:>5}  {:>5}  {:>6}  {}",
                "Responsible", "Total", "Done", "Doing", "Open", "Rate", "Avg days"
            ))
        );
        for r in rows {
            let avg = r
                .avg_resolution_days
                .map(|d| format!("{d:.1}"))
                .unwrap_or_else(|| "-".into());
            println!(
                "{:<20}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5.1}%  {avg}",
                r.responsible, r.total, r.completed, r.in_progress, r.open, r.completion_rate
            );
        }
    }

    pub fn period(&self, report: &PeriodReport) {
        println!("Period {} to {}", report.from, report.to);
        println!(
            "  Tickets: {}  completed: {} ({:.1}%)",
            report.total, report.completed, report.completion_rate
        );
        if let Some(days) = report.avg_resolution_days {
            println!("  Average resolution: {days:.1} days");
        }
        for share in &report.by_area {
            println!("  {:<14} {:>4}  {:>5.1}%", share.area, share.count, share.percent);
        }
    }

    pub fn cache(&self, stats: &CacheStats) {
        println!(
            "{}",
            self.dim.apply_to(format!(
                "cache: {} entries ({} valid, {} expired)",
                stats.total, stats.valid, stats.expired
            ))
        );
    }

    pub fn employees(&self, employees: &[Employee]) {
        if employees.is_empty() {
            self.warning("No employees");
        }
        for e in employees {
            println!("{:>8}  {:<30}  {}", e.registration, e.name, e.role);
        }
    }

    pub fn companies(&self, companies: &[Company]) {
        if companies.is_empty() {
            self.warning("No companies");
        }
        for c in companies {
            println!("{}  {}", format_cnpj(&c.cnpj), c.legal_name);
        }
    }

    pub fn branches(&self, branches: &[Branch]) {
        if branches.is_empty() {
            self.warning("No branches");
        }
        for b in branches {
            println!("{}  {}", format_cnpj(&b.cnpj), b.name);
        }
    }
}
