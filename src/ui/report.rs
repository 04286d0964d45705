//! Worker reports rendered as status lines

use super::output::{Line, Mark};
use crate::worker::{ActivateReport, FetchOutcome, InstallReport};
use console::style;

/// Lines for a finished install handler
pub fn install_lines(report: &InstallReport) -> Vec<Line> {
    let mark = if report.is_complete() { Mark::Ok } else { Mark::Warn };
    let mut lines = vec![Line::new(mark, format!("Pre-cached into {}", report.generation))
        .with_detail(format!("{}/{}", report.stored.len(), report.total))];
    lines.extend(
        report
            .failures
            .iter()
            .map(|(url, reason)| Line::new(Mark::Warn, url.as_str()).with_detail(reason.as_str())),
    );
    lines
}

/// Closing message for an install
pub fn install_summary(report: &InstallReport) -> (Mark, String) {
    if report.is_complete() {
        (Mark::Ok, "Worker installed".to_string())
    } else {
        (
            Mark::Warn,
            format!(
                "Worker installed with {} of {} entries missing",
                report.failures.len(),
                report.total
            ),
        )
    }
}

/// Lines for a finished activate handler
pub fn activation_lines(report: &ActivateReport) -> Vec<Line> {
    let mut lines = vec![Line::new(Mark::Ok, format!("Activated {}", report.generation))];
    for name in &report.deleted {
        lines.push(Line::new(Mark::Info, format!("Deleted old cache: {}", name)));
    }
    for (name, reason) in &report.failed {
        lines.push(Line::new(Mark::Fail, format!("Could not delete {}", name)).with_detail(reason.as_str()));
    }
    if report.claimed > 0 {
        lines.push(Line::new(Mark::Info, format!("{} open page(s) claimed", report.claimed)));
    }
    lines
}

/// Closing message for an activation
pub fn activation_summary(report: &ActivateReport) -> (Mark, String) {
    if report.failed.is_empty() {
        (Mark::Ok, "Activation complete".to_string())
    } else {
        (
            Mark::Warn,
            format!("Activation complete; {} old cache(s) remain", report.failed.len()),
        )
    }
}

/// One-line summary of where a fetch was answered from
pub fn fetch_status(outcome: &FetchOutcome, url: &str) -> String {
    let source = outcome.source();
    let label = match outcome {
        FetchOutcome::CacheHit(_) => style(source).green(),
        FetchOutcome::Network { stored: true, .. } => style(source).cyan(),
        FetchOutcome::Network { .. } | FetchOutcome::Bypassed(_) => style(source).yellow(),
        FetchOutcome::Unavailable { .. } => style(source).red(),
    };
    match outcome.response() {
        Some(response) => format!("{} {} {}", label, response.status, style(url).dim()),
        None => format!("{} {}", label, style(url).dim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Response;

    #[test]
    fn partial_install_warns_per_entry() {
        let report = InstallReport {
            generation: "finance-tracker-v4".to_string(),
            total: 3,
            stored: vec!["./".to_string(), "./index.html".to_string()],
            failures: vec![("./missing.js".to_string(), "HTTP 404".to_string())],
        };

        let lines = install_lines(&report);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].mark, Mark::Warn);
        assert_eq!(lines[0].detail.as_deref(), Some("2/3"));
        assert_eq!(lines[1].message, "./missing.js");

        let (mark, message) = install_summary(&report);
        assert_eq!(mark, Mark::Warn);
        assert_eq!(message, "Worker installed with 1 of 3 entries missing");
    }

    #[test]
    fn activation_lists_deleted_and_failed() {
        let report = ActivateReport {
            generation: "finance-tracker-v4".to_string(),
            deleted: vec!["finance-tracker-v2".to_string()],
            failed: vec![("finance-tracker-v3".to_string(), "busy".to_string())],
            claimed: 0,
        };

        let marks: Vec<Mark> = activation_lines(&report).iter().map(|l| l.mark).collect();
        assert_eq!(marks, vec![Mark::Ok, Mark::Info, Mark::Fail]);
        assert_eq!(activation_summary(&report).0, Mark::Warn);
    }

    #[test]
    fn fetch_status_names_source_and_status() {
        console::set_colors_enabled(false);
        let hit = FetchOutcome::CacheHit(Response::new(200, b"x".to_vec()));
        assert_eq!(fetch_status(&hit, "http://app.test/"), "cache 200 http://app.test/");

        let down = FetchOutcome::Unavailable {
            reason: "offline".to_string(),
        };
        assert_eq!(fetch_status(&down, "http://app.test/x"), "unavailable http://app.test/x");
    }
}
