use crossterm::style::Color;

use applist::observer::{BackupObserver, LogObserver};
use applist::service::{BackupOutcome, InvocationId};
use applist::strings::Strings;
use applist::utils::file_url;

use crate::printer::{marks, Printer};

/// Reports backup runs on the terminal, events also go to the log
pub struct ConsoleObserver {
    strings: Strings,
    printer: Printer,
    log: LogObserver,
}

impl ConsoleObserver {
    pub fn new(strings: Strings) -> Self {
        Self {
            strings,
            printer: Printer::new(),
            log: LogObserver,
        }
    }

    /// Print a failure that may not belong to any run
    pub fn show_failure(&self, message: &str) {
        self.printer.clear_status();
        self.printer.eprintln_error(format!(
            "{} {}",
            marks::FAIL,
            failure_line(&self.strings, message)
        ));
    }
}

/// Title and body of the success message
pub fn success_lines(strings: &Strings, outcome: &BackupOutcome) -> (String, String) {
    let trigger = strings.label(outcome.trigger.label_key()).to_lowercase();
    let total = outcome.counts.total.to_string();
    let user = outcome.counts.user().to_string();
    let system = outcome.counts.system.to_string();
    let title = strings.format("backup_done_title", &[total.as_str(), trigger.as_str()]);
    let text = strings.format("backup_done_text", &[user.as_str(), system.as_str()]);
    (title, text)
}

/// The failure message, a missing destination gets its own label
pub fn failure_line(strings: &Strings, message: &str) -> String {
    if message == applist::Error::NoDestination.to_string() {
        return strings.label("destination_not_set_notification").into();
    }
    format!("{}: {}", strings.label("backup_failed"), message)
}

impl BackupObserver for ConsoleObserver {
    fn started(&self, id: InvocationId) {
        self.log.started(id);
        self.printer.status(self.strings.label("backup_started"));
    }

    fn progress(&self, id: InvocationId, done: usize, total: usize) {
        self.log.progress(id, done, total);
        self.printer.status(format!(
            "{} {}/{}",
            self.strings.label("in_progress"),
            done,
            total
        ));
    }

    fn succeeded(&self, id: InvocationId, outcome: &BackupOutcome) {
        self.log.succeeded(id, outcome);
        self.printer.clear_status();
        let (title, text) = success_lines(&self.strings, outcome);
        self.printer.println_colored(format!("{} {}", marks::OK, title), Color::Green);
        self.printer.println(text);
        self.printer.println(file_url(&outcome.path));
    }

    fn failed(&self, id: InvocationId, message: &str) {
        self.log.failed(id, message);
        self.show_failure(message);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use applist::report::{ReportCounts, Trigger};
    use rstest::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn outcome(trigger: Trigger) -> BackupOutcome {
        BackupOutcome {
            path: PathBuf::from("/tmp/app-list-backup-2024-03-09-17-05-59.html"),
            title: "Mar 09, 2024 17:05".into(),
            counts: ReportCounts {
                total: 42,
                system: 2,
                enabled: 40,
                excluded: 5,
            },
            trigger,
            duration: Duration::from_millis(10),
        }
    }

    #[rstest]
    #[case(Trigger::Manual, "42 apps backed up (manual)")]
    #[case(Trigger::Automatic, "42 apps backed up (automatic)")]
    fn test_success_lines(#[case] trigger: Trigger, #[case] expected: &str) {
        let (title, text) = success_lines(&Strings::new(), &outcome(trigger));
        assert_eq!(title, expected);
        assert_eq!(text, "40 user apps, 2 system apps");
    }

    #[test]
    fn test_failure_line() {
        let strings = Strings::new();
        assert_eq!(
            failure_line(&strings, "backup destination is not set"),
            "Backup destination is not set"
        );
        assert_eq!(
            failure_line(&strings, "no adb device connected"),
            "Backup failed: no adb device connected"
        );
    }
}
