use std::io::Write;
use std::sync::Arc;

use chrono::Local;
use queue_core::{
    Badge, BadgeTone, FallbackView, JobRowView, Notice, NoticeLevel, Placeholder,
    RenderedSections, SyncViewModel,
};

/// One-way notifications from the sync engine to whatever draws the panel.
pub trait ViewSink {
    fn on_snapshot_change(&mut self, sections: &RenderedSections);
    fn on_badge_change(&mut self, badge: Badge);
    fn on_fallback(&mut self, view: &FallbackView);
    fn on_placeholders_change(&mut self, items: &[Placeholder]);
    fn on_active_count(&mut self, count: usize);
    fn on_loading(&mut self, loading: bool);
    fn on_notice(&mut self, notice: &Notice);
    fn on_notice_cleared(&mut self);
    fn on_status(&mut self, view: &SyncViewModel);
}

pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Prints every notification as timestamped plain text.
pub struct ConsoleView<W: Write> {
    out: W,
    clock: Clock,
}

impl ConsoleView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(
            std::io::stdout(),
            Arc::new(|| Local::now().format("%H:%M:%S").to_string()),
        )
    }
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W, clock: Clock) -> Self {
        Self { out, clock }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let stamp = (self.clock)();
        // A closed stdout is not worth failing the loop over.
        let _ = writeln!(self.out, "[{stamp}] {text}");
        let _ = self.out.flush();
    }

    fn raw(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }
}

impl<W: Write> ViewSink for ConsoleView<W> {
    fn on_snapshot_change(&mut self, sections: &RenderedSections) {
        self.line("Downloads:");
        if sections.is_empty() {
            self.raw("  No downloads.");
        }
        if !sections.placeholders.is_empty() {
            self.raw("  Queued (pending):");
            for item in &sections.placeholders {
                self.raw(&format!("    {} ({}) [pending]", item.title, item.id));
            }
        }
        for section in &sections.sections {
            self.raw(&format!("  {}:", section.heading()));
            for row in &section.rows {
                self.raw(&format!("    {}", describe_row(row)));
            }
        }
    }

    fn on_badge_change(&mut self, badge: Badge) {
        let tone = match badge.tone {
            BadgeTone::Idle => "idle",
            BadgeTone::Downloading => "downloading",
            BadgeTone::Error => "error",
        };
        self.line(&format!("Badge: {} ({tone})", badge.count));
    }

    fn on_fallback(&mut self, view: &FallbackView) {
        match view {
            FallbackView::Placeholders(items) => {
                self.line("Status unavailable; pending downloads:");
                for item in items {
                    self.raw(&format!("    {} ({}) [pending]", item.title, item.id));
                }
            }
            FallbackView::Empty { offer_retry } => {
                let hint = if *offer_retry { " Type `refresh` to retry." } else { "" };
                self.line(&format!("No downloads.{hint}"));
            }
        }
    }

    fn on_placeholders_change(&mut self, items: &[Placeholder]) {
        let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
        if titles.is_empty() {
            self.line("Pending: none");
        } else {
            self.line(&format!("Pending: {}", titles.join(", ")));
        }
    }

    fn on_active_count(&mut self, count: usize) {
        self.line(&format!("Active downloads on server: {count}"));
    }

    fn on_loading(&mut self, loading: bool) {
        if loading {
            self.line("Loading...");
        }
    }

    fn on_notice(&mut self, notice: &Notice) {
        let prefix = match notice.level {
            NoticeLevel::Subtle => "Note",
            NoticeLevel::Blocking => "Error",
        };
        let retry = if notice.offers_retry {
            " Type `refresh` to retry."
        } else {
            ""
        };
        self.line(&format!("{prefix}: {}{retry}", notice.message));
    }

    fn on_notice_cleared(&mut self) {
        self.line("Status refreshed.");
    }

    fn on_status(&mut self, view: &SyncViewModel) {
        let active = view
            .active_downloads
            .map_or_else(|| "unknown".to_string(), |count| count.to_string());
        self.line(&format!(
            "phase={:?} open={} visible={} fetching={} badge={} known_jobs={} pending={} active={}",
            view.phase,
            view.view_open,
            view.page_visible,
            view.fetching,
            view.badge.count,
            view.known_jobs,
            view.placeholders.len(),
            active,
        ));
        let shown = view
            .shown_digest
            .map_or_else(|| "none".to_string(), |digest| digest.to_string());
        self.raw(&format!(
            "  cache ttl={}ms shown={shown}",
            view.cache_ttl.as_millis()
        ));
        if let Some(notice) = &view.notice {
            self.raw(&format!("  notice: {}", notice.message));
        }
    }
}

fn describe_row(row: &JobRowView) -> String {
    let mut text = format!("{} ({})", row.title, row.id);
    if let Some(percent) = row.progress_percent {
        text.push_str(&format!(" {percent}%"));
    }
    if row.cancelled {
        text.push_str(" [cancelled]");
    }
    if row.downloadable {
        text.push_str(" [download ready]");
    }
    if row.cancellable {
        text.push_str(&format!(" [cancel {}]", row.id));
    }
    text
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use queue_core::{Job, JobState, OptimisticTracker, StatusSnapshot};

    use super::*;

    fn view() -> ConsoleView<Vec<u8>> {
        ConsoleView::new(Vec::new(), Arc::new(|| "12:00:00".to_string()))
    }

    fn output(view: ConsoleView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn snapshot_lists_sections_with_affordances() {
        let snapshot = StatusSnapshot::from_jobs([
            Job::new("d1", "Dune", JobState::Downloading).with_progress(55.4),
            Job::new("c1", "Emma", JobState::Completed).with_download_path("/srv/emma.epub"),
        ]);
        let sections = RenderedSections::build(&snapshot, &OptimisticTracker::new());
        let mut console = view();
        console.on_snapshot_change(&sections);

        assert_eq!(
            output(console),
            "[12:00:00] Downloads:\n  Downloading:\n    Dune (d1) 55% [cancel d1]\n  \
             Completed:\n    Emma (c1) [download ready]\n"
        );
    }

    #[test]
    fn cancelled_rows_are_marked() {
        let snapshot =
            StatusSnapshot::from_jobs([Job::new("x1", "Beowulf", JobState::Error).cancelled()]);
        let sections = RenderedSections::build(&snapshot, &OptimisticTracker::new());
        let mut console = view();
        console.on_snapshot_change(&sections);

        assert_eq!(
            output(console),
            "[12:00:00] Downloads:\n  Error:\n    Beowulf (x1) [cancelled]\n"
        );
    }

    #[test]
    fn empty_snapshot_says_so() {
        let mut console = view();
        console.on_snapshot_change(&RenderedSections::default());
        assert_eq!(output(console), "[12:00:00] Downloads:\n  No downloads.\n");
    }

    #[test]
    fn blocking_notice_offers_retry() {
        let mut console = view();
        console.on_notice(&Notice::load_failed());
        console.on_badge_change(Badge {
            count: 2,
            tone: BadgeTone::Downloading,
        });
        assert_eq!(
            output(console),
            "[12:00:00] Error: Error loading status. Please try again. Type `refresh` to retry.\n\
             [12:00:00] Badge: 2 (downloading)\n"
        );
    }
}
