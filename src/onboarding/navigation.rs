use chrono::Utc;

use super::planner::reconcile_position;
use super::store::{CURRENT_ONBOARDING_VERSION, OnboardingRecord};
use super::types::*;
use super::wizard::WizardOrchestrator;
use crate::error::WizardError;

impl WizardOrchestrator {
    /// Show the current page. Idempotent.
    pub fn open(&mut self) {
        self.on_page_entered(self.current_page());
    }

    /// Advance to the next page. On the last page this finishes onboarding
    /// instead of moving.
    pub fn advance(&mut self) -> Navigation {
        if self.is_last_page() {
            if let Err(e) = self.finish() {
                tracing::warn!("{}", e);
            }
            return Navigation::Finished;
        }
        self.move_to(self.position + 1)
    }

    /// Go back one page. No-op on the first page.
    pub fn back(&mut self) -> Navigation {
        if self.position == 0 {
            return Navigation::Unchanged;
        }
        self.move_to(self.position - 1)
    }

    /// Re-plan pages after the connection mode or bootstrap state changed.
    ///
    /// The user stays on the same page when it is still part of the flow;
    /// otherwise they land at the same index, clamped to the last page.
    pub fn on_mode_changed(&mut self, mode: ConnectionMode, needs_bootstrap: bool) -> Navigation {
        let page = self.current_page();
        let index = self.position;
        self.mode = mode;
        self.needs_bootstrap = needs_bootstrap;

        let order = self.page_order();
        self.position = reconcile_position(page, index, &order);
        tracing::debug!(
            "Re-planned for {} mode (bootstrap={}): {} pages, at {}",
            mode,
            needs_bootstrap,
            order.len(),
            order[self.position]
        );

        self.show_current();
        if order[self.position] == page {
            Navigation::Unchanged
        } else {
            Navigation::Moved(order[self.position])
        }
    }

    /// The host is now showing `page`. Re-entering the visible page only
    /// re-checks monitors; it never starts a second one. Pages outside the
    /// current order are ignored.
    pub fn on_page_entered(&mut self, page: WizardPage) {
        let Some(index) = self.page_order().iter().position(|p| *p == page) else {
            tracing::debug!("Ignoring entry to {}: not in the {} page order", page, self.mode);
            return;
        };
        self.position = index;

        match self.visible {
            Some(current) if current == page => {}
            Some(current) => {
                self.exit_page(current);
                self.visible = Some(page);
                self.enter_page(page);
            }
            None => {
                self.visible = Some(page);
                self.enter_page(page);
            }
        }
        self.reconcile_monitors();
    }

    /// The host stopped showing `page`. Ignored unless it is the visible one.
    pub fn on_page_exited(&mut self, page: WizardPage) {
        if self.visible != Some(page) {
            return;
        }
        self.exit_page(page);
        self.visible = None;
        self.reconcile_monitors();
    }

    fn move_to(&mut self, position: usize) -> Navigation {
        self.position = position;
        self.show_current();
        Navigation::Moved(self.current_page())
    }

    /// Keep the visible page in step with the position while the wizard
    /// is open.
    fn show_current(&mut self) {
        if self.visible.is_some() {
            self.on_page_entered(self.current_page());
        }
    }

    /// Mark onboarding complete and persist it.
    pub fn finish(&mut self) -> Result<(), WizardError> {
        if !self.finished {
            tracing::info!("Onboarding session {} finished", self.session_id);
            self.finished = true;
        }
        self.persist_completion()
    }

    fn persist_completion(&mut self) -> Result<(), WizardError> {
        if self.completion_persisted {
            return Ok(());
        }
        let record = OnboardingRecord {
            seen: true,
            version: CURRENT_ONBOARDING_VERSION,
            completed_at: Some(Utc::now()),
        };
        self.collaborators
            .store
            .save(&record)
            .map_err(WizardError::Persistence)?;
        self.completion_persisted = true;
        Ok(())
    }

    /// Tear the session down: every monitor stops, queued results are
    /// dropped, and per-session flags start over. A completion that failed
    /// to persist earlier is retried here.
    pub fn close(&mut self) {
        if let Some(page) = self.visible.take() {
            self.exit_page(page);
        }
        let stopped = self.monitors.len();
        self.monitors.clear();
        let dropped = self.drain_events();
        tracing::debug!(
            "Closed wizard: stopped {} monitors, dropped {} queued results",
            stopped,
            dropped
        );

        self.auth.reset();
        self.position = 0;
        self.peer_probe = None;
        self.permissions = None;
        self.did_auto_kickoff = false;
        self.pending_kickoff = false;
        self.show_advanced_connection = false;

        if self.finished
            && let Err(e) = self.persist_completion()
        {
            tracing::warn!("{}", e);
        }
    }
}
