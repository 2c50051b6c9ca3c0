//! One run: list both trees, reconcile, confirm, apply, record

use std::path::PathBuf;

use chrono::Local;

use crate::apply::{ApplyReport, Applier};
use crate::config::SyncConfig;
use crate::event::{Observer, SyncEvent};
use crate::marker;
use crate::plan::{Confirm, SyncPlan};
use crate::reconcile::{FsTimestamps, Reconciler, Timestamps};
use crate::scan::{Listing, Scanner};

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The confirmer declined; nothing was touched
    Rejected { plan: SyncPlan },
    /// The plan was applied
    Applied {
        plan: SyncPlan,
        report: ApplyReport,
        /// Marker path, if it was written
        marker: Option<PathBuf>,
    },
}

impl RunOutcome {
    #[must_use]
    pub fn plan(&self) -> &SyncPlan {
        match self {
            Self::Rejected { plan } | Self::Applied { plan, .. } => plan,
        }
    }

    #[must_use]
    pub fn report(&self) -> Option<&ApplyReport> {
        match self {
            Self::Rejected { .. } => None,
            Self::Applied { report, .. } => Some(report),
        }
    }
}

/// Drives a one-way sync from `config.input_root` to `config.output_root`
pub struct Synchronizer<T = FsTimestamps> {
    config: SyncConfig,
    timestamps: T,
}

impl Synchronizer {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self::with_timestamps(config, FsTimestamps)
    }
}

impl<T: Timestamps> Synchronizer<T> {
    /// Use a custom modification-time source
    #[must_use]
    pub fn with_timestamps(config: SyncConfig, timestamps: T) -> Self {
        Self { config, timestamps }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// List the input and output trees
    pub fn scan(&self, observer: &mut dyn Observer) -> (Listing, Listing) {
        let input = Scanner::new(&self.config.input_root)
            .follow_links(self.config.follow_links)
            .list(observer);
        let output = Scanner::new(&self.config.output_root)
            .follow_links(self.config.follow_links)
            .list(observer);
        (input, output)
    }

    /// Compute the plan without touching anything
    pub fn plan(&self, observer: &mut dyn Observer) -> SyncPlan {
        let (input, output) = self.scan(observer);
        let plan = Reconciler::new(self.config.tolerance).plan(
            &input,
            &output,
            &self.timestamps,
            observer,
        );
        tracing::info!(
            input_files = input.len(),
            output_files = output.len(),
            to_copy = plan.to_copy().len(),
            to_delete = plan.to_delete().len(),
            "plan ready"
        );
        plan
    }

    /// Apply a confirmed plan
    pub fn apply(&self, plan: &SyncPlan, observer: &mut dyn Observer) -> ApplyReport {
        Applier::new(self.config.delete_policy).apply(
            plan,
            &self.config.input_root,
            &self.config.output_root,
            observer,
        )
    }

    /// Write the last-sync marker; failures are reported, never returned
    pub fn record_completion(&self, observer: &mut dyn Observer) -> Option<PathBuf> {
        match marker::record_completion(&self.config.input_root, Local::now()) {
            Ok(path) => {
                observer.event(SyncEvent::MarkerWritten { path: &path });
                Some(path)
            }
            Err(err) => {
                let message = err.to_string();
                observer.event(SyncEvent::MarkerFailed {
                    path: &marker::marker_path(&self.config.input_root),
                    error: &message,
                });
                None
            }
        }
    }

    /// Full run
    ///
    /// An empty plan is accepted without asking. A rejected plan ends the
    /// run before any filesystem mutation. The marker is only written after
    /// an apply that was not aborted.
    pub fn run(&self, confirm: &mut impl Confirm, observer: &mut dyn Observer) -> RunOutcome {
        let plan = self.plan(observer);

        if !plan.is_empty() && !confirm.confirm(&plan) {
            tracing::info!("plan rejected");
            return RunOutcome::Rejected { plan };
        }

        let report = self.apply(&plan, observer);
        let marker = if report.is_aborted() {
            None
        } else {
            self.record_completion(observer)
        };

        RunOutcome::Applied {
            plan,
            report,
            marker,
        }
    }
}
