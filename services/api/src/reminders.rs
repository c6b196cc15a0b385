//! Scheduled payment reminders
//!
//! A cron job inside the API process picks up due reminders, renders the
//! message for how many were already sent and hands it to a [`Notifier`].

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger::reminders::{NextReminder, ReminderMessage, is_deliverable, next_reminder, render};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::models::reminder::Reminder;
use crate::repositories::ReminderRepository;
use crate::settings;

/// Delivery channel for reminder messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, message: &ReminderMessage) -> Result<()>;
}

/// Writes reminders to the log instead of sending them anywhere
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, message: &ReminderMessage) -> Result<()> {
        info!("Reminder for {}: {}\n{}", user_id, message.subject, message.text);
        Ok(())
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    /// The sweep ran during quiet hours and did nothing
    pub quiet: bool,
}

#[derive(Clone)]
pub struct ReminderSweeper {
    repository: ReminderRepository,
    notifier: Arc<dyn Notifier>,
    settings: settings::Reminders,
}

impl ReminderSweeper {
    pub fn new(
        repository: ReminderRepository,
        notifier: Arc<dyn Notifier>,
        settings: settings::Reminders,
    ) -> Self {
        Self {
            repository,
            notifier,
            settings,
        }
    }

    /// Send every due reminder, up to the configured batch size
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        if self.settings.quiet_hours().contains(now) {
            info!("Quiet hours, skipping reminder sweep");
            return Ok(SweepReport {
                quiet: true,
                ..SweepReport::default()
            });
        }

        let due = self.repository.due(now, self.settings.batch_size).await?;
        let mut report = SweepReport {
            total: due.len(),
            ..SweepReport::default()
        };

        for (index, reminder) in due.iter().enumerate() {
            if !is_deliverable(&reminder.debtor_user_id) {
                warn!("Skipping reminder for undeliverable user {}", reminder.debtor_user_id);
                report.skipped += 1;
                continue;
            }

            match self.deliver(reminder, now).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    error!("Failed to send reminder {}: {}", reminder.id, e);
                    report.failed += 1;
                }
            }

            if self.settings.delay_ms > 0 && index + 1 < due.len() {
                sleep(Duration::from_millis(self.settings.delay_ms)).await;
            }
        }

        info!(
            "Reminder sweep done: {} sent, {} failed, {} skipped of {}",
            report.sent, report.failed, report.skipped, report.total
        );

        Ok(report)
    }

    async fn deliver(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<()> {
        let message = render(
            reminder.reminder_count,
            &reminder.group_name,
            reminder.amount_cents,
            &reminder.creditor_user_name,
        );
        self.notifier.notify(&reminder.debtor_user_id, &message).await?;

        let sent = reminder.reminder_count + 1;
        let next_at = match next_reminder(sent, now) {
            NextReminder::At(at) => Some(at),
            NextReminder::Exhausted => None,
        };

        self.repository.record_sent(reminder.id, sent, next_at, now).await
    }

    /// Register the sweep on its cron schedule and start the scheduler
    pub async fn start(self) -> Result<JobScheduler> {
        let schedule = self.settings.schedule.clone();
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule.as_str(), move |_, _| {
            let sweeper = self.clone();
            Box::pin(async move {
                if let Err(e) = sweeper.sweep(Utc::now()).await {
                    error!("Reminder sweep failed: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started reminder scheduler with schedule: {}", schedule);
        Ok(scheduler)
    }
}
