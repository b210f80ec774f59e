use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use gymbook_alerts::{AlertSink, Tags};
use gymbook_core::config::{BookingConfig, GymbookConfig};
use gymbook_core::types::Interest;
use gymbook_portal::{BookingSession, Portal};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    clock::Clock,
    error::{Result, SchedulerError},
    occurrence::next_scheduled_occurrence,
    pass::{is_satisfied, schedule_interests},
    types::{InterestResult, LoopState, PhaseOutcome, ScheduledOccurrence},
};

/// Long-running booking state machine.
///
/// Repeatedly picks the interest that starts soonest, sleeps until shortly
/// before its reservation window opens, then retries booking it until it is
/// held or its start time (plus grace) has passed.
pub struct BookingLoop {
    config: GymbookConfig,
    timezone: Tz,
    portal: Arc<dyn Portal>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
}

impl BookingLoop {
    /// Build a loop. Fails when the configured timezone is unknown.
    pub fn new(
        config: GymbookConfig,
        portal: Arc<dyn Portal>,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|e| SchedulerError::InvalidTimezone {
                name: config.timezone.clone(),
                reason: format!("{e}"),
            })?;

        Ok(Self {
            config,
            timezone,
            portal,
            alerts,
            clock,
        })
    }

    fn timings(&self) -> &BookingConfig {
        &self.config.booking
    }

    /// Decide what to do at `now`.
    ///
    /// No interests is [`LoopState::Idle`], not an error. A malformed interest is
    /// returned as an error and should stop the loop.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<LoopState> {
        self.plan_after(now, now)
    }

    /// Like [`plan`](Self::plan), but only considers occurrences strictly after
    /// `reference`. Used once a phase ends so the occurrence just handled is
    /// not picked again before it starts.
    fn plan_after(&self, now: DateTime<Utc>, reference: DateTime<Utc>) -> Result<LoopState> {
        let occurrence = match next_scheduled_occurrence(&self.config.interests, self.timezone, reference) {
            Ok(occurrence) => occurrence,
            Err(SchedulerError::NoInterestsConfigured) => return Ok(LoopState::Idle),
            Err(e) => return Err(e),
        };

        let start = occurrence.start_utc();
        let wake_at = start - delta(self.timings().lead_time) - delta(self.timings().early_buffer);

        if wake_at > now {
            Ok(LoopState::Waiting { occurrence, wake_at })
        } else {
            Ok(self.retrying(occurrence))
        }
    }

    fn retrying(&self, occurrence: ScheduledOccurrence) -> LoopState {
        let cutoff = occurrence.start_utc() + delta(self.timings().grace_period);
        LoopState::Retrying { occurrence, cutoff }
    }

    /// Run until `shutdown` turns `true`.
    ///
    /// Returns an error only for problems retrying cannot fix (malformed
    /// interests); those are also reported to the alert sink.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            interests = self.config.interest_count(),
            timezone = %self.timezone,
            alerts = self.alerts.name(),
            "booking loop started"
        );

        let mut state = self.replan(None)?;
        loop {
            state = match state {
                LoopState::Idle => {
                    let idle = self.timings().idle_delay;
                    info!(delay = ?idle, "no interests configured; sleeping");
                    if !self.pause(idle, &mut shutdown).await {
                        break;
                    }
                    self.replan(None)?
                }

                LoopState::Waiting { occurrence, wake_at } => {
                    info!(
                        club = %occurrence.club,
                        day = %occurrence.interest.day,
                        time = %occurrence.interest.time,
                        start = %occurrence.start.to_rfc2822(),
                        wake_at = %wake_at.with_timezone(&self.timezone).to_rfc2822(),
                        "next class scheduled"
                    );
                    let remaining = (wake_at - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
                    if !self.pause(remaining, &mut shutdown).await {
                        break;
                    }
                    self.retrying(occurrence)
                }

                LoopState::Retrying { occurrence, cutoff } => {
                    info!(
                        club = %occurrence.club,
                        day = %occurrence.interest.day,
                        time = %occurrence.interest.time,
                        "booking window open; attempting"
                    );
                    match self.retry_phase(&occurrence, cutoff, &mut shutdown).await {
                        PhaseOutcome::Shutdown => break,
                        PhaseOutcome::Satisfied { attempts } => {
                            info!(club = %occurrence.club, interest = %occurrence.interest, attempts, "interest satisfied");
                        }
                        PhaseOutcome::Missed { attempts } => {
                            info!(
                                club = %occurrence.club,
                                interest = %occurrence.interest,
                                attempts,
                                "unable to book before cutoff; will retry next occurrence"
                            );
                        }
                    }
                    self.replan(Some(occurrence.start_utc()))?
                }
            };
        }

        info!("booking loop shutting down");
        Ok(())
    }

    fn replan(&self, handled: Option<DateTime<Utc>>) -> Result<LoopState> {
        let now = self.clock.now();
        let reference = handled.map_or(now, |start| start.max(now));
        self.plan_after(now, reference).inspect_err(|e| {
            error!(error = %e, "cannot compute next occurrence");
            self.report(e, "next_interest", None);
        })
    }

    /// Attempt `occurrence` every retry delay until it is held or `cutoff`
    /// passes. One booking session is shared by every attempt in the phase.
    pub async fn retry_phase(
        &self,
        occurrence: &ScheduledOccurrence,
        cutoff: DateTime<Utc>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PhaseOutcome {
        let interests = BTreeMap::from([(occurrence.club.clone(), vec![occurrence.interest.clone()])]);
        let mut session: Option<Box<dyn BookingSession>> = None;
        let mut attempts = 0u32;

        loop {
            if self.clock.now() > cutoff {
                return PhaseOutcome::Missed { attempts };
            }
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => return PhaseOutcome::Shutdown,
                r = self.attempt(&interests, &mut session) => r,
            };

            match result {
                Ok(results) if is_satisfied(&occurrence.club, &occurrence.interest, &results) => {
                    return PhaseOutcome::Satisfied { attempts };
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, attempt = attempts, "scheduling attempt failed");
                    self.report(&e, "booking", Some(occurrence));
                }
            }

            if !self.pause(self.timings().retry_delay, shutdown).await {
                return PhaseOutcome::Shutdown;
            }
        }
    }

    /// One pass over every configured interest, with a fresh booking session.
    pub async fn run_once(&self) -> Result<Vec<InterestResult>> {
        let mut session = None;
        self.attempt(&self.config.interests, &mut session).await
    }

    async fn attempt(
        &self,
        interests: &BTreeMap<String, Vec<Interest>>,
        session: &mut Option<Box<dyn BookingSession>>,
    ) -> Result<Vec<InterestResult>> {
        let budget = self.timings().request_timeout;
        let pass = schedule_interests(
            self.portal.as_ref(),
            &self.config.credentials,
            &self.config.clubs,
            interests,
            session,
        );

        tokio::time::timeout(budget, pass)
            .await
            .map_err(|_| timed_out(budget))?
    }

    /// Sleep on the clock unless shutdown arrives first. Returns `false` on shutdown.
    async fn pause(&self, duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => false,
            _ = self.clock.sleep(duration) => true,
        }
    }

    fn report(&self, err: &SchedulerError, phase: &str, occurrence: Option<&ScheduledOccurrence>) {
        let mut tags = Tags::new();
        tags.insert("mode".to_string(), "loop".to_string());
        tags.insert("phase".to_string(), phase.to_string());
        tags.insert("code".to_string(), err.code().to_string());
        if let Some(occurrence) = occurrence {
            tags.insert("club".to_string(), occurrence.club.clone());
            tags.insert("title".to_string(), occurrence.interest.title.clone());
        }
        self.alerts.report(&err.to_string(), &tags);
    }
}

/// Resolves once the flag reads `true`. A dropped sender never resolves.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn timed_out(budget: Duration) -> SchedulerError {
    SchedulerError::Timeout {
        ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
    }
}

fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::zero())
}
