//! Autonomous audit scheduling.
//!
//! Holds recurring audit campaigns and, on each tick, injects due campaigns
//! into the Coordinator's improvement backlog. Back-pressure comes from the
//! Coordinator: a campaign with an item still pending or in progress is
//! skipped and stays due.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::models::AuditCampaignSchedule;
use crate::domain::MindxError;
use crate::services::{Coordinator, MemoryAgent};

/// Entity id the audit coordinator traces under.
pub const AUDIT_COORDINATOR_ID: &str = "audit_coordinator_main";

/// Periodic audit campaign scheduler.
pub struct AuditCoordinator {
    coordinator: Arc<Coordinator>,
    memory: Arc<MemoryAgent>,
    campaigns: Mutex<Vec<AuditCampaignSchedule>>,
    running: Arc<AtomicBool>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl AuditCoordinator {
    pub fn new(coordinator: Arc<Coordinator>, memory: Arc<MemoryAgent>) -> Self {
        Self {
            coordinator,
            memory,
            campaigns: Mutex::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
            loop_task: Mutex::new(None),
        }
    }

    /// Add (or replace) a recurring audit campaign. New campaigns are due
    /// immediately.
    pub async fn add_audit_campaign(
        &self,
        campaign_id: &str,
        audit_scope: &str,
        target_components: Vec<String>,
        interval_hours: i64,
        priority: u8,
    ) {
        let schedule = AuditCampaignSchedule::new(
            campaign_id,
            audit_scope,
            target_components,
            interval_hours,
            priority,
        );
        let mut campaigns = self.campaigns.lock().await;
        campaigns.retain(|c| c.campaign_id != campaign_id);
        campaigns.push(schedule);
        info!(campaign_id, audit_scope, "Audit campaign added");
    }

    /// Remove a campaign. Returns whether it existed.
    pub async fn remove_audit_campaign(&self, campaign_id: &str) -> bool {
        let mut campaigns = self.campaigns.lock().await;
        let before = campaigns.len();
        campaigns.retain(|c| c.campaign_id != campaign_id);
        campaigns.len() != before
    }

    /// Copy of all schedules.
    pub async fn list_campaigns(&self) -> Vec<AuditCampaignSchedule> {
        self.campaigns.lock().await.clone()
    }

    /// One scheduler pass: enqueue every due campaign. Returns how many
    /// items were injected.
    pub async fn tick(&self) -> usize {
        let now = Utc::now();
        let mut injected = 0;
        let mut campaigns = self.campaigns.lock().await;
        for campaign in campaigns.iter_mut() {
            if !campaign.is_due(now) {
                continue;
            }
            let directive = campaign.directive();
            let target = if campaign.target_components.is_empty() {
                "system".to_string()
            } else {
                campaign.target_components.join(",")
            };
            match self
                .coordinator
                .enqueue_campaign_item(
                    &campaign.campaign_id,
                    &directive,
                    campaign.priority,
                    &target,
                )
                .await
            {
                Ok(item_id) => {
                    campaign.mark_run(now);
                    injected += 1;
                    self.memory
                        .log_process(
                            AUDIT_COORDINATOR_ID,
                            "audit_campaign_injected",
                            json!({
                                "campaign_id": campaign.campaign_id,
                                "backlog_item_id": item_id,
                                "next_run_at": campaign.next_run_at,
                            }),
                            json!({"agent_id": AUDIT_COORDINATOR_ID}),
                        )
                        .await;
                }
                Err(MindxError::DuplicateCampaignItem(_)) => {
                    // An earlier item is still in flight: stay due, retry
                    // on a later tick.
                    debug!(campaign_id = %campaign.campaign_id, "Audit campaign still in flight; skipped");
                }
                Err(e) => {
                    warn!(campaign_id = %campaign.campaign_id, error = %e, "Audit enqueue failed");
                }
            }
        }
        injected
    }

    /// Start the periodic scheduler. No-op when already running.
    pub async fn start_autonomous_audit_loop(self: &Arc<Self>, check_interval_seconds: u64) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            info!(check_interval_seconds, "Autonomous audit loop started");
            while scheduler.running.load(Ordering::SeqCst) {
                scheduler.tick().await;
                let mut remaining = Duration::from_secs(check_interval_seconds);
                let step = Duration::from_millis(100);
                while remaining > Duration::ZERO && scheduler.running.load(Ordering::SeqCst) {
                    let sleep = remaining.min(step);
                    tokio::time::sleep(sleep).await;
                    remaining = remaining.saturating_sub(sleep);
                }
            }
        });
        *self.loop_task.lock().await = Some(handle);
    }

    /// Stop the scheduler and await its task.
    pub async fn stop_autonomous_audit_loop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.loop_task.lock().await.take() {
            let _ = handle.await;
        }
        info!("Autonomous audit loop stopped");
    }
}
