//! Background task for polling followed diaries.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::service::diary_feed_service::CycleReport;
use crate::service::diary_feed_service::DiaryFeedService;

/// Task that runs a diary cycle every poll interval until stopped.
pub struct DiaryFeedPublisher {
    service: Arc<DiaryFeedService>,
    poll_interval: Duration,
    concurrency: usize,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DiaryFeedPublisher {
    pub fn new(
        service: Arc<DiaryFeedService>,
        poll_interval: Duration,
        concurrency: usize,
    ) -> Arc<Self> {
        info!(
            "Initializing DiaryFeedPublisher with poll interval {:?}",
            poll_interval
        );
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            service,
            poll_interval,
            concurrency,
            running: AtomicBool::new(false),
            shutdown,
            handle: Mutex::new(None),
        })
    }

    /// Starts the polling loop. The first cycle runs immediately.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Starting DiaryFeedPublisher check loop.");
        self.shutdown.send_replace(false);
        let handle = self.clone().spawn_check_loop();
        *self.handle.lock().await = Some(handle);
        Ok(())
    }

    /// Signals the loop to stop and waits for it. A cycle in flight runs to
    /// completion first.
    pub async fn stop(&self) -> anyhow::Result<()> {
        info!("Stopping DiaryFeedPublisher check loop.");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);

        if let Some(handle) = self.handle.lock().await.take() {
            handle.await?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_check_loop(self: Arc<Self>) -> JoinHandle<()> {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => {}
                }
                if *shutdown.borrow() {
                    info!("Stopping check loop.");
                    break;
                }
                if let Err(e) = self.check_updates().await {
                    error!("Error checking updates: {}", e);
                }
            }
        })
    }

    /// Runs one cycle and logs its summary.
    pub async fn check_updates(&self) -> anyhow::Result<CycleReport> {
        debug!("Checking for diary updates.");
        let report = self.service.check_updates(self.concurrency).await?;
        info!("Finished diary cycle: {report}.");
        Ok(report)
    }
}
