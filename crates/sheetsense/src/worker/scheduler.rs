//! Periodic analysis scheduler.
//!
//! At every tick each Ready descriptor is dispatched to its own worker
//! thread, so multiple files analyze concurrently. There is no worker
//! pool; runs are throttled by their remote-call latency and the tick
//! interval. Workers are detached: shutdown stops the tick loop but lets
//! in-flight runs finish or fail on their own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::debug;
use tokio::sync::broadcast;

use crate::pipeline::{AnalysisContext, Analyzer, Disposition};
use crate::worker::controller::ServiceEvent;
use crate::worker::descriptor::{AnalysisStatus, DescriptorSet};

pub struct AnalysisScheduler {
    analyzer: Arc<Analyzer>,
    descriptors: Arc<DescriptorSet>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    events: broadcast::Sender<ServiceEvent>,
}

impl AnalysisScheduler {
    pub fn new(
        analyzer: Arc<Analyzer>,
        descriptors: Arc<DescriptorSet>,
        interval: Duration,
        events: broadcast::Sender<ServiceEvent>,
    ) -> Self {
        Self {
            analyzer,
            descriptors,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Starts the tick loop in a background thread.
    /// Accepts a trigger receiver for manual analysis requests.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let analyzer = Arc::clone(&self.analyzer);
        let descriptors = Arc::clone(&self.descriptors);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;
        let events = self.events.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                interval_timer.tick().await; // skip immediate first tick

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = interval_timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            log::info!("Manual analysis pass triggered");
                        },
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    // Workers detach; the tick loop never joins them.
                    let _ = dispatch_ready(&analyzer, &descriptors, &events);
                }
            });
        })
    }

    /// Dispatches every Ready descriptor now, returning the worker handles.
    /// Used by the tick loop (handles dropped) and by one-shot callers that
    /// want to wait for completion.
    pub fn run_pending(&self) -> Vec<JoinHandle<()>> {
        dispatch_ready(&self.analyzer, &self.descriptors, &self.events)
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

fn dispatch_ready(
    analyzer: &Arc<Analyzer>,
    descriptors: &Arc<DescriptorSet>,
    events: &broadcast::Sender<ServiceEvent>,
) -> Vec<JoinHandle<()>> {
    let claimed = descriptors.claim_ready();
    if claimed.is_empty() {
        return Vec::new();
    }

    debug!("Dispatching {} ready descriptor(s)", claimed.len());
    let _ = events.send(ServiceEvent::DescriptorsChanged);

    let mut handles = Vec::with_capacity(claimed.len());
    for descriptor in claimed {
        let analyzer = Arc::clone(analyzer);
        let descriptors = Arc::clone(descriptors);
        let events = events.clone();

        handles.push(std::thread::spawn(move || {
            let filename = descriptor.filename;
            let (outcome, _ctx) = analyzer.run(AnalysisContext::new(&filename));

            match outcome.disposition {
                Disposition::Completed { .. } => {
                    descriptors.set_status(&filename, AnalysisStatus::Finish);
                    let _ = events.send(ServiceEvent::AnalysisStored {
                        filename: filename.clone(),
                    });
                }
                Disposition::AlreadyAnalyzed => {
                    descriptors.set_status(&filename, AnalysisStatus::Finish);
                }
                Disposition::Failed { .. } => {
                    // Back to Ready; the next tick (or a manual trigger)
                    // retries the whole run.
                    descriptors.set_status(&filename, AnalysisStatus::Ready);
                }
            }
            let _ = events.send(ServiceEvent::DescriptorsChanged);
        }));
    }
    handles
}
