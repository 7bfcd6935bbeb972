//! Webhook Dispatcher
//!
//! Delivers one payload per matched subscription:
//! - One spawned task per delivery, never awaited by the caller
//! - Semaphore-bounded concurrency across all deliveries
//! - Per-delivery request timeout, no retries
//! - Drain on shutdown with a grace period

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::EventKind;
use crate::subscription::{DeliveryPayload, Subscription};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Whole-request timeout per delivery
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Deliveries running at once; further ones wait for a permit
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            max_in_flight: 64,
        }
    }
}

/// Count of spawned deliveries that have not finished yet
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Held by a delivery task for its whole lifetime
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(tracker: &Arc<InFlight>) -> Self {
        tracker.count.fetch_add(1, Ordering::SeqCst);
        Self(tracker.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct Dispatcher {
    client: Client,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<InFlight>,
    accepting: AtomicBool,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.max_in_flight))
    }

    pub fn with_client(client: Client, max_in_flight: usize) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
            in_flight: Arc::new(InFlight::default()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Spawn one delivery per subscription and return without waiting.
    ///
    /// Returns the number of deliveries scheduled.
    pub fn dispatch(&self, subscriptions: Vec<Subscription>, event: EventKind, country: &str) -> usize {
        if subscriptions.is_empty() {
            debug!(event = %event, country = %country, "No subscriptions matched");
            return 0;
        }

        if !self.accepting.load(Ordering::SeqCst) {
            warn!(
                event = %event,
                country = %country,
                dropped = subscriptions.len(),
                "Dispatcher is shut down, dropping deliveries"
            );
            return 0;
        }

        let scheduled = subscriptions.len();
        for subscription in subscriptions {
            let guard = InFlightGuard::enter(&self.in_flight);
            let client = self.client.clone();
            let semaphore = self.semaphore.clone();
            let trigger_country = country.to_string();

            tokio::spawn(async move {
                let _guard = guard;
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(
                            subscription_id = %subscription.id,
                            url = %subscription.url,
                            "Dispatcher closed before delivery started"
                        );
                        return;
                    }
                };

                match deliver(&client, &subscription).await {
                    Ok(status) => info!(
                        subscription_id = %subscription.id,
                        url = %subscription.url,
                        event = %event,
                        country = %trigger_country,
                        status,
                        "Webhook delivered"
                    ),
                    Err(e) => warn!(
                        subscription_id = %subscription.id,
                        url = %subscription.url,
                        event = %event,
                        country = %trigger_country,
                        error = %e,
                        "Webhook delivery failed"
                    ),
                }
            });
        }

        debug!(event = %event, country = %country, scheduled, "Deliveries scheduled");
        scheduled
    }

    /// Deliveries spawned and not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Wait until no delivery is in flight. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.in_flight() == 0;
            }
        }
    }

    /// Stop accepting dispatches and drain in-flight deliveries.
    ///
    /// Deliveries still waiting for a permit after the grace period are abandoned.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.accepting.store(false, Ordering::SeqCst);
        info!(in_flight = self.in_flight(), "Shutting down webhook dispatcher");

        let drained = self.wait_idle(grace).await;
        if drained {
            info!("Webhook dispatcher drained");
        } else {
            warn!(remaining = self.in_flight(), "Grace period elapsed with deliveries in flight");
            self.semaphore.close();
        }
        drained
    }
}

/// POST a freshly stamped payload to the subscription url. Returns the response status.
pub async fn deliver(client: &Client, subscription: &Subscription) -> Result<u16> {
    let payload = DeliveryPayload::stamped(subscription);
    let body = serde_json::to_vec(&payload)?;

    let response = client
        .post(&subscription.url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    Ok(response.status().as_u16())
}
