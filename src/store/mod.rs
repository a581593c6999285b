//! In-memory aggregate stores.
//!
//! Orders and jobs are independently owned aggregates. Each record lives
//! behind its own `Arc<tokio::sync::Mutex<_>>`, which is the per-aggregate
//! exclusive lock: transitions on one order are strictly serialized while
//! different orders proceed in parallel, and job callbacks are serialized per
//! job id. All mutation goes through the state machine and orchestrator;
//! nothing here deletes a record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::inference::InferenceJob;
use crate::models::order::Order;

#[derive(Debug, Default)]
pub struct OrderStore {
    orders: DashMap<Uuid, Arc<Mutex<Order>>>,
    seq: AtomicU64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next internal surrogate key.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn insert(&self, order: Order) -> Arc<Mutex<Order>> {
        let id = order.order_id;
        let entry = Arc::new(Mutex::new(order));
        self.orders.insert(id, Arc::clone(&entry));
        entry
    }

    /// Handle to the order's record and its exclusive lock.
    pub fn entry(&self, order_id: Uuid) -> Option<Arc<Mutex<Order>>> {
        self.orders.get(&order_id).map(|e| Arc::clone(e.value()))
    }

    /// Point-in-time copy of one order.
    pub async fn snapshot(&self, order_id: Uuid) -> Option<Order> {
        let entry = self.entry(order_id)?;
        let order = entry.lock().await;
        Some(order.clone())
    }

    /// Point-in-time copies of every order on file for a patient, in
    /// surrogate-key order. Locks one record at a time, so a sweep never
    /// pins the whole table while a transition is in flight.
    pub async fn orders_for_patient(&self, patient_id: &str) -> Vec<Order> {
        let entries: Vec<Arc<Mutex<Order>>> = self
            .orders
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();

        let mut snapshots: Vec<Order> = futures::stream::iter(entries)
            .filter_map(|entry| async move {
                let order = entry.lock().await;
                (order.patient_id == patient_id).then(|| order.clone())
            })
            .collect()
            .await;
        snapshots.sort_by_key(|o| o.seq);
        snapshots
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, Arc<Mutex<InferenceJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: InferenceJob) -> Arc<Mutex<InferenceJob>> {
        let id = job.job_id;
        let entry = Arc::new(Mutex::new(job));
        self.jobs.insert(id, Arc::clone(&entry));
        entry
    }

    /// Handle to the job's record; locking it is what serializes callbacks
    /// for one job id.
    pub fn entry(&self, job_id: Uuid) -> Option<Arc<Mutex<InferenceJob>>> {
        self.jobs.get(&job_id).map(|e| Arc::clone(e.value()))
    }

    pub async fn snapshot(&self, job_id: Uuid) -> Option<InferenceJob> {
        let entry = self.entry(job_id)?;
        let job = entry.lock().await;
        Some(job.clone())
    }

    /// Point-in-time copies of all jobs, for the watchdog sweep. Locks one
    /// record at a time.
    pub async fn all_snapshots(&self) -> Vec<InferenceJob> {
        let entries: Vec<Arc<Mutex<InferenceJob>>> =
            self.jobs.iter().map(|e| Arc::clone(e.value())).collect();

        futures::stream::iter(entries)
            .then(|entry| async move { entry.lock().await.clone() })
            .collect()
            .await
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
