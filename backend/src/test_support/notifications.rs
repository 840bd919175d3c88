//! Scripted port doubles for processor and scheduler tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    DeliveryChannel, DeliveryChannelError, DeliveryOutcome, DeliveryRequest,
    NotificationRepository, NotificationRepositoryError, OverdueLoanSource,
    OverdueLoanSourceError,
};
use crate::domain::{
    DeliveryContext, LoanId, NotificationId, NotificationStatus, OverdueLoan, OverdueNotification,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Loan source returning a replaceable list.
#[derive(Default)]
pub struct LoanSourceStub {
    loans: Mutex<Vec<OverdueLoan>>,
    failure: Mutex<Option<OverdueLoanSourceError>>,
}

impl LoanSourceStub {
    pub fn with_loans(loans: Vec<OverdueLoan>) -> Self {
        Self {
            loans: Mutex::new(loans),
            failure: Mutex::new(None),
        }
    }

    pub fn set_loans(&self, loans: Vec<OverdueLoan>) {
        *lock(&self.loans, "loans") = loans;
    }

    pub fn fail_with(&self, error: OverdueLoanSourceError) {
        *lock(&self.failure, "loan failure") = Some(error);
    }
}

#[async_trait]
impl OverdueLoanSource for LoanSourceStub {
    async fn overdue_unreturned_loans(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OverdueLoan>, OverdueLoanSourceError> {
        if let Some(error) = lock(&self.failure, "loan failure").clone() {
            return Err(error);
        }
        Ok(lock(&self.loans, "loans")
            .iter()
            .filter(|loan| loan.due_at < now)
            .copied()
            .collect())
    }
}

/// Vector-backed notification store with a fixed delivery context.
pub struct NotificationStoreStub {
    records: Mutex<Vec<OverdueNotification>>,
    unresolvable: Mutex<HashSet<NotificationId>>,
    due_at: DateTime<Utc>,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
}

impl NotificationStoreStub {
    pub fn new(due_at: DateTime<Utc>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            unresolvable: Mutex::new(HashSet::new()),
            due_at,
            inserts: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn seed(&self, record: OverdueNotification) {
        lock(&self.records, "records").push(record);
    }

    pub fn records(&self) -> Vec<OverdueNotification> {
        lock(&self.records, "records").clone()
    }

    pub fn record_for(&self, loan_id: LoanId) -> OverdueNotification {
        self.records()
            .into_iter()
            .find(|record| record.loan_id() == loan_id)
            .unwrap_or_else(|| panic!("no record for loan {loan_id}"))
    }

    pub fn make_unresolvable(&self, id: NotificationId) {
        lock(&self.unresolvable, "unresolvable").insert(id);
    }
}

#[async_trait]
impl NotificationRepository for NotificationStoreStub {
    async fn exists_for_loan(&self, loan_id: LoanId) -> Result<bool, NotificationRepositoryError> {
        Ok(lock(&self.records, "records")
            .iter()
            .any(|record| record.loan_id() == loan_id))
    }

    async fn insert(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError> {
        let mut records = lock(&self.records, "records");
        if records.iter().any(|existing| existing.loan_id() == record.loan_id()) {
            return Err(NotificationRepositoryError::duplicate_loan(record.loan_id()));
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        records.push(record.clone());
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        let mut pending: Vec<_> = lock(&self.records, "records")
            .iter()
            .filter(|record| record.status() == NotificationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(OverdueNotification::created_at);
        Ok(pending)
    }

    async fn retry_eligible(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        Ok(lock(&self.records, "records")
            .iter()
            .filter(|record| {
                record.status() == NotificationStatus::Failed
                    && record.retry_count() < max_attempts
                    && record.next_retry_at().is_some_and(|at| at <= now)
            })
            .cloned()
            .collect())
    }

    async fn update(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError> {
        let mut records = lock(&self.records, "records");
        let slot = records
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or_else(|| NotificationRepositoryError::not_found(record.id().to_string()))?;
        *slot = record.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delivery_context(
        &self,
        record: &OverdueNotification,
    ) -> Result<Option<DeliveryContext>, NotificationRepositoryError> {
        if lock(&self.unresolvable, "unresolvable").contains(&record.id()) {
            return Ok(None);
        }
        Ok(Some(DeliveryContext {
            recipient_email: format!("patron-{}@example.org", record.patron_id()),
            recipient_name: "Test Patron".to_owned(),
            item_title: "The Pragmatic Programmer".to_owned(),
            due_at: self.due_at,
        }))
    }

    async fn find_by_loan(
        &self,
        loan_id: LoanId,
    ) -> Result<Option<OverdueNotification>, NotificationRepositoryError> {
        Ok(lock(&self.records, "records")
            .iter()
            .find(|record| record.loan_id() == loan_id)
            .cloned())
    }

    async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        Ok(lock(&self.records, "records")
            .iter()
            .filter(|record| status.is_none_or(|wanted| record.status() == wanted))
            .cloned()
            .collect())
    }
}

/// One scripted channel response.
#[derive(Debug, Clone)]
pub enum ChannelStep {
    Deliver,
    Decline,
    Fail(DeliveryChannelError),
    Hang,
}

/// Delivery channel that replays a script, then repeats a fallback step.
pub struct ScriptedChannel {
    script: Mutex<VecDeque<ChannelStep>>,
    fallback: Mutex<ChannelStep>,
    requests: Mutex<Vec<DeliveryRequest>>,
}

impl ScriptedChannel {
    pub fn always(step: ChannelStep) -> Self {
        Self::scripted(Vec::new(), step)
    }

    pub fn scripted(steps: Vec<ChannelStep>, fallback: ChannelStep) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback: Mutex::new(fallback),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DeliveryRequest> {
        lock(&self.requests, "requests").clone()
    }

    pub fn calls(&self) -> usize {
        lock(&self.requests, "requests").len()
    }
}

#[async_trait]
impl DeliveryChannel for ScriptedChannel {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryOutcome, DeliveryChannelError> {
        lock(&self.requests, "requests").push(request.clone());
        let step = lock(&self.script, "script")
            .pop_front()
            .unwrap_or_else(|| lock(&self.fallback, "fallback").clone());
        match step {
            ChannelStep::Deliver => Ok(DeliveryOutcome::Delivered),
            ChannelStep::Decline => Ok(DeliveryOutcome::Declined),
            ChannelStep::Fail(error) => Err(error),
            ChannelStep::Hang => std::future::pending().await,
        }
    }
}
