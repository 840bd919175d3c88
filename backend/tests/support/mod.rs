//! Shared fixtures for notifier integration tests.
#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use lending_backend::domain::ports::{
    DeliveryChannel, DeliveryChannelError, DeliveryOutcome, DeliveryRequest,
};
use lending_backend::domain::{
    BookId, Loan, LoanId, OverdueNotification, OverdueNotificationPorts,
    OverdueNotificationProcessor, OverdueNotificationProcessorConfig, PatronId,
};
use lending_backend::domain::ports::NotificationRepository;
use lending_backend::outbound::memory::{
    BookRecord, InMemoryLendingStore, LOAN_PERIOD_DAYS, PatronRecord,
};
use mockable::Clock;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Fixed start instant shared by the scenarios.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid start time")
}

/// Clock that only moves when a test says so.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = TimeDelta::from_std(delta).expect("delta in range");
        *lock(&self.0) += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Scripted reply for one delivery attempt.
#[derive(Debug, Clone)]
pub enum Reply {
    Deliver,
    Decline,
    Fail(&'static str),
    Stall,
}

/// Channel that answers from a script and records every request it sees.
///
/// Once the script runs dry the fallback reply is used.
pub struct ScriptedChannel {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    seen: Mutex<Vec<DeliveryRequest>>,
}

impl ScriptedChannel {
    pub fn always(reply: Reply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(reply),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fallback(&self, reply: Reply) {
        *lock(&self.fallback) = reply;
    }

    pub fn push(&self, reply: Reply) {
        lock(&self.script).push_back(reply);
    }

    pub fn requests(&self) -> Vec<DeliveryRequest> {
        lock(&self.seen).clone()
    }

    fn next_reply(&self) -> Reply {
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| lock(&self.fallback).clone())
    }
}

#[async_trait]
impl DeliveryChannel for ScriptedChannel {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryOutcome, DeliveryChannelError> {
        lock(&self.seen).push(request.clone());
        match self.next_reply() {
            Reply::Deliver => Ok(DeliveryOutcome::Delivered),
            Reply::Decline => Ok(DeliveryOutcome::Declined),
            Reply::Fail(message) => Err(DeliveryChannelError::transport(message)),
            Reply::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(DeliveryOutcome::Delivered)
            }
        }
    }
}

/// A lending library with one patron and one book, driven by a manual clock.
pub struct Library {
    pub store: Arc<InMemoryLendingStore>,
    pub clock: Arc<MutableClock>,
    pub channel: Arc<ScriptedChannel>,
    pub patron: PatronRecord,
    pub book: BookRecord,
}

impl Library {
    pub fn new(reply: Reply) -> Self {
        let store = Arc::new(InMemoryLendingStore::new());
        let patron = PatronRecord {
            id: PatronId::random(),
            full_name: "Grace Hopper".to_owned(),
            email: "grace@example.org".to_owned(),
        };
        let book = BookRecord {
            id: BookId::random(),
            title: "A Manual of Operation for the Automatic Sequence Controlled Calculator"
                .to_owned(),
            author: "Harvard Computation Laboratory".to_owned(),
        };
        store.upsert_patron(patron.clone()).expect("store patron");
        store.upsert_book(book.clone()).expect("store book");
        Self {
            store,
            clock: Arc::new(MutableClock::new(start())),
            channel: Arc::new(ScriptedChannel::always(reply)),
            patron,
            book,
        }
    }

    /// Lend the book so that it falls due `due_in` from the current clock.
    pub fn lend(&self, due_in: TimeDelta) -> Loan {
        let due_at = self.clock.utc() + due_in;
        let loan = Loan {
            id: LoanId::random(),
            book_id: self.book.id,
            patron_id: self.patron.id,
            loaned_at: due_at - TimeDelta::days(LOAN_PERIOD_DAYS),
            due_at,
            returned_at: None,
        };
        self.store.upsert_loan(loan.clone()).expect("store loan");
        loan
    }

    pub fn processor(&self) -> OverdueNotificationProcessor {
        self.processor_with(OverdueNotificationProcessorConfig::default())
    }

    pub fn processor_with(
        &self,
        config: OverdueNotificationProcessorConfig,
    ) -> OverdueNotificationProcessor {
        let ports = OverdueNotificationPorts::new(
            self.store.clone(),
            self.store.clone(),
            self.channel.clone(),
        );
        OverdueNotificationProcessor::new(ports, self.clock.clone(), config)
    }

    pub async fn record_for(&self, loan: &Loan) -> OverdueNotification {
        self.store
            .find_by_loan(loan.id)
            .await
            .expect("query notification")
            .expect("notification exists")
    }

    pub async fn all_records(&self) -> Vec<OverdueNotification> {
        self.store.list(None).await.expect("list notifications")
    }
}
