//! Aggregate counters reported by one processing pass.

/// Counts collected while running discovery, pending dispatch, and retry
/// dispatch.
///
/// Counters are only ever incremented, so summaries from passes that stop
/// early are still accurate for the records they touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Overdue, unreturned loans returned by discovery.
    pub overdue_loans_seen: u32,
    /// Records created during discovery.
    pub notifications_created: u32,
    /// Deliveries that succeeded.
    pub notifications_sent: u32,
    /// Deliveries that failed, timed out, or lacked context.
    pub notifications_failed: u32,
    /// Failed records reset and re-dispatched.
    pub retries_attempted: u32,
    /// Records skipped because a transition guard rejected them.
    pub invariant_violations: u32,
    /// Whether the pass stopped early on shutdown.
    pub interrupted: bool,
}

impl ProcessingSummary {
    /// Whether the pass changed nothing.
    ///
    /// # Examples
    /// ```
    /// use lending_backend::domain::ProcessingSummary;
    ///
    /// assert!(ProcessingSummary::default().is_idle());
    /// ```
    pub fn is_idle(&self) -> bool {
        self.notifications_created == 0
            && self.notifications_sent == 0
            && self.notifications_failed == 0
            && self.retries_attempted == 0
    }

    /// Number of delivery attempts made.
    pub fn attempts(&self) -> u32 {
        self.notifications_sent
            .saturating_add(self.notifications_failed)
    }
}
