//! Scheduler interface

/// Trait for the guest thread scheduler
///
/// These are the hand-off points the post-call coordinator uses once a
/// dispatched host function has returned.
pub trait Scheduler {
    /// Runs the current thread's pending callbacks
    fn force_callbacks(&mut self);

    /// Runs one pending interrupt, returns whether one was pending
    fn run_one_pending_interrupt(&mut self) -> bool;

    /// Picks the next thread to run
    fn reschedule(&mut self, reason: &str);

    /// Picks the next thread to run and processes every thread's callbacks
    fn reschedule_with_callbacks(&mut self, reason: &str);

    /// Processes every thread's pending callbacks
    fn check_callbacks(&mut self);
}
