//! Post-call action coordinator
//!
//! Host functions never reschedule, deliver callbacks or break into the
//! debugger themselves. They raise bits here, and once the function has
//! returned the dispatcher hands the pending set to [`PostCallState::finish`],
//! which carries the work out in a fixed order:
//!
//! 1. current thread's callbacks
//! 2. one pending interrupt
//! 3. reschedule with callbacks, else reschedule, else all threads' callbacks
//! 4. debug break
//!
//! Interrupts run before the reschedule decision because an interrupt handler
//! may itself ask for a reschedule. A debug break raised during a blacklisted
//! call stays pending until the next call that is not blacklisted.

use alloc::string::String;
use alloc::vec::Vec;

use hle_api::{DebugHost, HleConfig, Nid, Scheduler};

/// Stored in place of a missing reschedule reason
pub const INVALID_REASON: &str = "Invalid reason";

bitflags::bitflags! {
    /// Work requested by a host function, carried out after it returns
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AfterSyscall: u32 {
        /// Reschedule immediately after the syscall
        const RESCHED = 0x01;
        /// Call the current thread's callbacks after the syscall
        const CURRENT_CALLBACKS = 0x02;
        /// Check all threads' callbacks after the syscall
        const ALL_CALLBACKS = 0x04;
        /// Reschedule and process callbacks after the syscall
        const RESCHED_CALLBACKS = 0x08;
        /// Run one pending interrupt after the syscall
        const RUN_INTERRUPTS = 0x10;
        /// Switch the core to stepping after the syscall
        const DEBUG_BREAK = 0x20;
    }
}

/// One step of the post-call sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCallAction {
    /// Deliver the current thread's callbacks
    DeliverCurrentCallbacks,
    /// Dispatch exactly one pending interrupt
    RunOneInterrupt,
    /// Reschedule and sweep every thread's callbacks
    RescheduleWithCallbacks,
    /// Plain reschedule
    Reschedule,
    /// Sweep every thread's callbacks
    CheckAllCallbacks,
    /// Enter the debugger unless the call is blacklisted
    DebugBreak,
}

/// Result of running the post-call sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCallOutcome {
    /// Everything ran, state is reset
    Completed,
    /// The debug break was suppressed for a blacklisted call and stays pending
    BreakDeferred,
    /// The core was switched into stepping mode, state is reset
    BreakEntered,
}

/// Orders the pending bits into the steps that will run.
pub fn plan(pending: AfterSyscall) -> Vec<PostCallAction> {
    let mut steps = Vec::with_capacity(4);

    if pending.contains(AfterSyscall::CURRENT_CALLBACKS) {
        steps.push(PostCallAction::DeliverCurrentCallbacks);
    }
    if pending.contains(AfterSyscall::RUN_INTERRUPTS) {
        steps.push(PostCallAction::RunOneInterrupt);
    }

    // Rescheduling also covers ALL_CALLBACKS.
    if pending.contains(AfterSyscall::RESCHED_CALLBACKS) {
        steps.push(PostCallAction::RescheduleWithCallbacks);
    } else if pending.contains(AfterSyscall::RESCHED) {
        steps.push(PostCallAction::Reschedule);
    } else if pending.contains(AfterSyscall::ALL_CALLBACKS) {
        steps.push(PostCallAction::CheckAllCallbacks);
    }

    if pending.contains(AfterSyscall::DEBUG_BREAK) {
        steps.push(PostCallAction::DebugBreak);
    }
    steps
}

/// Pending post-call work plus the most recent reschedule reason
#[derive(Debug, Clone)]
pub struct PostCallState {
    pending: AfterSyscall,
    reason: String,
    reason_capacity: usize,
    blacklist: Vec<Nid>,
}

impl PostCallState {
    /// Create an empty state sized from the configuration
    pub fn new(config: &HleConfig) -> Self {
        Self {
            pending: AfterSyscall::empty(),
            reason: String::with_capacity(config.reschedule_reason_capacity),
            reason_capacity: config.reschedule_reason_capacity,
            blacklist: config.debug_break_blacklist.clone(),
        }
    }

    /// Currently pending bits
    pub fn pending(&self) -> AfterSyscall {
        self.pending
    }

    /// Whether any work is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Reason of the most recent reschedule request
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Request a reschedule
    pub fn reschedule<'r>(&mut self, reason: impl Into<Option<&'r str>>) {
        let reason = reason.into();
        hle_assert!(reason.is_some(), "reschedule: expecting a valid reason");

        self.pending |= AfterSyscall::RESCHED;
        self.store_reason(reason.unwrap_or(INVALID_REASON));
    }

    /// Request a reschedule, optionally processing every thread's callbacks
    pub fn reschedule_with_callbacks<'r>(&mut self, callbacks: bool, reason: impl Into<Option<&'r str>>) {
        self.reschedule(reason);
        if callbacks {
            self.pending |= AfterSyscall::RESCHED_CALLBACKS;
        }
    }

    /// Request one pending interrupt to run
    pub fn run_interrupts(&mut self) {
        self.pending |= AfterSyscall::RUN_INTERRUPTS;
    }

    /// Request a sweep of every thread's callbacks
    pub fn check_all_callbacks(&mut self) {
        self.pending |= AfterSyscall::ALL_CALLBACKS;
    }

    /// Request the current thread's callbacks
    pub fn check_current_callbacks(&mut self) {
        self.pending |= AfterSyscall::CURRENT_CALLBACKS;
    }

    /// Request a debug break
    pub fn debug_break(&mut self) {
        self.pending |= AfterSyscall::DEBUG_BREAK;
    }

    /// Forget everything pending
    pub fn clear(&mut self) {
        self.pending = AfterSyscall::empty();
        self.reason.clear();
    }

    /// Runs the pending work for the call that just returned.
    ///
    /// `nid` identifies that call; it decides whether a debug break fires now
    /// or is deferred.
    pub fn finish(
        &mut self,
        nid: Nid,
        scheduler: &mut dyn Scheduler,
        debug: &mut dyn DebugHost,
    ) -> PostCallOutcome {
        let mut outcome = PostCallOutcome::Completed;

        for action in plan(self.pending) {
            match action {
                PostCallAction::DeliverCurrentCallbacks => scheduler.force_callbacks(),
                PostCallAction::RunOneInterrupt => {
                    if !scheduler.run_one_pending_interrupt() {
                        sys_trace!("run interrupts requested with none pending");
                    }
                }
                PostCallAction::RescheduleWithCallbacks => {
                    scheduler.reschedule_with_callbacks(&self.reason)
                }
                PostCallAction::Reschedule => scheduler.reschedule(&self.reason),
                PostCallAction::CheckAllCallbacks => scheduler.check_callbacks(),
                PostCallAction::DebugBreak => {
                    if self.blacklist.contains(&nid) {
                        // Never break on these, they're noise. We'll do it next call.
                        sys_debug!("debug break deferred past {:08x}", nid);
                        self.pending = AfterSyscall::DEBUG_BREAK;
                        self.reason.clear();
                        return PostCallOutcome::BreakDeferred;
                    }
                    debug.enable_stepping();
                    debug.set_debug_mode(true);
                    outcome = PostCallOutcome::BreakEntered;
                }
            }
        }

        self.clear();
        outcome
    }

    fn store_reason(&mut self, reason: &str) {
        let limit = self.reason_capacity.saturating_sub(1);
        let mut cut = reason.len();
        if cut > limit {
            sys_warn!(
                "reschedule reason of {} bytes truncated to {}",
                reason.len(),
                limit
            );
            cut = limit;
            while !reason.is_char_boundary(cut) {
                cut -= 1;
            }
        }
        self.reason.clear();
        self.reason.push_str(&reason[..cut]);
    }
}
