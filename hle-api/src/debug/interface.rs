//! Debug host interface

/// Trait for the host debugger
pub trait DebugHost {
    /// Switches the emulator core into single-step mode
    fn enable_stepping(&mut self);

    /// Tells the host UI to enter or leave debug display mode
    fn set_debug_mode(&mut self, enabled: bool);
}
