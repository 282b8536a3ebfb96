//! Auxiliary input sampled into every valid sensor frame.
//!
//! On the reference hardware this is the user button wired to the host
//! controller rather than to the peer, so the host stamps its state itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of the "auxiliary input active" value.
pub trait AuxInput: Send {
    /// Samples the input.
    fn is_active(&self) -> bool;
}

impl<F> AuxInput for F
where
    F: Fn() -> bool + Send,
{
    fn is_active(&self) -> bool {
        self()
    }
}

/// A boolean line that any thread can set, e.g. from a GPIO interrupt.
#[derive(Clone, Debug, Default)]
pub struct ButtonLine {
    pressed: Arc<AtomicBool>,
}

impl ButtonLine {
    /// Creates a released line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the line state.
    pub fn set(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::Release);
    }

    /// Marks the line pressed.
    pub fn press(&self) {
        self.set(true);
    }

    /// Marks the line released.
    pub fn release(&self) {
        self.set(false);
    }
}

impl AuxInput for ButtonLine {
    fn is_active(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }
}

/// An input that is never active.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuxInput;

impl AuxInput for NoAuxInput {
    fn is_active(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_line_is_shared() {
        let line = ButtonLine::new();
        let sampler: Box<dyn AuxInput> = Box::new(line.clone());

        assert!(!sampler.is_active());
        line.press();
        assert!(sampler.is_active());
        line.release();
        assert!(!sampler.is_active());
    }

    #[test]
    fn test_closure_input() {
        let input = || true;
        assert!(input.is_active());
        assert!(!NoAuxInput.is_active());
    }
}
