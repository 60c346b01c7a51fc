//! Control surface channel
//!
//! External surfaces (CLI, GUI, signal handlers) talk to the scheduler
//! through this channel. Signals are cooperative: the scheduler drains them
//! at cycle checkpoints and during break/pause sleeps, never mid-task, so
//! an in-flight tap sequence is never cut short.

use std::sync::mpsc::{self, Receiver, Sender};

/// A signal from the operator to the running bot
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSignal {
    /// Suspend task execution after the current cycle
    Pause,
    /// Resume from pause
    Resume,
    /// Stop the run gracefully
    Stop,
    /// Enable or disable a task by name
    SetTaskEnabled { task: String, enabled: bool },
    /// Change a task's scheduling priority
    SetTaskPriority { task: String, priority: f64 },
}

/// Sending half, held by the control surface; cheap to clone
#[derive(Clone)]
pub struct ControlHandle {
    tx: Sender<ControlSignal>,
}

impl ControlHandle {
    pub fn send(&self, signal: ControlSignal) {
        // A dropped receiver means the scheduler already stopped
        let _ = self.tx.send(signal);
    }

    pub fn pause(&self) {
        self.send(ControlSignal::Pause);
    }

    pub fn resume(&self) {
        self.send(ControlSignal::Resume);
    }

    pub fn stop(&self) {
        self.send(ControlSignal::Stop);
    }
}

/// Receiving half, owned by the scheduler
pub struct ControlReceiver {
    rx: Receiver<ControlSignal>,
}

impl ControlReceiver {
    /// Take the next pending signal without blocking
    pub fn poll(&self) -> Option<ControlSignal> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected control surface pair
pub fn channel() -> (ControlHandle, ControlReceiver) {
    let (tx, rx) = mpsc::channel();
    (ControlHandle { tx }, ControlReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_arrive_in_order() {
        let (handle, receiver) = channel();
        handle.pause();
        handle.resume();
        handle.stop();

        assert_eq!(receiver.poll(), Some(ControlSignal::Pause));
        assert_eq!(receiver.poll(), Some(ControlSignal::Resume));
        assert_eq!(receiver.poll(), Some(ControlSignal::Stop));
        assert_eq!(receiver.poll(), None);
    }

    #[test]
    fn test_send_after_receiver_drop_is_silent() {
        let (handle, receiver) = channel();
        drop(receiver);
        handle.stop();
    }

    #[test]
    fn test_task_configuration_signals() {
        let (handle, receiver) = channel();
        handle.send(ControlSignal::SetTaskEnabled {
            task: "gather".into(),
            enabled: false,
        });
        handle.send(ControlSignal::SetTaskPriority {
            task: "heal".into(),
            priority: 20.0,
        });

        assert!(matches!(
            receiver.poll(),
            Some(ControlSignal::SetTaskEnabled { enabled: false, .. })
        ));
        assert!(matches!(
            receiver.poll(),
            Some(ControlSignal::SetTaskPriority { priority, .. }) if priority == 20.0
        ));
    }
}
