use std::sync::{Mutex, MutexGuard};

/// A generic state machine wrapper ensuring thread-safe state transitions.
///
/// This struct wraps a state `S` in a `Mutex` and provides a `transition` method
/// to perform atomic state updates and return an action/result.
///
/// # Example
///
/// ```rust
/// use arrayd_common::state_machine::StateMachine;
///
/// enum State {
///     Idle,
///     Running,
/// }
///
/// let machine = StateMachine::new(State::Idle);
///
/// let action = machine.transition(|state| {
///     match state {
///         State::Idle => {
///             *state = State::Running;
///             "Started"
///         }
///         State::Running => "Already running",
///     }
/// });
/// ```
#[derive(Debug)]
pub struct StateMachine<S> {
    state: Mutex<S>,
}

impl<S> StateMachine<S> {
    /// Creates a new `StateMachine` in the given initial state.
    pub fn new(initial_state: S) -> Self {
        Self {
            state: Mutex::new(initial_state),
        }
    }

    /// Access the underlying state directly via a MutexGuard.
    ///
    /// Use this for simple reads or checks that don't require complex transitions.
    /// For transitions, prefer `transition`.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap()
    }

    /// Perform an atomic transition on the state.
    ///
    /// The closure `f` is called with a mutable reference to the current state.
    /// The lock is held for the duration of the closure.
    ///
    /// Returns the result of the closure.
    pub fn transition<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut *state)
    }
}
