use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks controller state, recovering it if a panicking task poisoned the mutex.
pub(crate) fn lock<S>(shared: &Mutex<S>) -> MutexGuard<'_, S> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs a pure update function against shared state and hands back its effects.
pub(crate) fn apply<S, M, E>(
    shared: &Mutex<S>,
    msg: M,
    update: impl FnOnce(S, M) -> (S, Vec<E>),
) -> Vec<E>
where
    S: Default,
{
    let mut guard = lock(shared);
    let state = std::mem::take(&mut *guard);
    let (state, effects) = update(state, msg);
    *guard = state;
    effects
}
