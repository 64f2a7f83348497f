use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Something to run when the process exits normally.
pub trait ExitHook: Send + Sync {
    fn on_exit(&self);
}

struct Registry {
    next_id: u64,
    hooks: Vec<(u64, Weak<dyn ExitHook>)>,
    installed: bool,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    next_id: 0,
    hooks: Vec::new(),
    installed: false,
});

fn registry() -> MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

extern "C" fn run_at_exit() {
    run_exit_hooks();
}

/// Adds `hook` to the process-wide exit registry.
///
/// The registry holds it weakly: a hook whose owner is gone is skipped. The
/// first registration installs a single C `atexit` handler, so hooks run on
/// normal termination (return from `main`, `std::process::exit`) and not on
/// signals or aborts.
pub fn register(hook: Weak<dyn ExitHook>) -> ExitHookGuard {
    let mut registry = registry();
    if !registry.installed {
        // Safety: `run_at_exit` is a plain extern "C" fn with no arguments.
        if unsafe { libc::atexit(run_at_exit) } != 0 {
            log::warn!("Failed to install process exit handler");
        }
        registry.installed = true;
    }
    let id = registry.next_id;
    registry.next_id += 1;
    registry.hooks.retain(|(_, hook)| hook.strong_count() > 0);
    registry.hooks.push((id, hook));
    ExitHookGuard { id }
}

/// Runs every live registered hook, in registration order.
///
/// Hooks are collected first and run without the registry lock held.
pub fn run_exit_hooks() {
    let live: Vec<Arc<dyn ExitHook>> = registry()
        .hooks
        .iter()
        .filter_map(|(_, hook)| hook.upgrade())
        .collect();
    if !live.is_empty() {
        log::debug!("Running {} exit hook(s)", live.len());
    }
    for hook in live {
        hook.on_exit();
    }
}

/// Unregisters its hook when dropped.
#[derive(Debug)]
pub struct ExitHookGuard {
    id: u64,
}

impl ExitHookGuard {
    /// Runs only this guard's hook, as the exit handler would.
    #[cfg(test)]
    pub(crate) fn fire(&self) {
        let hook = registry()
            .hooks
            .iter()
            .find(|(id, _)| *id == self.id)
            .and_then(|(_, hook)| hook.upgrade());
        if let Some(hook) = hook {
            hook.on_exit();
        }
    }

    #[cfg(test)]
    fn is_registered(&self) -> bool {
        registry().hooks.iter().any(|(id, _)| *id == self.id)
    }
}

impl Drop for ExitHookGuard {
    fn drop(&mut self) {
        registry().hooks.retain(|(id, _)| *id != self.id);
    }
}
