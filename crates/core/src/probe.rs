//! Execution-context detection.
//!
//! Document-tree work is only possible inside a page context. A thread enters
//! one with [`within_page`]; the in-page agent does this around each conversion
//! it runs. Everything else (the orchestrating chain, injected tasks) runs
//! outside any page scope and has to work on strings.
//!
//! The probe is asked at the start of every pipeline run and never cached.

use std::cell::Cell;

/// Which document facilities the current operation can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    DomAvailable,
    DomUnavailable,
}

/// Reports the execution context of the calling operation.
pub trait CapabilityProbe: Send + Sync {
    fn probe(&self) -> ExecutionContext;
}

thread_local! {
    static PAGE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Runs `f` with the current thread inside a page scope.
///
/// Scopes nest; the thread leaves the page context when the outermost scope
/// returns, including by unwinding.
pub fn within_page<T>(f: impl FnOnce() -> T) -> T {
    let _guard = PageScope::enter();
    f()
}

struct PageScope;

impl PageScope {
    fn enter() -> Self {
        PAGE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        PageScope
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        PAGE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Probe backed by the thread's page scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientProbe;

impl CapabilityProbe for AmbientProbe {
    fn probe(&self) -> ExecutionContext {
        if PAGE_DEPTH.with(Cell::get) > 0 { ExecutionContext::DomAvailable } else { ExecutionContext::DomUnavailable }
    }
}

/// Probe that always reports the same context.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub ExecutionContext);

impl CapabilityProbe for FixedProbe {
    fn probe(&self) -> ExecutionContext {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_probe_outside_page() {
        assert_eq!(AmbientProbe.probe(), ExecutionContext::DomUnavailable);
    }

    #[test]
    fn test_ambient_probe_follows_scope() {
        let inside = within_page(|| AmbientProbe.probe());
        assert_eq!(inside, ExecutionContext::DomAvailable);
        assert_eq!(AmbientProbe.probe(), ExecutionContext::DomUnavailable);
    }

    #[test]
    fn test_nested_scopes() {
        within_page(|| {
            within_page(|| assert_eq!(AmbientProbe.probe(), ExecutionContext::DomAvailable));
            assert_eq!(AmbientProbe.probe(), ExecutionContext::DomAvailable);
        });
        assert_eq!(AmbientProbe.probe(), ExecutionContext::DomUnavailable);
    }

    #[test]
    fn test_scope_is_per_thread() {
        within_page(|| {
            let other = std::thread::spawn(|| AmbientProbe.probe()).join().unwrap();
            assert_eq!(other, ExecutionContext::DomUnavailable);
        });
    }

    #[test]
    fn test_scope_released_on_panic() {
        let result = std::panic::catch_unwind(|| within_page(|| panic!("conversion bug")));
        assert!(result.is_err());
        assert_eq!(AmbientProbe.probe(), ExecutionContext::DomUnavailable);
    }

    #[test]
    fn test_fixed_probe() {
        assert_eq!(FixedProbe(ExecutionContext::DomAvailable).probe(), ExecutionContext::DomAvailable);
    }
}
