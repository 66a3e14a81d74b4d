use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;

use crate::carrier::Carrier;
use crate::context::TraceContext;

tokio::task_local! {
    static TASK_CONTEXT: RefCell<Option<TraceContext>>;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<TraceContext>> = const { RefCell::new(None) };
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Soft cap on nesting depth (spec §4.2: "implementations may cap at 1024 to
/// bound memory"). Exceeding it does not break correctness -- the guard
/// chain is just the call stack -- it only trips a one-time diagnostic.
const MAX_DEPTH: u32 = 1024;

/// Read the ambient context, preferring the task-local slot (set by
/// [`with_task_scope`]) and falling back to the thread-local slot for
/// producers that never installed one.
#[must_use]
pub fn current() -> Option<TraceContext> {
    match TASK_CONTEXT.try_with(|cell| cell.borrow().clone()) {
        Ok(ctx) => ctx,
        Err(_) => THREAD_CONTEXT.with(|cell| cell.borrow().clone()),
    }
}

fn install(ctx: Option<TraceContext>) -> Option<TraceContext> {
    match TASK_CONTEXT.try_with(|cell| cell.replace(ctx.clone())) {
        Ok(previous) => previous,
        Err(_) => THREAD_CONTEXT.with(|cell| cell.replace(ctx)),
    }
}

/// Installs a task-local ambient-context slot for the duration of `fut`.
///
/// Equivalent to the platform's task-local primitive referenced in spec §9:
/// tasks that want a real per-task slot (rather than the thread-local
/// fallback) wrap their top-level future with this once, then use
/// [`scoped`] freely inside it.
pub async fn with_task_scope<F: Future>(fut: F) -> F::Output {
    TASK_CONTEXT.scope(RefCell::new(None), fut).await
}

/// Inputs to the scoped-acquisition primitive (spec §4.2).
///
/// Selection order: explicit `parent` wins over `carrier`, which wins over
/// constructing a fresh root. `trace_id`/`correlation_id`/`session_id`/`extra`
/// are applied as overrides on top of whichever base context was selected.
#[derive(Debug, Clone, Default)]
pub struct ScopeInputs {
    pub trace_id: Option<String>,
    pub correlation_id: Option<String>,
    pub session_id: Option<String>,
    pub extra: BTreeMap<String, String>,
    pub carrier: Option<Carrier>,
    pub parent: Option<TraceContext>,
}

impl ScopeInputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn carrier(mut self, carrier: Carrier) -> Self {
        self.carrier = Some(carrier);
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: TraceContext) -> Self {
        self.parent = Some(parent);
        self
    }

    fn resolve(self) -> TraceContext {
        let mut ctx = if let Some(parent) = self.parent {
            parent.child_span()
        } else if let Some(carrier) = self.carrier {
            TraceContext::from_carrier(&carrier)
        } else {
            TraceContext::root()
        };

        if let Some(trace_id) = self.trace_id {
            ctx.trace_id = trace_id;
        }
        if let Some(correlation_id) = self.correlation_id {
            ctx.correlation_id = Some(correlation_id);
        }
        if let Some(session_id) = self.session_id {
            ctx.session_id = Some(session_id);
        }
        ctx.extra.extend(self.extra);
        ctx
    }
}

/// RAII guard returned by [`scoped`]. On drop (including unwind), the
/// previously-ambient context is restored -- never destroyed explicitly by
/// user code, per spec §3.
#[derive(Debug)]
pub struct Scope {
    previous: Option<TraceContext>,
    restored: bool,
}

impl Scope {
    /// The context installed for the duration of this scope.
    #[must_use]
    pub fn context(&self) -> Option<TraceContext> {
        current()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !self.restored {
            install(self.previous.take());
            DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        }
    }
}

/// Enter a new ambient trace scope, saving the previous one for restoration
/// on drop. See [`ScopeInputs`] for the selection rules.
#[must_use]
pub fn scoped(inputs: ScopeInputs) -> Scope {
    let depth = DEPTH.with(|d| {
        let next = d.get() + 1;
        d.set(next);
        next
    });
    if depth == MAX_DEPTH + 1 {
        eprintln!(
            "tracelog: trace-context nesting depth exceeded {MAX_DEPTH}; \
             correctness is unaffected but this usually indicates a scope leak"
        );
    }

    let resolved = inputs.resolve();
    let previous = install(Some(resolved));
    Scope { previous, restored: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_installs_and_restores_on_drop() {
        assert!(current().is_none());
        {
            let _scope = scoped(ScopeInputs::new().correlation_id("ord-1"));
            let ctx = current().unwrap();
            assert_eq!(ctx.correlation_id.as_deref(), Some("ord-1"));
        }
        assert!(current().is_none());
    }

    #[test]
    fn nested_scopes_restore_in_lifo_order() {
        let outer = scoped(ScopeInputs::new().correlation_id("outer"));
        {
            let inner = scoped(ScopeInputs::new().correlation_id("inner"));
            assert_eq!(inner.context().unwrap().correlation_id.as_deref(), Some("inner"));
        }
        assert_eq!(outer.context().unwrap().correlation_id.as_deref(), Some("outer"));
    }

    #[test]
    fn scoped_without_explicit_parent_always_starts_a_fresh_root() {
        let outer = scoped(ScopeInputs::new());
        let outer_ctx = outer.context().unwrap();
        let inner = scoped(ScopeInputs::new());
        let inner_ctx = inner.context().unwrap();
        assert_ne!(inner_ctx.trace_id, outer_ctx.trace_id);
        assert!(inner_ctx.parent_span_id.is_none());
    }

    #[test]
    fn scoped_with_explicit_parent_nests_under_it() {
        let outer = scoped(ScopeInputs::new());
        let outer_ctx = outer.context().unwrap();
        let outer_span = outer_ctx.span_id.clone();
        let inner = scoped(ScopeInputs::new().parent(outer_ctx));
        let inner_ctx = inner.context().unwrap();
        assert_eq!(inner_ctx.parent_span_id.as_deref(), Some(outer_span.as_str()));
    }

    #[test]
    fn restore_happens_even_on_panic_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _scope = scoped(ScopeInputs::new().correlation_id("panicking"));
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn task_scope_isolates_concurrent_tasks() {
        let t1 = tokio::spawn(with_task_scope(async {
            let _scope = scoped(ScopeInputs::new().correlation_id("task-1"));
            tokio::task::yield_now().await;
            current().unwrap().correlation_id
        }));
        let t2 = tokio::spawn(with_task_scope(async {
            let _scope = scoped(ScopeInputs::new().correlation_id("task-2"));
            tokio::task::yield_now().await;
            current().unwrap().correlation_id
        }));
        let (r1, r2) = tokio::join!(t1, t2);
        assert_eq!(r1.unwrap().as_deref(), Some("task-1"));
        assert_eq!(r2.unwrap().as_deref(), Some("task-2"));
    }
}
