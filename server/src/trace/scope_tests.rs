//! Tests for scope management

use super::*;

fn ctx() -> TraceContext {
    TraceContext::root()
}

#[test]
fn test_empty_stack_has_no_current() {
    let scope = ScopeStack::new();
    assert_eq!(scope.current(), None);
    assert_eq!(scope.depth(), 0);
}

#[test]
fn test_enter_exit_restores_previous() {
    let scope = ScopeStack::new();
    let outer = ctx();
    let inner = ctx();

    let outer_token = scope.enter(outer.clone());
    assert_eq!(scope.current(), Some(outer.clone()));

    let inner_token = scope.enter(inner.clone());
    assert_eq!(scope.current(), Some(inner));

    scope.exit(inner_token);
    assert_eq!(scope.current(), Some(outer));

    scope.exit(outer_token);
    assert_eq!(scope.current(), None);
}

#[test]
fn test_out_of_order_exit_truncates() {
    let scope = ScopeStack::new();
    let a = scope.enter(ctx());
    let _b = scope.enter(ctx());
    let _c = scope.enter(ctx());

    // Exiting the bottom scope unwinds everything above it.
    scope.exit(a);
    assert_eq!(scope.depth(), 0);
}

#[test]
fn test_exit_after_unwind_is_noop() {
    let scope = ScopeStack::new();
    let a = scope.enter(ctx());
    let b = scope.enter(ctx());

    scope.exit(a);
    assert_eq!(scope.depth(), 0);

    scope.exit(b);
    assert_eq!(scope.depth(), 0);
}

#[test]
fn test_guard_releases_on_drop() {
    let scope = ScopeStack::new();
    let outer = ctx();
    let _outer_guard = scope.attach(outer.clone());

    {
        let _inner_guard = scope.attach(ctx());
        assert_eq!(scope.depth(), 2);
    }

    assert_eq!(scope.current(), Some(outer));
}

#[test]
fn test_guard_releases_on_early_return() {
    fn traced(scope: &ScopeStack, fail: bool) -> Result<(), ()> {
        let _guard = scope.attach(ctx());
        if fail {
            return Err(());
        }
        Ok(())
    }

    let scope = ScopeStack::new();
    let before = scope.depth();
    assert!(traced(&scope, false).is_ok());
    assert_eq!(scope.depth(), before);
    assert!(traced(&scope, true).is_err());
    assert_eq!(scope.depth(), before);
}

#[test]
fn test_guard_releases_on_panic() {
    let scope = ScopeStack::new();
    let outer = ctx();
    let _outer_guard = scope.attach(outer.clone());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = scope.attach(ctx());
        panic!("injected failure");
    }));
    assert!(result.is_err());

    // The panicked scope was released during unwind.
    assert_eq!(scope.current(), Some(outer));
}

#[tokio::test]
async fn test_independent_units_do_not_share_scopes() {
    // Two logical requests on independent execution units each own a stack;
    // entering scopes on one must never be visible to the other.
    let first = tokio::spawn(async {
        let scope = ScopeStack::new();
        let c = ctx();
        let _guard = scope.attach(c.clone());
        tokio::task::yield_now().await;
        assert_eq!(scope.current(), Some(c));
        scope.depth()
    });
    let second = tokio::spawn(async {
        let scope = ScopeStack::new();
        tokio::task::yield_now().await;
        assert_eq!(scope.current(), None);
        scope.depth()
    });

    assert_eq!(first.await.unwrap(), 1);
    assert_eq!(second.await.unwrap(), 0);
}
