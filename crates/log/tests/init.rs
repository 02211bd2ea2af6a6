//! Global subscriber installation.
//!
//! Kept in a single test: the subscriber is process-global, so ordering
//! between separate tests would be racy.

use folio_log::{Config, LogError};

#[test]
fn test_install_reload_and_reinstall() {
    let mut config = Config::test();
    config.reloadable = true;

    let guard = folio_log::init_with(config).expect("first install succeeds");
    let handle = guard.reload_handle().expect("reloadable config exposes a handle");
    assert_eq!(handle.current_filter(), "trace");

    handle.reload("warn").expect("valid directive reloads");
    assert_eq!(handle.current_filter(), "warn");

    let err = handle.reload("[[[").expect_err("invalid directive is rejected");
    assert!(matches!(err, LogError::Filter { .. }));
    assert_eq!(handle.current_filter(), "warn");

    folio_log::warn!(component = "test", "still logging after reload");

    let second = folio_log::init_with(Config::default());
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));

    // init_test tolerates an existing subscriber
    assert!(folio_log::init_test().is_ok());
}
