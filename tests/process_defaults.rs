//! Everything here touches the process-wide defaults, so each test holds
//! the same lock and puts the defaults back when done.

use std::sync::{Mutex, MutexGuard};
use std::thread;

use presence::policy::{self, default_marshal_unset, default_scan_null};
use presence::storage::ValueRef;
use presence::{MarshalUnset, Policies, Presence, ScanNull};
use serde::Serialize;

static DEFAULTS: Mutex<()> = Mutex::new(());

struct Restore<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        Policies::default().install();
    }
}

fn exclusive() -> Restore<'static> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let guard = DEFAULTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Policies::default().install();
    Restore(guard)
}

#[derive(Serialize)]
struct Patch {
    #[serde(skip_serializing_if = "Presence::is_zero_for_omission")]
    name: Presence<String>,
    #[serde(skip_serializing_if = "Presence::is_zero_for_omission")]
    age: Presence<i32>,
}

#[test]
fn starts_with_skip_and_as_null() {
    let _restore = exclusive();
    assert_eq!(default_marshal_unset(), MarshalUnset::Skip);
    assert_eq!(default_scan_null(), ScanNull::AsNull);
    assert_eq!(Policies::current(), Policies::default());
    let p: Presence<String> = Presence::new_unset();
    assert_eq!(p.marshal_unset(), MarshalUnset::Skip);
    assert_eq!(p.scan_null(), ScanNull::AsNull);
}

#[test]
fn marshal_default_is_read_at_call_time() {
    let _restore = exclusive();
    let patch = Patch {
        name: Presence::new_unset(),
        age: Presence::from_value(3),
    };
    assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"age":3}"#);

    policy::set_default_marshal_unset(MarshalUnset::Null);
    // same value, built before the change, follows the new default
    assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"name":null,"age":3}"#);

    let mut pinned: Presence<String> = Presence::new_unset();
    pinned.set_marshal_unset(MarshalUnset::Skip);
    assert!(pinned.is_zero_for_omission());
    pinned.clear_marshal_unset();
    assert!(!pinned.is_zero_for_omission());
}

#[test]
fn scan_default_is_read_at_call_time() {
    let _restore = exclusive();
    let mut p = Presence::from_value(1i16);
    p.scan(ValueRef::Null).unwrap();
    assert!(p.is_null());

    policy::set_default_scan_null(ScanNull::AsUnset);
    p.scan(ValueRef::Null).unwrap();
    assert!(p.is_unset());
    p.set_value(4);
    p.handle_scan_null();
    assert!(p.is_unset());

    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let via_driver: Presence<i16> = conn.query_row("select null", [], |r| r.get(0)).unwrap();
    assert!(via_driver.is_unset());

    let mut pinned = Presence::from_value(1i16);
    pinned.set_scan_null(ScanNull::AsNull);
    pinned.scan(ValueRef::Null).unwrap();
    assert!(pinned.is_null());
    pinned.clear_scan_null();
    assert_eq!(pinned.scan_null(), ScanNull::AsUnset);
}

#[test]
fn install_and_concurrent_readers() {
    let _restore = exclusive();
    let wanted = Policies::new(MarshalUnset::Null, ScanNull::AsUnset);
    wanted.install();
    let readers: Vec<_> = (0..8)
        .map(move |_| thread::spawn(move || (0..1000).all(|_| Policies::current() == wanted)))
        .collect();
    for reader in readers {
        assert!(reader.join().unwrap());
    }
}

#[test]
fn policies_load_from_toml() {
    let _restore = exclusive();
    let text = "marshal_unset = \"null\"\nscan_null = \"as_unset\"\n";
    let loaded = Policies::from_toml_str(text).unwrap();
    assert_eq!(loaded, Policies::new(MarshalUnset::Null, ScanNull::AsUnset));
    let partial = Policies::from_toml_str("scan_null = \"as_unset\"").unwrap();
    assert_eq!(partial.marshal_unset, MarshalUnset::Skip);
    assert_eq!(partial.scan_null, ScanNull::AsUnset);
    assert!(Policies::from_toml_str("scan_null = \"sometimes\"").is_err());
    assert!(Policies::from_file("does/not/exist.toml").is_err());
}

#[test]
fn policies_load_from_env() {
    let _restore = exclusive();
    // SAFETY: the defaults lock keeps the other tests in this binary out
    unsafe {
        std::env::set_var("PRESENCE_SCAN_NULL", "as_unset");
    }
    let loaded = Policies::from_env();
    unsafe {
        std::env::remove_var("PRESENCE_SCAN_NULL");
    }
    let loaded = loaded.unwrap();
    assert_eq!(loaded.scan_null, ScanNull::AsUnset);
    assert_eq!(loaded.marshal_unset, MarshalUnset::Skip);
    loaded.install();
    assert_eq!(default_scan_null(), ScanNull::AsUnset);
}
