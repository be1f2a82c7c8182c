//! Tests for CalibrationStore
//!
//! These tests verify:
//! - Lifecycle (begin/end/re-begin)
//! - Typed set/get round-trips and default handling
//! - Existence, removal and wipe
//! - Behaviour of every call on an uninitialized store
//! - Last-error latching
//! - Strict validation and capacity accounting

use calstore::{
    BatchMode, CalibrationStore, DebugLevel, ErrorCode, KvBackend, MemoryBackend, StoreConfig,
    StoredValue, Value, ValueType,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> CalibrationStore<MemoryBackend> {
    let mut store = CalibrationStore::new(MemoryBackend::new());
    store.begin("calib").unwrap();
    store
}

fn setup_store_with(config: StoreConfig) -> CalibrationStore<MemoryBackend> {
    let mut store = CalibrationStore::with_config(MemoryBackend::new(), config);
    store.begin("calib").unwrap();
    store
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_new_store_is_inert() {
    let store = CalibrationStore::new(MemoryBackend::new());

    assert!(!store.is_initialized());
    assert_eq!(store.namespace(), None);
    assert_eq!(store.last_error(), ErrorCode::Ok);
    assert!(!store.is_encryption_enabled());
    assert!(!store.in_batch());
    assert_eq!(store.debug_level(), DebugLevel::None);
}

#[test]
fn test_begin_and_end() {
    let mut store = CalibrationStore::new(MemoryBackend::new());

    store.begin("calib").unwrap();
    assert!(store.is_initialized());
    assert_eq!(store.namespace(), Some("calib"));

    store.end();
    assert!(!store.is_initialized());
    assert_eq!(store.namespace(), None);

    // Idempotent
    store.end();
    assert!(!store.is_initialized());
}

#[test]
fn test_begin_without_namespace_fails() {
    let mut store = CalibrationStore::new(MemoryBackend::new());

    assert!(store.begin("").is_err());
    assert!(!store.is_initialized());
    assert_eq!(store.last_error(), ErrorCode::NotInitialized);
}

#[test]
fn test_begin_reopens_other_namespace() {
    let mut store = setup_store();
    store.set_value("gain", 3).unwrap();

    store.begin("factory").unwrap();
    assert_eq!(store.namespace(), Some("factory"));
    assert!(!store.has_value("gain"));

    store.begin("calib").unwrap();
    assert_eq!(store.get_value("gain", 0).value, 3);
}

#[test]
fn test_entries_persist_across_store_instances() {
    let flash = MemoryBackend::new();

    let mut first = CalibrationStore::new(flash.clone());
    first.begin("calib").unwrap();
    first.set_value("offset", -17).unwrap();
    first.set_value("scale", 1.5f32).unwrap();
    first.end();

    let mut second = CalibrationStore::new(flash);
    second.begin("calib").unwrap();
    assert_eq!(second.get_value("offset", 0).value, -17);
    assert_eq!(second.get_value("scale", 0.0f32).value, 1.5);
}

// =============================================================================
// Value Tests
// =============================================================================

#[test]
fn test_int_round_trip() {
    let mut store = setup_store();

    for v in [0, 1, -1, i32::MAX, i32::MIN, 42] {
        store.set_value("int_key", v).unwrap();
        let lookup = store.get_value("int_key", if v == 7 { 8 } else { 7 });
        assert!(lookup.found);
        assert_eq!(lookup.value, v);
    }
}

#[test]
fn test_float_round_trip() {
    let mut store = setup_store();

    for v in [0.0f32, -2.5, 3.25, f32::MAX, f32::MIN_POSITIVE] {
        store.set_value("float_key", v).unwrap();
        let lookup = store.get_value("float_key", 99.0f32);
        assert!(lookup.found);
        assert_eq!(lookup.value, v);
    }
}

#[test]
fn test_string_round_trip() {
    let mut store = setup_store();

    for v in ["", "x", "sensor A / rev 3", "ünïcødé"] {
        store.set_value("str_key", v).unwrap();
        let lookup = store.get_value("str_key", "default".to_string());
        assert!(lookup.found);
        assert_eq!(lookup.value, v);
    }
}

#[test]
fn test_last_write_wins() {
    let mut store = setup_store();

    store.set_value("k", 1).unwrap();
    store.set_value("k", 2).unwrap();
    assert_eq!(store.get_value("k", 0).value, 2);
    assert_eq!(store.used_space(), 1);
}

#[test]
fn test_missing_key_returns_default() {
    let mut store = setup_store();

    let lookup = store.get_value("absent", 55);
    assert!(!lookup.found);
    assert_eq!(lookup.value, 55);
    assert_eq!(store.last_error(), ErrorCode::Ok);
}

#[test]
fn test_cross_type_read_returns_default() {
    let mut store = setup_store();
    store.set_value("gain", 2.5f32).unwrap();

    let as_int = store.get_value("gain", -1);
    assert_eq!(as_int.value, -1);
    assert!(as_int.found);

    let as_str = store.get_value("gain", "none".to_string());
    assert_eq!(as_str.value, "none");

    assert_eq!(store.get_value("gain", 0.0f32).value, 2.5);
}

#[test]
fn test_read_value_reports_stored_type() {
    let mut store = setup_store();
    store.set_value("a", 5).unwrap();
    store.set_value("b", 2.5f32).unwrap();
    store.set_value("c", "x").unwrap();

    assert_eq!(store.read_value("a").unwrap(), Some(Value::Int(5)));
    assert_eq!(store.read_value("b").unwrap(), Some(Value::Float(2.5)));
    assert_eq!(store.read_value("c").unwrap(), Some(Value::Str("x".into())));
    assert_eq!(store.read_value("d").unwrap(), None);

    assert_eq!(store.value_type("a"), Some(ValueType::Int));
    assert_eq!(store.value_type("d"), None);
}

#[test]
fn test_has_and_remove_value() {
    let mut store = setup_store();
    store.set_value("temp_off", 4).unwrap();

    assert!(store.has_value("temp_off"));
    assert!(store.remove_value("temp_off").unwrap());
    assert!(!store.has_value("temp_off"));
    assert!(!store.remove_value("temp_off").unwrap());
}

#[test]
fn test_clear_all_wipes_entries_and_metadata() {
    let mut store = setup_store();
    store.set_value("a", 1).unwrap();
    store.set_value("b", "two").unwrap();
    store.set_version("1.0").unwrap();

    store.clear_all().unwrap();

    assert_eq!(store.used_space(), 0);
    assert!(!store.has_value("a"));
    assert!(!store.get_version().found);
}

// =============================================================================
// Uninitialized Store Tests
// =============================================================================

#[test]
fn test_uninitialized_store_fails_closed() {
    let mut store = CalibrationStore::new(MemoryBackend::new());

    assert!(store.set_value("k", 1).is_err());
    assert_eq!(store.last_error(), ErrorCode::NotInitialized);

    let int = store.get_value("k", 11);
    assert_eq!((int.value, int.found), (11, false));

    let float = store.get_value("k", 1.25f32);
    assert_eq!((float.value, float.found), (1.25, false));

    let string = store.get_value("k", "fallback".to_string());
    assert_eq!(string.value, "fallback");
    assert!(!string.found);

    assert!(!store.has_value("k"));
    assert!(store.remove_value("k").is_err());
    assert!(store.clear_all().is_err());
    assert!(store.read_value("k").is_err());
    assert!(store.export_to_json().is_err());
    assert!(store.import_from_json(r#"{"a":1}"#).is_err());
    assert!(store.set_version("1.0").is_err());
    assert_eq!(store.get_version().value, "");
    assert!(store.set_timestamp(123).is_err());
    assert_eq!(store.get_timestamp().value, 0);
    assert!(store.batch_begin().is_err());
    assert!(store.batch_commit().is_err());
    assert!(store.batch_rollback().is_err());
    assert_eq!(store.free_space(), 0);
    assert_eq!(store.used_space(), 0);
    assert_eq!(store.value_type("k"), None);

    assert_eq!(store.last_error(), ErrorCode::NotInitialized);
}

#[test]
fn test_store_unusable_after_end() {
    let mut store = setup_store();
    store.set_value("k", 1).unwrap();
    store.end();

    assert!(store.set_value("k", 2).is_err());
    assert_eq!(store.get_value("k", 0).value, 0);
}

// =============================================================================
// Error Slot Tests
// =============================================================================

#[test]
fn test_last_error_latches_until_cleared() {
    let mut store = setup_store();

    assert!(store.enable_encryption("short").is_err());
    assert_eq!(store.last_error(), ErrorCode::EncryptionError);

    // Successful calls leave the slot alone
    store.set_value("k", 1).unwrap();
    assert_eq!(store.last_error(), ErrorCode::EncryptionError);

    store.clear_error();
    assert_eq!(store.last_error(), ErrorCode::Ok);
}

#[test]
fn test_last_error_overwritten_by_next_failure() {
    let mut store = setup_store();

    assert!(store.enable_encryption("short").is_err());
    assert!(store.batch_commit().is_err());
    assert_eq!(store.last_error(), ErrorCode::NotInitialized);
}

#[test]
fn test_backend_write_failure_sets_write_error() {
    let flash = MemoryBackend::new();
    let mut store = CalibrationStore::new(flash.clone());
    store.begin("calib").unwrap();

    flash.set_fail_writes(true);
    assert!(store.set_value("k", 1).is_err());
    assert_eq!(store.last_error(), ErrorCode::WriteError);
    assert!(!store.has_value("k"));

    flash.set_fail_writes(false);
    store.set_value("k", 1).unwrap();
    assert!(store.has_value("k"));
}

#[test]
fn test_error_code_descriptions() {
    assert_eq!(ErrorCode::Ok.description(), "No error");
    assert_eq!(ErrorCode::NotInitialized.description(), "Library not initialized");
    assert_eq!(ErrorCode::InvalidParam.description(), "Invalid parameter");
    assert_eq!(ErrorCode::WriteError.description(), "Write error");
    assert_eq!(ErrorCode::ReadError.description(), "Read error");
    assert_eq!(ErrorCode::MemoryError.description(), "Memory error");
    assert_eq!(ErrorCode::EncryptionError.description(), "Encryption error");

    assert_eq!(ErrorCode::Ok.as_i32(), 0);
    assert_eq!(ErrorCode::EncryptionError.as_i32(), -6);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_lenient_store_accepts_any_key() {
    let mut store = setup_store();

    store.set_value("not a valid key!", 1).unwrap();
    assert_eq!(store.get_value("not a valid key!", 0).value, 1);
}

#[test]
fn test_strict_store_rejects_bad_keys_and_values() {
    let mut store = setup_store_with(StoreConfig::builder().strict_validation(true).build());

    assert!(store.set_value("bad key", 1).is_err());
    assert_eq!(store.last_error(), ErrorCode::InvalidParam);
    assert!(store.set_value("this_key_is_too_long", 1).is_err());
    assert!(store.set_value("_version", "9.9").is_err());
    assert!(store.set_value("empty", "").is_err());
    assert!(store.set_value("huge", "x".repeat(4097)).is_err());
    assert_eq!(store.used_space(), 0);

    store.set_value("good_key", 1).unwrap();
    store.set_value("max_str", "x".repeat(4096)).unwrap();
    assert_eq!(store.used_space(), 2);
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_free_and_used_space() {
    let mut store = CalibrationStore::new(MemoryBackend::with_max_entries(4));
    store.begin("calib").unwrap();

    assert_eq!(store.free_space(), 4);
    assert_eq!(store.used_space(), 0);

    store.set_value("a", 1).unwrap();
    store.set_timestamp(1000).unwrap();
    assert_eq!(store.free_space(), 2);
    assert_eq!(store.used_space(), 2);
}

#[test]
fn test_full_namespace_rejects_new_keys() {
    let mut store = CalibrationStore::new(MemoryBackend::with_max_entries(2));
    store.begin("calib").unwrap();

    store.set_value("a", 1).unwrap();
    store.set_value("b", 2).unwrap();
    assert!(store.set_value("c", 3).is_err());
    assert_eq!(store.last_error(), ErrorCode::WriteError);

    // Overwrites do not need a new entry
    store.set_value("a", 10).unwrap();
    assert_eq!(store.get_value("a", 0).value, 10);
}

// =============================================================================
// Misc Tests
// =============================================================================

#[test]
fn test_debug_level_is_adjustable() {
    let mut store = setup_store_with(
        StoreConfig::builder()
            .debug_level(DebugLevel::Info)
            .batch_mode(BatchMode::Immediate)
            .build(),
    );
    assert_eq!(store.debug_level(), DebugLevel::Info);

    store.set_debug_level(DebugLevel::Verbose);
    assert_eq!(store.debug_level(), DebugLevel::Verbose);
    assert!(DebugLevel::Verbose.allows(DebugLevel::Error));
    assert!(!DebugLevel::Error.allows(DebugLevel::Info));
    assert!(!DebugLevel::Verbose.allows(DebugLevel::None));
}

#[test]
fn test_backend_sees_plain_typed_values() {
    let mut store = setup_store();
    store.set_value("a", 5).unwrap();
    store.set_value("c", "x").unwrap();

    let backend = store.backend();
    assert_eq!(backend.get("a").unwrap(), Some(StoredValue::Int(5)));
    assert_eq!(backend.get("c").unwrap(), Some(StoredValue::Str("x".into())));
}
