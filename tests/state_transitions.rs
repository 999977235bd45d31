use presence::{MarshalUnset, MaybePresence, Presence, ScanNull};

fn exactly_one_state<T>(p: &Presence<T>) -> bool {
    [p.is_unset(), p.is_null(), p.is_value()].iter().filter(|b| **b).count() == 1
}

#[test]
fn constructors_land_in_their_state() {
    let unset: Presence<i32> = Presence::new_unset();
    assert!(unset.is_unset() && !unset.is_set());
    let null: Presence<i32> = Presence::null();
    assert!(null.is_null() && null.is_set() && !null.is_value());
    let value = Presence::from_value(7);
    assert!(value.is_value() && value.is_set() && !value.is_null());
    let default: Presence<String> = Presence::default();
    assert!(default.is_unset(), "default construction is unset, not null");
    for p in [&unset, &null, &value] {
        assert!(exactly_one_state(p));
    }
}

#[test]
fn transitions_replace_state() {
    let mut p = Presence::from_value("a".to_string());
    p.set_null();
    assert!(p.is_null());
    assert_eq!(p.get(), None);
    p.set_value("b".to_string());
    assert_eq!(p.get().map(String::as_str), Some("b"));
    p.unset();
    assert!(p.is_unset());
    assert!(exactly_one_state(&p));
}

#[test]
fn optional_setter_maps_none_to_null() {
    let mut p: Presence<u8> = Presence::new_unset();
    p.set_value_from_optional(None);
    assert!(p.is_null());
    p.set_value_from_optional(Some(3));
    assert_eq!(p, Presence::from_value(3));
    assert!(Presence::<u8>::from_optional(None).is_null());
}

#[test]
fn unset_and_set_null_are_idempotent() {
    let mut once = Presence::from_value(1);
    once.unset();
    let mut twice = Presence::from_value(1);
    twice.unset();
    twice.unset();
    assert_eq!(once, twice);

    let mut once = Presence::from_value(1);
    once.set_null();
    let mut twice = Presence::from_value(1);
    twice.set_null();
    twice.set_null();
    assert_eq!(once, twice);
}

#[test]
fn accessors() {
    let value = Presence::from_value(5);
    let null: Presence<i32> = Presence::null();
    let unset: Presence<i32> = Presence::new_unset();

    assert_eq!(value.get(), Some(&5));
    assert_eq!(value.as_pointer(), Some(&5));
    assert_eq!(null.as_pointer(), None);

    assert_eq!(value.get_owned_or(9), 5);
    assert_eq!(null.get_owned_or(9), 9);
    assert_eq!(unset.get_owned_or(9), 9);

    assert_eq!(value.get_with_flag(), (5, true));
    assert_eq!(null.get_with_flag(), (0, false));
    assert_eq!(unset.get_with_flag(), (0, false));

    assert_eq!(value.get_or_panic(), 5);
    assert_eq!(value.clone().into_option(), Some(5));
    assert_eq!(null.clone().into_nested(), Some(None));
    assert_eq!(unset.clone().into_nested(), None);
}

#[test]
#[should_panic(expected = "precondition violated")]
fn get_or_panic_on_null() {
    Presence::<i32>::null().get_or_panic();
}

#[test]
#[should_panic(expected = "precondition violated")]
fn get_or_panic_on_unset() {
    Presence::<i32>::new_unset().get_or_panic();
}

#[test]
fn missing_container_reads_like_unset() {
    let missing: Option<&Presence<i32>> = None;
    assert!(missing.is_unset());
    assert!(!missing.is_null());
    assert!(!missing.is_set());
    assert!(!missing.is_value());
    assert_eq!(missing.get(), None);
    assert_eq!(missing.get_owned_or(4), 4);
    assert_eq!(missing.as_pointer(), None);
    assert_eq!(missing.get_with_flag(), (0, false));
    assert_eq!(missing.marshal_unset(), MarshalUnset::Skip);
    assert_eq!(missing.scan_null(), ScanNull::AsNull);
    assert!(missing.is_zero_for_omission());

    let held = Presence::from_value(2);
    let present = Some(&held);
    assert!(present.is_value());
    assert_eq!(present.get(), Some(&2));

    let owned: Option<Presence<i32>> = Some(Presence::null());
    assert!(owned.is_null());
    assert!(None::<Presence<i32>>.is_unset());
    assert_eq!(None::<Presence<i32>>.get_with_flag(), (0, false));
    assert!(None::<Presence<i32>>.is_zero_for_omission());
}

#[test]
fn present_container_answers_for_itself() {
    let mut held = Presence::from_value(5);
    held.set_scan_null(ScanNull::AsUnset);
    let present = Some(&held);
    assert_eq!(present.as_pointer(), Some(&5));
    assert_eq!(present.get_with_flag(), (5, true));
    assert_eq!(present.scan_null(), ScanNull::AsUnset);
    assert!(!present.is_zero_for_omission());

    let mut unset: Presence<i32> = Presence::new_unset();
    unset.set_marshal_unset(MarshalUnset::Null);
    let owned = Some(unset);
    assert_eq!(owned.marshal_unset(), MarshalUnset::Null);
    assert!(!owned.is_zero_for_omission());
}

#[test]
fn equality_ignores_overrides() {
    let mut a = Presence::from_value(1);
    a.set_marshal_unset(MarshalUnset::Null);
    a.set_scan_null(ScanNull::AsUnset);
    assert_eq!(a, Presence::from_value(1));
    assert_ne!(Presence::<i32>::null(), Presence::new_unset());
    assert_eq!(format!("{:?}", a), "Value(1)");
    assert_eq!(Presence::<i32>::null().to_string(), "null");
}
