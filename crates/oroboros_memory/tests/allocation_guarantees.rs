//! Integration tests for the allocation guarantees of the memory layer.
//!
//! Every test runs under a [`MemoryGuard`], which reads the calling thread's
//! counters, so tests stay independent when the harness runs them in parallel.

use oroboros_memory::{
    Array, InlineArray, MemoryGuard, SmallString, StringOps, StringView, MAX_SMALL_LENGTH,
};

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn test_array_reserve_allocates_exactly_once() {
    let guard = MemoryGuard::new();
    let mut array: Array<u32> = Array::new();
    array.reserve(5);

    assert_eq!(guard.allocations(), 1);
    assert_eq!(guard.live_bytes(), 5 * 4);
    assert_eq!(array.len(), 0);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_string_at_inline_threshold_does_not_allocate() {
    let guard = MemoryGuard::new();
    let string = SmallString::from("123456789abcdef");

    assert_eq!(MAX_SMALL_LENGTH, 15);
    assert_eq!(guard.allocations(), 0);
    assert!(string.is_small());
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_string_past_inline_threshold_allocates_once() {
    let guard = MemoryGuard::new();
    let string = SmallString::from("0123456789abcdef");

    assert_eq!(guard.allocations(), 1);
    assert_eq!(guard.live_bytes(), 17);
    assert!(!string.is_small());
}

#[test]
fn test_inline_array_promotes_once() {
    let guard = MemoryGuard::new();
    let mut array: InlineArray<u32, 2> = InlineArray::new();
    array.add(4);
    array.add(2);
    assert_eq!(guard.allocations(), 0);

    array.add(69);
    assert_eq!(guard.allocations(), 1);
    assert!(array.capacity() >= 3);
    assert_eq!(array.as_slice(), &[4, 2, 69]);
}

#[test]
fn test_view_find_index() {
    let view = StringView::from("Hello world!");
    assert_eq!(view.find_index("world"), Some(6));
    assert_eq!(view.find_index("missing"), None);
}

// =============================================================================
// PROPERTIES
// =============================================================================

#[test]
fn test_inline_array_never_allocates_within_threshold() {
    let guard = MemoryGuard::new();
    let mut array: InlineArray<u64, 16> = InlineArray::new();
    for i in 0..16 {
        array.add(i);
    }
    array.reserve(16);
    array.resize(10, 0);
    array.shrink_to_fit();

    assert!(array.is_inline());
    assert_eq!(guard.allocations(), 0);
}

#[test]
fn test_string_never_allocates_within_threshold() {
    let guard = MemoryGuard::new();
    let mut string = SmallString::new();
    for _ in 0..MAX_SMALL_LENGTH {
        string.push(b'#');
    }
    string.reserve(MAX_SMALL_LENGTH);

    assert!(string.is_small());
    assert_eq!(guard.allocations(), 0);

    string.push(b'#');
    assert_eq!(guard.allocations(), 1);
}

#[test]
fn test_values_survive_promotion_and_demotion() {
    let guard = MemoryGuard::new();
    let mut array: InlineArray<u64, 4> = InlineArray::new();
    array.extend([0xDEAD_BEEF, 0x0123_4567_89AB_CDEF, u64::MAX]);

    array.reserve(64);
    assert!(!array.is_inline());
    assert_eq!(array.as_slice(), &[0xDEAD_BEEF, 0x0123_4567_89AB_CDEF, u64::MAX]);

    array.resize(40, 7);
    array.resize(2, 0);
    array.shrink_to_fit();
    assert!(array.is_inline());
    assert_eq!(array.as_slice(), &[0xDEAD_BEEF, 0x0123_4567_89AB_CDEF]);

    array.resize(9, 1);
    assert!(!array.is_inline());
    assert_eq!(array[..2], [0xDEAD_BEEF, 0x0123_4567_89AB_CDEF]);
    assert!(array[2..].iter().all(|&value| value == 1));

    drop(array);
    assert_eq!(guard.live_allocations(), 0);
}

#[test]
fn test_string_stays_terminated() {
    let mut string = SmallString::new();
    let check = |string: &SmallString| {
        assert_eq!(string.as_bytes_with_nul().last(), Some(&0));
        assert_eq!(string.as_bytes_with_nul().len(), string.len() + 1);
    };

    check(&string);
    string.push_str("short");
    check(&string);
    string.push_str(" and now considerably longer");
    check(&string);
    string.truncate(3);
    check(&string);
    string.resize(70, b'.');
    check(&string);
    string.assign(b"reset");
    check(&string);
    string.shrink_to_fit();
    check(&string);
    string.clear();
    check(&string);
}

#[test]
fn test_add_never_reallocates_every_call() {
    let guard = MemoryGuard::new();
    let mut array: Array<u32> = Array::new();
    for i in 0..4096 {
        array.add(i);
        assert!(array.capacity().is_power_of_two());
        assert!(array.capacity() >= array.len());
    }
    // 4, 8, ..., 4096
    assert_eq!(guard.allocations() + guard.reallocations(), 11);
}

#[test]
fn test_move_empties_source() {
    let guard = MemoryGuard::new();

    let mut array: InlineArray<u32, 2> = (0..10).collect();
    let moved = std::mem::take(&mut array);
    assert_eq!(array.capacity(), 0);
    assert!(array.is_empty());
    assert_eq!(moved.len(), 10);
    array.add(1);

    let mut string = SmallString::from("long enough to live on the heap");
    let moved_string = std::mem::take(&mut string);
    assert!(string.is_small());
    assert!(string.is_empty());
    assert_eq!(moved_string, "long enough to live on the heap");

    drop((moved, moved_string, array, string));
    assert_eq!(guard.live_allocations(), 0);
}

#[test]
fn test_copies_are_independent() {
    let original: Array<u32> = (0..32).collect();
    let mut copy = original.clone();
    assert_ne!(copy.as_ptr(), original.as_ptr());
    copy[0] = 99;
    assert_eq!(original[0], 0);

    let text = SmallString::from("independent heap resident text");
    let mut text_copy = text.clone();
    assert_ne!(text_copy.as_ptr(), text.as_ptr());
    text_copy[0] = b'I';
    assert_eq!(text[0], b'i');
}

#[test]
fn test_views_borrow_owned_strings() {
    let path = SmallString::from("assets/textures/stone_albedo.png");
    let view = path.as_view();
    let Some(slash) = view.find_byte(b'/') else {
        panic!("path has no directory separator");
    };

    assert_eq!(view.left_of(slash), "assets");
    assert_eq!(view.right_of(slash).take_left(8), "textures");
    assert!(path.ends_with(".png"));
    assert!(view.chop_right(4).eq_bytes("assets/textures/stone_albedo"));
}
