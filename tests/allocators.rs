//! Tuples on every allocator this crate ships.

use std::ptr::NonNull;

use citeron::{
    alloc::{
        dlmalloc::DlMallocAlloc, tracing::TracingAlloc, AllocError, Allocator, HeapAllocator,
    },
    config::ArenaConfig,
    os::mem::StackAlloc,
    sized::SizedView,
    tuple::{Tuple, TupleError},
};

fn check_scenario(alloc: &dyn Allocator) {
    let tup = citeron::tuple!(in Some(alloc); 1i8, 200i16, 1234i32).unwrap();
    assert_eq!(tup.sizes(), &[1, 2, 4]);
    assert_eq!(tup.offsets(), &[0, 1, 3]);
    assert_eq!(tup.total_size(), 7);
    assert_eq!(tup.read::<i8>(0).unwrap(), 1);
    assert_eq!(tup.read::<i16>(1).unwrap(), 200);
    assert_eq!(tup.read::<i32>(2).unwrap(), 1234);
}

#[test]
fn scenario_on_the_default_allocator() {
    let tup = Tuple::build_in(None, &[SizedView::of(&5u16)]).unwrap();
    assert_eq!(tup.read::<u16>(0).unwrap(), 5);
    check_scenario(&HeapAllocator);
}

#[test]
fn scenario_on_dlmalloc() {
    let alloc = TracingAlloc::new(DlMallocAlloc::new());
    check_scenario(&alloc);
    assert_eq!(alloc.nr_allocations(), 0);
}

#[test]
fn scenario_on_an_arena() {
    let alloc = StackAlloc::with_config(&ArenaConfig::new(4096)).unwrap();
    check_scenario(&alloc);
    assert!(alloc.used() > 0);
}

#[test]
fn arena_exhaustion_rolls_back() {
    let arena = StackAlloc::new(48).unwrap();
    let alloc = TracingAlloc::new(arena);
    let big = [0u8; 64];

    let result = Tuple::build_with(&alloc, &[SizedView::from(&big)]);
    assert!(matches!(
        result,
        Err(TupleError::Alloc(AllocError::Exhausted { requested: 64, .. }))
    ));
    // sizes and offsets were allocated, then given back
    assert_eq!(alloc.nr_allocations(), 0);
}

#[test]
fn arena_reset_after_tuples_are_gone() {
    let mut arena = StackAlloc::new(256).unwrap();
    {
        let tup = Tuple::build_with(&arena, &[SizedView::from("abc")]).unwrap();
        assert_eq!(tup.get_bytes(0).unwrap(), b"abc");
    }
    assert!(arena.used() > 0);
    arena.reset();
    assert_eq!(arena.used(), 0);
}

#[test]
fn tracer_finds_elements_inside_the_data_block() {
    let alloc = TracingAlloc::new(HeapAllocator);
    let tup = Tuple::build_with(&alloc, &[SizedView::from("ab"), SizedView::from("cd")]).unwrap();
    let id = alloc.find(tup.get(1).unwrap().as_ptr()).unwrap();
    assert_eq!(id.size, 4);
    assert_eq!(id.ptr as usize, tup.data().unwrap().as_ptr() as usize);
}

#[test]
fn empty_tuples_on_an_arena_are_fully_released() {
    let alloc = TracingAlloc::new(StackAlloc::new(256).unwrap());
    {
        let empty = Tuple::build_with(&alloc, &[]).unwrap();
        let after = Tuple::build_with(&alloc, &[SizedView::empty()]).unwrap();
        assert_eq!(alloc.nr_allocations(), 6);
        assert_eq!(alloc.live().len(), 6);
        assert_eq!(empty.total_size(), 0);
        assert_eq!(after.get_bytes(0).unwrap(), b"");
    }
    assert_eq!(alloc.nr_allocations(), 0);
    assert!(alloc.live().is_empty());
}

#[test]
fn oversized_input_fails_without_allocating() {
    let alloc = TracingAlloc::new(HeapAllocator);
    // SAFETY: The lengths are only summed; a failing build never reads them.
    let huge = unsafe { SizedView::from_raw_parts(NonNull::dangling(), isize::MAX as usize) };

    let result = Tuple::build_with(&alloc, &[huge, huge]);
    assert!(matches!(result, Err(TupleError::SizeOverflow)));
    assert_eq!(alloc.nr_allocations(), 0);
    assert_eq!(alloc.live_bytes(), 0);
}
