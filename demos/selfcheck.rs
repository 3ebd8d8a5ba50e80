//! Walks the whole API once on the default allocator: allocate three values,
//! pack them, read them back every way there is, release, destroy. Fails if
//! anything doesn't round-trip.
//!
//! `CITERON_LOG=debug cargo run --example selfcheck`

use std::{process::ExitCode, slice};

use citeron::{
    alloc::{allocate_or_default, release_or_default},
    logging,
    sized::SizedView,
    tuple::{Tuple, TupleState},
};

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(()) => {
            println!("selfcheck passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("selfcheck failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // allocator allocation
    let a = allocate_or_default(None, 1)?;
    let b = allocate_or_default(None, 2)?;
    let c = allocate_or_default(None, 4)?;
    // SAFETY: Fresh blocks of exactly these sizes, aligned to `MIN_ALIGN`.
    unsafe {
        a.cast::<i8>().as_ptr().write(1);
        b.cast::<i16>().as_ptr().write(200);
        c.cast::<i32>().as_ptr().write(1234);
    }
    // SAFETY: Each view covers exactly one of the blocks above, which stay
    //         allocated and untouched until after the tuple is built.
    let views = unsafe {
        [
            SizedView::from_raw_parts(a, 1),
            SizedView::from_raw_parts(b, 2),
            SizedView::from_raw_parts(c, 4),
        ]
    };

    // tuple creation
    let mut tup = Tuple::build_in(None, &views)?;
    let Some(data) = tup.data() else {
        return Err("freshly built tuple has no data".into());
    };
    for (i, view) in views.iter().enumerate() {
        let (offset, size) = (tup.offsets()[i], tup.sizes()[i]);
        assert_eq!(&data[offset..offset + size], view.as_slice());
    }

    // tuple access
    for (i, view) in views.iter().enumerate() {
        let ptr = tup.get(i)?;
        // SAFETY: `get()` points at `sizes()[i]` readable bytes.
        let bytes = unsafe { slice::from_raw_parts(ptr.as_ptr(), tup.sizes()[i]) };
        assert_eq!(bytes, view.as_slice());
        assert_eq!(tup.get_sized(i)?.as_slice(), view.as_slice());
    }
    assert_eq!(tup.read::<i8>(0)?, 1);
    assert_eq!(tup.read::<i16>(1)?, 200);
    assert_eq!(tup.read::<i32>(2)?, 1234);
    log::info!("{tup:?}");

    // allocator freeing; the tuple holds its own copies
    // SAFETY: Each block is released once, with the size it was allocated with.
    unsafe {
        release_or_default(None, a, 1);
        release_or_default(None, b, 2);
        release_or_default(None, c, 4);
    }
    assert_eq!(tup.read::<i32>(2)?, 1234);

    // tuple freeing
    tup.destroy();
    assert_eq!(tup.state(), TupleState::Freed);
    assert!(tup.data().is_none());
    assert!(tup.offsets().is_empty());
    assert!(tup.sizes().is_empty());

    println!("{}", serde_json::to_string(&tup.layout())?);
    Ok(())
}
