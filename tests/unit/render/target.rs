use super::*;

fn size(w: u32, h: u32) -> Size {
    Size::new(w, h).unwrap()
}

#[test]
fn ensure_reallocates_only_on_size_change() {
    let mut slot = None;
    assert!(RenderTarget::ensure(&mut slot, size(4, 4)).unwrap());
    assert!(!RenderTarget::ensure(&mut slot, size(4, 4)).unwrap());
    assert!(RenderTarget::ensure(&mut slot, size(8, 2)).unwrap());
    let target = slot.unwrap();
    assert_eq!(target.size(), size(8, 2));
    assert_eq!(target.dims_u16(), (8, 2));
}

#[test]
fn oversized_and_empty_targets_are_rejected() {
    assert!(RenderTarget::new(size(70_000, 1)).is_err());
    assert!(
        RenderTarget::new(Size {
            width: 0,
            height: 3
        })
        .is_err()
    );
}

#[test]
fn read_back_requires_a_draw() {
    let mut target = RenderTarget::new(size(2, 2)).unwrap();
    assert!(matches!(
        target.read_back(PixelFormat::Rgba8Premul, size(2, 2)),
        Err(OffsceneError::Render(_))
    ));

    target.mark_drawn();
    let img = target.read_back(PixelFormat::Rgba8, size(2, 2)).unwrap();
    assert_eq!((img.width, img.height), (2, 2));
    assert_eq!(img.data.len(), 16);

    // Each draw is read at most once.
    assert!(target.read_back(PixelFormat::Rgba8, size(2, 2)).is_err());
}

#[test]
fn read_back_returns_the_requested_size() {
    let mut target = RenderTarget::new(size(8, 6)).unwrap();
    target.mark_drawn();
    let img = target.read_back(PixelFormat::Rgba8Premul, size(4, 3)).unwrap();
    assert_eq!((img.width, img.height), (4, 3));
    assert_eq!(img.data.len(), 4 * 3 * 4);
    assert!(img.data.iter().all(|&b| b == 0));
    assert_eq!(target.size(), size(8, 6));
}
