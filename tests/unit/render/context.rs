use super::*;

#[test]
fn current_is_per_thread() {
    let surface = OffscreenSurface::new(SurfaceFormat::default());
    let mut ctx = CpuContext::new(SurfaceFormat::default());
    assert!(!ctx.is_current());
    ctx.make_current(&surface).unwrap();
    assert!(ctx.is_current());

    let ctx = std::thread::spawn(move || {
        let seen = ctx.is_current();
        (ctx, seen)
    })
    .join()
    .unwrap();
    assert!(!ctx.1);

    let mut ctx = ctx.0;
    ctx.done_current();
    assert!(!ctx.is_current());
}

#[test]
fn mismatched_surface_fails_to_acquire() {
    let surface = OffscreenSurface::new(SurfaceFormat {
        depth_bits: 24,
        stencil_bits: 8,
    });
    let mut ctx = create_context(BackendKind::Cpu, SurfaceFormat::default()).unwrap();
    let err = ctx.make_current(&surface).unwrap_err();
    assert!(matches!(err, OffsceneError::ContextAcquire(_)));
    assert!(!ctx.is_current());
}

#[test]
fn backend_names_parse() {
    assert_eq!("CPU".parse::<BackendKind>().unwrap(), BackendKind::Cpu);
    assert!("metal".parse::<BackendKind>().is_err());
}
