use super::*;

#[test]
fn backend_names() {
    assert_eq!(
        Platform::from_backend_name(None).unwrap().backend(),
        BackendKind::Cpu
    );
    assert_eq!(
        Platform::from_backend_name(Some(" cpu ")).unwrap().backend(),
        BackendKind::Cpu
    );
    assert!(Platform::from_backend_name(Some("none")).is_err());
    assert!(Platform::from_backend_name(Some("vulkan")).is_err());
}

#[test]
fn acquire_returns_one_instance() {
    let a = Platform::acquire().unwrap();
    let b = Platform::acquire().unwrap();
    assert!(std::ptr::eq(a, b));

    let before = a.sessions_created();
    let resources = a.create_resources().unwrap();
    assert_eq!(resources.surface.format, a.surface_format());
    assert!(a.sessions_created() > before);
    resources.release();
}
