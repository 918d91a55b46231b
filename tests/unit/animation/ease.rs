use super::*;

const SMOOTH: [Ease; 7] = [
    Ease::Linear,
    Ease::InQuad,
    Ease::OutQuad,
    Ease::InOutQuad,
    Ease::InCubic,
    Ease::OutCubic,
    Ease::InOutCubic,
];

#[test]
fn endpoints_are_stable() {
    for ease in SMOOTH.into_iter().chain([Ease::Step]) {
        assert_eq!(ease.apply(0.0), 0.0);
        assert_eq!(ease.apply(1.0), 1.0);
    }
}

#[test]
fn monotonic_spot_check() {
    for ease in SMOOTH {
        let a = ease.apply(0.25);
        let b = ease.apply(0.5);
        let c = ease.apply(0.75);
        assert!(a < b);
        assert!(b < c);
    }
}

#[test]
fn step_holds_until_the_end() {
    assert_eq!(Ease::Step.apply(0.99), 0.0);
    assert_eq!(Ease::Step.apply(2.0), 1.0);
}

#[test]
fn names_deserialize() {
    let e: Ease = serde_json::from_str("\"InOutCubic\"").unwrap();
    assert_eq!(e, Ease::InOutCubic);
    assert_eq!(Ease::default(), Ease::Linear);
}
