use super::*;

#[test]
fn elapsed_is_exact_multiple_of_step() {
    let mut clock = DeterministicClock::new(41).unwrap();
    for n in 1..=500u64 {
        let e = clock.advance();
        assert_eq!(e, n * 41);
    }
    assert_eq!(clock.elapsed(), 500 * 41);
    assert_eq!(clock.advances(), 500);
}

#[test]
fn zero_step_is_rejected() {
    assert!(DeterministicClock::new(0).is_err());
}

#[test]
fn step_undercounts_two_frames() {
    let fps = Fps::new(25, 1).unwrap();
    // 100 frames over 4 s -> corrected fps 24 -> 1000 / 24.
    assert_eq!(step_for_timeline(fps, 4_000), 41);
    // 250 frames over 10 s -> corrected fps 24.
    assert_eq!(step_for_timeline(fps, 10_000), 41);

    let fps = Fps::new(50, 1).unwrap();
    assert_eq!(step_for_timeline(fps, 1_000), 20);
}

#[test]
fn step_uses_the_real_length_of_short_timelines() {
    let fps = Fps::new(25, 1).unwrap();
    // 20 frames over 0.8 s -> corrected fps 18 * 1000 / 800 = 22.
    assert_eq!(step_for_timeline(fps, 800), 45);
    // 38 frames over 1.5 s -> corrected fps 24.
    assert_eq!(step_for_timeline(fps, 1_500), 41);
    // The last frame lands at or past the end of the timeline.
    assert!(19 * step_for_timeline(fps, 800) >= 800);
    assert!(37 * step_for_timeline(fps, 1_500) >= 1_500);
}

#[test]
fn step_falls_back_to_nominal_fps() {
    let fps = Fps::new(25, 1).unwrap();
    assert_eq!(step_for_timeline(fps, 0), 40);

    let slow = Fps::new(1, 1).unwrap();
    assert_eq!(step_for_timeline(slow, 1_000), 1000);

    let ntsc = Fps::new(30000, 1001).unwrap();
    assert_eq!(step_for_timeline(ntsc, 0), 33);
}

#[test]
fn guard_installs_and_uninstalls() {
    assert!(!is_installed());
    assert_eq!(active_time_ms(), None);
    {
        let guard = ClockGuard::install(DeterministicClock::new(10).unwrap()).unwrap();
        assert_eq!(active_time_ms(), Some(0));
        guard.advance();
        guard.advance();
        assert_eq!(active_time_ms(), Some(20));
        assert_eq!(guard.advances(), 2);
        assert!(ClockGuard::install(DeterministicClock::new(5).unwrap()).is_err());
        // The rejected install must not disturb the active clock.
        assert_eq!(active_time_ms(), Some(20));
    }
    assert!(!is_installed());
    assert_eq!(active_time_ms(), None);
}

#[test]
fn guard_uninstalls_on_unwind() {
    let res = std::panic::catch_unwind(|| {
        let _guard = ClockGuard::install(DeterministicClock::new(10).unwrap()).unwrap();
        panic!("boom");
    });
    assert!(res.is_err());
    assert!(!is_installed());
}

#[test]
fn clocks_are_per_thread() {
    let _guard = ClockGuard::install(DeterministicClock::new(10).unwrap()).unwrap();
    let other = std::thread::spawn(|| active_time_ms()).join().unwrap();
    assert_eq!(other, None);
}
