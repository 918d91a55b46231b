use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::new(30000, 1001).unwrap().num, 30000);
}

#[test]
fn fps_frame_counts() {
    let fps = Fps::new(25, 1).unwrap();
    assert_eq!(fps.frames_in_ms(4_000), 100);
    assert_eq!(fps.frames_in_ms(0), 0);
    assert_eq!(fps.secs_to_frames_floor(1.99), 49);
    // Partial frames round up.
    assert_eq!(fps.frames_in_ms(800), 20);
    assert_eq!(fps.frames_in_ms(1_500), 38);
    assert_eq!(fps.frames_in_ms(1), 1);

    let ntsc = Fps::new(30000, 1001).unwrap();
    assert_eq!(ntsc.frames_in_ms(10_000), 300);
}

#[test]
fn size_validation_and_scaling() {
    assert!(Size::new(0, 10).is_err());
    let s = Size::new(100, 50).unwrap();
    assert_eq!(s.scaled(2.0), Size { width: 200, height: 100 });
    assert_eq!(s.scaled(0.001), Size { width: 1, height: 1 });
    assert_eq!(s.rgba_len(), 100 * 50 * 4);
}

#[test]
fn hex_colors_parse_alpha_first() {
    assert_eq!(Rgba8::parse_hex("#ff0000").unwrap(), Rgba8::new(255, 0, 0, 255));
    assert_eq!(Rgba8::parse_hex("#80ff0000").unwrap(), Rgba8::new(255, 0, 0, 128));
    assert_eq!(Rgba8::parse_hex("#0f0").unwrap(), Rgba8::new(0, 255, 0, 255));
    assert!(Rgba8::parse_hex("ff0000").is_err());
    assert!(Rgba8::parse_hex("#12345").is_err());
    assert!(Rgba8::parse_hex("#zzzzzz").is_err());
    assert!(Rgba8::parse_hex("#ééé").is_err());
}

#[test]
fn colors_deserialize_from_strings_and_arrays() {
    let c: Rgba8 = serde_json::from_str("\"Yellow\"").unwrap();
    assert_eq!(c, Rgba8::new(255, 255, 0, 255));
    let c: Rgba8 = serde_json::from_str("[1, 2, 3]").unwrap();
    assert_eq!(c, Rgba8::new(1, 2, 3, 255));
    let c: Rgba8 = serde_json::from_str("[1, 2, 3, 4]").unwrap();
    assert_eq!(c, Rgba8::new(1, 2, 3, 4));
    assert!(serde_json::from_str::<Rgba8>("\"mauve-ish\"").is_err());

    let back = serde_json::to_string(&Rgba8::new(9, 8, 7, 6)).unwrap();
    assert_eq!(back, "[9,8,7,6]");
}

#[test]
fn color_lerp_rounds_per_channel() {
    let mid = Rgba8::lerp(Rgba8::BLACK, Rgba8::WHITE, 0.5);
    assert_eq!(mid, Rgba8::new(128, 128, 128, 255));
    assert_eq!(Rgba8::lerp(Rgba8::BLACK, Rgba8::WHITE, 0.0), Rgba8::BLACK);
    assert_eq!(Rgba8::lerp(Rgba8::BLACK, Rgba8::WHITE, 1.0), Rgba8::WHITE);
}
