use super::*;
use crate::animation::clock::{ClockGuard, DeterministicClock};

fn load(json: &str) -> OffsceneResult<SceneRuntime> {
    JsonSceneEngine.load(&SceneSource::new("/virtual/scene.json", json))
}

fn size(w: u32, h: u32) -> Size {
    Size::new(w, h).unwrap()
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

const SLIDE: &str = r##"{
  "background": "#000000",
  "root": {
    "type": "Item",
    "children": [
      { "type": "Rectangle", "id": "box", "width": 10, "height": 10, "color": "red" },
      { "type": "SequentialAnimation", "children": [
        { "type": "NumberAnimation", "target": "box", "property": "x", "to": 100, "duration": 1000 },
        { "type": "PauseAnimation", "duration": 500 },
        { "type": "NumberAnimation", "target": "box", "property": "x", "to": 200, "duration": 1000 }
      ]}
    ]
  }
}"##;

#[test]
fn root_must_be_visual() {
    let err = load(r#"{ "root": { "type": "PauseAnimation", "duration": 10 } }"#).unwrap_err();
    assert!(matches!(err, OffsceneError::SceneLoad(_)));
    assert!(err.to_string().contains("not a visual item"), "{err}");
}

#[test]
fn malformed_documents_are_load_errors() {
    for bad in [
        "{ nope",
        r#"{ "root": { "type": "Blob" } }"#,
        r#"{ "version": "9", "root": { "type": "Item" } }"#,
    ] {
        let err = load(bad).unwrap_err();
        assert!(matches!(err, OffsceneError::SceneLoad(_)), "{bad}: {err}");
    }
}

#[test]
fn bad_animations_are_load_errors() {
    let cases = [
        // unknown target
        r#"{ "root": { "type": "Item", "children": [
            { "type": "NumberAnimation", "target": "ghost", "property": "x", "to": 1 } ] } }"#,
        // visual item inside a group
        r#"{ "root": { "type": "Item", "children": [
            { "type": "ParallelAnimation", "children": [ { "type": "Rectangle" } ] } ] } }"#,
        // unknown property
        r#"{ "root": { "type": "Item", "children": [
            { "type": "NumberAnimation", "property": "wobble", "to": 1 } ] } }"#,
        // missing property
        r#"{ "root": { "type": "Item", "children": [
            { "type": "NumberAnimation", "to": 1 } ] } }"#,
        // color on an item without color
        r#"{ "root": { "type": "Item", "children": [
            { "type": "ColorAnimation", "to": "red" } ] } }"#,
        // duplicate ids
        r#"{ "root": { "type": "Item", "id": "a", "children": [
            { "type": "Item", "id": "a" } ] } }"#,
    ];
    for case in cases {
        let err = load(case).unwrap_err();
        assert!(matches!(err, OffsceneError::SceneLoad(_)), "{case}: {err}");
    }
}

#[test]
fn root_is_sized_to_the_request() {
    let rt = load(r##"{ "root": { "type": "Rectangle", "color": "#336699" } }"##).unwrap();
    let g = rt.polish_at(size(64, 32), 0);
    assert_eq!((g.width, g.height), (64, 32));
    assert_eq!(g.nodes.len(), 1);
    assert_close(g.nodes[0].width, 64.0);
    assert_close(g.nodes[0].height, 32.0);
    assert_eq!(g.background, Rgba8::TRANSPARENT);
}

#[test]
fn sequential_animations_chain_from_current_values() {
    let rt = load(SLIDE).unwrap();
    assert_eq!(rt.duration_ms(), 2500);
    assert_eq!(rt.animation_count(), 2);

    let x_at = |t: u64| rt.polish_at(size(320, 240), t).nodes[0].transform.translation().x;
    assert_close(x_at(0), 0.0);
    assert_close(x_at(500), 50.0);
    assert_close(x_at(1000), 100.0);
    assert_close(x_at(1200), 100.0);
    assert_close(x_at(2000), 150.0);
    assert_close(x_at(10_000), 200.0);
}

#[test]
fn polish_is_repeatable() {
    let rt = load(SLIDE).unwrap();
    let a = rt.polish_at(size(320, 240), 777);
    let b = rt.polish_at(size(320, 240), 777);
    assert_eq!(a.nodes[0].transform, b.nodes[0].transform);
}

#[test]
fn polish_reads_the_installed_clock() {
    let rt = load(SLIDE).unwrap();
    assert_close(rt.polish(size(10, 10)).nodes[0].transform.translation().x, 0.0);

    let guard = ClockGuard::install(DeterministicClock::new(250).unwrap()).unwrap();
    guard.advance();
    guard.advance();
    assert_close(rt.polish(size(10, 10)).nodes[0].transform.translation().x, 50.0);
}

#[test]
fn hidden_subtrees_and_opacity() {
    let rt = load(
        r##"{ "root": { "type": "Item", "children": [
            { "type": "Rectangle", "opacity": 0.5, "width": 4, "height": 4, "children": [
                { "type": "Rectangle", "opacity": 0.5, "width": 2, "height": 2 }
            ]},
            { "type": "Rectangle", "visible": false, "width": 4, "height": 4, "children": [
                { "type": "Rectangle", "width": 2, "height": 2 }
            ]}
        ] } }"##,
    )
    .unwrap();
    let g = rt.polish_at(size(8, 8), 0);
    assert_eq!(g.nodes.len(), 2);
    assert!((g.nodes[0].opacity - 0.5).abs() < 1e-6);
    assert!((g.nodes[1].opacity - 0.25).abs() < 1e-6);
}

#[test]
fn children_inherit_parent_transform() {
    let rt = load(
        r##"{ "root": { "type": "Item", "children": [
            { "type": "Item", "x": 10, "y": 20, "children": [
                { "type": "Rectangle", "x": 1, "y": 2, "width": 2, "height": 2 }
            ]}
        ] } }"##,
    )
    .unwrap();
    let g = rt.polish_at(size(50, 50), 0);
    let t = g.nodes[0].transform.translation();
    assert_close(t.x, 11.0);
    assert_close(t.y, 22.0);
}

#[test]
fn color_and_rotation_animations() {
    let rt = load(
        r##"{ "root": { "type": "Rectangle", "color": "#000000", "width": 10, "height": 10,
            "children": [
              { "type": "ParallelAnimation", "children": [
                { "type": "ColorAnimation", "to": "#ffffff", "duration": 1000 },
                { "type": "RotationAnimation", "to": 90, "duration": 1000, "easing": "Step" }
              ]}
            ] } }"##,
    )
    .unwrap();

    let g = rt.polish_at(size(10, 10), 500);
    let DrawPaint::Rect { color, .. } = g.nodes[0].paint else {
        panic!("expected a rectangle");
    };
    assert_eq!(color, Rgba8::new(128, 128, 128, 255));
    // Step easing holds rotation at 0 until the end.
    assert_eq!(g.nodes[0].transform, Affine::IDENTITY);

    let g = rt.polish_at(size(10, 10), 1000);
    let [a, b, ..] = g.nodes[0].transform.as_coeffs();
    assert!(a.abs() < 1e-9 && (b - 1.0).abs() < 1e-9);
}

#[test]
fn base_dir_is_the_document_directory() {
    let src = SceneSource::new("/scenes/intro/scene.json", "{}");
    assert_eq!(src.base_dir(), PathBuf::from("/scenes/intro"));
    assert_eq!(SceneSource::new("scene.json", "{}").base_dir(), PathBuf::new());
}

#[test]
fn read_scene_source_reports_missing_files() {
    let err = read_scene_source("/definitely/not/here/scene.json").unwrap_err();
    assert!(matches!(err, OffsceneError::SceneLoad(_)));
}
