use super::*;
use crate::frame::{Classification, Rect};
use serde_json::{Value, json};

fn metrics() -> FrameMetrics {
    FrameMetrics {
        target_fps: 15,
        frame_index: 42,
        hardware_accelerated: false,
        cpu_usage: 12.5,
        achieved_fps: 14.8,
        frame_time_ms: 67,
    }
}

fn parse(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("document is valid json")
}

#[test]
fn test_untracked_box_document() {
    let results = vec![ResultRecord::BoundingBoxes(vec![
        BoundingBox::new(Rect::from_corners(Point::new(10, 20), Point::new(50, 80)))
            .with_id(0)
            .with_tag(0),
    ])];

    let doc = parse(&encode_frame(&results, &metrics()));

    assert_eq!(doc["frame"]["fps"], json!(15));
    assert_eq!(doc["frame"]["fpga"], json!(false));
    assert_eq!(doc["frame"]["perf"]["cpu_use"], json!(12.5));
    assert_eq!(doc["frame"]["perf"]["fps"], json!(14.8));
    assert_eq!(doc["frame"]["perf"]["fr_time"], json!(67));

    let result = &doc["frame"]["results"][0];
    assert_eq!(result["type"], json!("bounding-boxes"));

    let bbox = result["boxes"][0].as_object().unwrap();
    assert!(!bbox.contains_key("id"));
    assert!(!bbox.contains_key("tag"));
    assert_eq!(bbox["topleft"], json!({"x": 10, "y": 20}));
    assert_eq!(bbox["btmright"], json!({"x": 50, "y": 80}));
    assert_eq!(bbox["area"], json!(2400));
}

#[test]
fn test_tracked_box_carries_id_and_tag() {
    let results = vec![ResultRecord::BoundingBoxes(vec![
        BoundingBox::new(Rect::new(0, 0, 4, 4)).with_id(9).with_tag(2),
    ])];

    let doc = parse(&encode_frame(&results, &metrics()));
    let bbox = &doc["frame"]["results"][0]["boxes"][0];

    assert_eq!(bbox["id"], json!(9));
    assert_eq!(bbox["tag"], json!(2));
    assert_eq!(bbox["area"], json!(16));
}

#[test]
fn test_exact_wire_layout() {
    let results = vec![ResultRecord::BoundingBoxes(vec![
        BoundingBox::new(Rect::new(1, 2, 3, 4)).with_id(5),
    ])];
    let metrics = FrameMetrics {
        target_fps: 30,
        hardware_accelerated: true,
        cpu_usage: 50.25,
        achieved_fps: 29.5,
        frame_time_ms: 33,
        ..Default::default()
    };

    let bytes = encode_frame(&results, &metrics);
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        concat!(
            "{\"frame\":{\"fps\":30,\"fpga\":true,",
            "\"perf\":{\"cpu_use\":50.25,\"fps\":29.5,\"fr_time\":33},",
            "\"results\":[{\"type\":\"bounding-boxes\",\"boxes\":[",
            "{\"id\":5,\"topleft\":{\"x\":1,\"y\":2},\"btmright\":{\"x\":4,\"y\":6},\"area\":12}",
            "]}]}}\n"
        )
    );
}

#[test]
fn test_no_results_gives_empty_array() {
    let doc = parse(&encode_frame(&[], &metrics()));
    assert_eq!(doc["frame"]["results"], json!([]));
}

#[test]
fn test_unserialized_kinds_are_skipped() {
    let results = vec![
        ResultRecord::Points(vec![Point::new(1, 1)]),
        ResultRecord::Classifications(vec![Classification {
            name: "person".into(),
            id: None,
            tag: None,
        }]),
        ResultRecord::BoundingBoxes(vec![]),
    ];

    let doc = parse(&encode_frame(&results, &metrics()));
    let array = doc["frame"]["results"].as_array().unwrap();

    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["type"], json!("bounding-boxes"));
    assert_eq!(array[0]["boxes"], json!([]));
}

#[test]
fn test_document_is_newline_terminated() {
    let bytes = encode_frame(&[], &metrics());
    assert_eq!(bytes.last(), Some(&b'\n'));
    assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
}

#[test]
fn test_write_frame_into_vec() {
    let out = write_frame(Vec::new(), &[], &metrics()).unwrap();
    assert_eq!(parse(&out)["frame"]["fps"], json!(15));
}
