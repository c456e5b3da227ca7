use accrete_core::{
    DefaultStrategy, FramePatcher, PatchConfig, PatchingService, PointCloudAccumulator,
    StrategyKind, group_instances,
};
use accrete_data::{
    Frame, FrameSource, InstanceId, MemoryDataset, PointCloud, Pose, SegmentLabel,
};
use std::num::NonZeroUsize;

const CAR: SegmentLabel = 7;
const ROAD: SegmentLabel = 17;

/// A frame with `instance_points` points labeled as the car and the rest road.
fn frame(id: &str, total: usize, instance_points: usize, x_offset: f32) -> Frame {
    let mut flat = Vec::with_capacity(total * 4);
    let mut labels = Vec::with_capacity(total);
    for i in 0..total {
        let is_car = i < instance_points;
        let x = if is_car { x_offset + i as f32 * 0.01 } else { -10.0 - i as f32 * 0.01 };
        flat.extend_from_slice(&[x, 0.5, 0.0, (i % 10) as f32 / 10.0]);
        labels.push(if is_car { CAR } else { ROAD });
    }
    Frame::new(id, PointCloud::from_flat(4, flat).unwrap(), labels, Pose::identity()).unwrap()
}

/// Scene `S`: the car shows up in f0, f2 and f4 with 100, 80 and 120 points.
fn scene() -> MemoryDataset {
    MemoryDataset::new()
        .with_frame("S", frame("f0", 1000, 100, 0.0))
        .with_frame("S", frame("f1", 500, 0, 0.0))
        .with_frame("S", frame("f2", 600, 80, 1.0))
        .with_frame("S", frame("f3", 400, 0, 0.0))
        .with_frame("S", frame("f4", 900, 120, 2.0))
}

fn config(step: usize) -> PatchConfig {
    PatchConfig::default().with_step(NonZeroUsize::new(step).unwrap())
}

fn instance(id: &str) -> InstanceId {
    id.parse().unwrap()
}

#[test]
fn grouping_finds_car_track() {
    let dataset = scene();
    let grouped = group_instances(&dataset, "S", &config(1).excluded_classes).unwrap();
    assert_eq!(grouped.frames(instance("7")).unwrap(), ["f0", "f2", "f4"]);
    // road is a semantic class, not an instance
    assert!(!grouped.contains(InstanceId(ROAD)));
}

#[test]
fn default_merge_with_stride_one_uses_every_frame() {
    let dataset = scene();
    let cfg = config(1);
    let acc = PointCloudAccumulator::for_scene(&dataset, "S", &cfg.excluded_classes, cfg.step).unwrap();

    let merged = acc.merge("S", instance("7"), &DefaultStrategy).unwrap();
    assert_eq!(merged.len(), 300);
    assert_eq!(merged.channels(), 4);

    // frame-sampling order: f0's points first, then f2, then f4
    assert_eq!(merged.position(0).x, 0.0);
    assert_eq!(merged.position(100).x, 1.0);
    assert_eq!(merged.position(180).x, 2.0);
}

#[test]
fn default_merge_with_stride_two_samples_first_and_last() {
    let dataset = scene();
    let cfg = config(2);
    let acc = PointCloudAccumulator::for_scene(&dataset, "S", &cfg.excluded_classes, cfg.step).unwrap();

    assert_eq!(acc.sampled_frames(instance("7")), vec!["f0", "f4"]);
    let merged = acc.merge("S", instance("7"), &DefaultStrategy).unwrap();
    assert_eq!(merged.len(), 220);
}

#[test]
fn patching_f0_yields_1200_points() {
    let dataset = scene();
    let service = PatchingService::new(&dataset, config(1)).unwrap();
    let grouped = service.group("S").unwrap();

    let patched = service
        .patch_frame("S", "f0", &[instance("7")], &grouped, None)
        .unwrap();
    assert_eq!(patched.original_len, 1000);
    assert_eq!(patched.len(), 1000 - 100 + 300);
    assert_eq!(patched.segments.len(), patched.points.len());
    assert_eq!(patched.segments.iter().filter(|&&s| s == CAR).count(), 300);
    assert_eq!(patched.segments.iter().filter(|&&s| s == ROAD).count(), 900);

    // the stored frame is untouched
    assert_eq!(dataset.load_frame("S", "f0").unwrap().len(), 1000);
}

#[test]
fn unknown_instance_merges_empty_and_patches_nothing() {
    let dataset = scene();
    let cfg = config(1);
    let acc = PointCloudAccumulator::for_scene(&dataset, "S", &cfg.excluded_classes, cfg.step).unwrap();

    let merged = acc.merge("S", instance("999"), &DefaultStrategy).unwrap();
    assert!(merged.is_empty());

    for frame_id in dataset.frames("S").unwrap() {
        let original = dataset.load_frame("S", &frame_id).unwrap();
        let mut patcher = FramePatcher::new(original.clone()).unwrap();
        let outcome = patcher.patch_instance(instance("999"), merged.clone()).unwrap();
        assert!(outcome.is_noop());
        assert_eq!(patcher.into_frame(), original);
    }
}

#[test]
fn patching_zero_instances_round_trips() {
    let dataset = scene();
    let service = PatchingService::new(&dataset, config(1)).unwrap();
    let grouped = service.group("S").unwrap();

    let patched = service.patch_frame("S", "f2", &[], &grouped, None).unwrap();
    assert_eq!(patched.into_frame(), dataset.load_frame("S", "f2").unwrap());
}

#[test]
fn greedy_grid_keeps_point_budget() {
    let dataset = scene();
    let service =
        PatchingService::new(&dataset, config(1).with_strategy(StrategyKind::GreedyGrid)).unwrap();
    let grouped = service.group("S").unwrap();

    let patched = service
        .patch_frame("S", "f4", &[instance("7")], &grouped, None)
        .unwrap();
    // alignment moves points but never adds or drops any
    assert_eq!(patched.len(), 900 - 120 + 300);
}

#[test]
fn missing_frame_fails_the_patch() {
    let dataset = scene();
    let service = PatchingService::new(&dataset, config(1)).unwrap();
    let grouped = service.group("S").unwrap();

    let err = service
        .patch_frame("S", "f9", &[instance("7")], &grouped, None)
        .unwrap_err();
    assert!(err.is_collaborator());
}
