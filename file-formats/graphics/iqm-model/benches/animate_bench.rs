use criterion::{Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};
use iqm_model::animation::Pose;
use iqm_model::{AnimationState, CpuSkinner, IqmEncoder, IqmModel};

const BONES: usize = 64;
const VERTICES: usize = 4096;
const FRAMES: usize = 30;

fn create_test_data() -> Vec<u8> {
    let mut encoder = IqmEncoder::new();
    for i in 0..BONES {
        let parent = i as i32 - 1;
        encoder = encoder.joint(
            &format!("bone{i}"),
            parent,
            Pose::new(Vec3::Y, Quat::IDENTITY, Vec3::ONE),
        );
    }

    let frames: Vec<Vec<Pose>> = (0..FRAMES)
        .map(|f| {
            (0..BONES)
                .map(|b| {
                    let angle = (f as f32 / FRAMES as f32) * 0.2 + b as f32 * 0.01;
                    Pose::new(Vec3::Y, Quat::from_rotation_z(angle), Vec3::ONE)
                })
                .collect()
        })
        .collect();

    let positions: Vec<Vec3> = (0..VERTICES)
        .map(|i| Vec3::new((i % 7) as f32, (i % BONES) as f32, 0.0))
        .collect();
    let indices: Vec<[u8; 4]> = (0..VERTICES)
        .map(|i| {
            let b = (i % BONES) as u8;
            [b, b.saturating_sub(1), 0, 0]
        })
        .collect();

    encoder
        .positions(positions)
        .normals(vec![Vec3::Z; VERTICES])
        .blend(indices, vec![[192, 63, 0, 0]; VERTICES])
        .frames(&frames)
        .clip("sway", 0, FRAMES as u32, 30.0, true)
        .encode()
        .unwrap()
}

fn create_test_model() -> IqmModel {
    IqmModel::from_bytes(&create_test_data(), ".").unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let data = create_test_data();
    c.bench_function("parse_model", |b| {
        b.iter(|| IqmModel::from_bytes(&data, ".").unwrap())
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let model = create_test_model();
    let mut state = AnimationState::for_model(&model).unwrap();
    state.bind(model.clips[0].clone());

    c.bench_function("evaluate_64_bones", |b| {
        b.iter(|| {
            state.advance(1.0 / 60.0);
            state.evaluate(&model).unwrap();
        })
    });
}

fn bench_skin(c: &mut Criterion) {
    let model = create_test_model();
    let mut state = AnimationState::for_model(&model).unwrap();
    state.bind(model.clips[0].clone());
    state.set_time(7.0);
    state.evaluate(&model).unwrap();
    let mut skinner = CpuSkinner::new();

    c.bench_function("skin_4096_vertices", |b| {
        b.iter(|| skinner.skin(&model.vertices, state.skin_matrices()).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_skin);
criterion_main!(benches);
