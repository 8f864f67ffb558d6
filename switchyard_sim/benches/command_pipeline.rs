// Criterion benchmarks for the command pipeline: a full execute (test run,
// funds check, exec run), an estimate, packet encode/decode, and the world
// checksum that peers exchange every few turns.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use switchyard_sim::command::{Command, CommandEnvelope};
use switchyard_sim::config::GameConfig;
use switchyard_sim::executor::Executor;
use switchyard_sim::flags::DoCommandFlags;
use switchyard_sim::replication::{CommandPacket, RequestId};
use switchyard_sim::types::{CompanyId, TileIndex};
use switchyard_sim::world::World;

fn bench_execute(c: &mut Criterion) {
    let base = World::new(GameConfig::default());
    let size_x = base.map.size_x;
    let start = TileIndex::from_xy(2, 10, size_x);
    let end = TileIndex::from_xy(40, 10, size_x);
    let env = CommandEnvelope::new(Command::BuildLongRoad, start)
        .with_params(end.0, 0)
        .with_company(CompanyId(0));

    c.bench_function("execute_long_road", |b| {
        b.iter_batched(
            || base.clone(),
            |mut world| {
                let mut exec = Executor::new(false);
                black_box(exec.execute(&mut world, &env, DoCommandFlags::empty(), false));
            },
            criterion::BatchSize::SmallInput,
        );
    });

    let mut world = base.clone();
    let mut exec = Executor::new(false);
    c.bench_function("estimate_long_road", |b| {
        b.iter(|| black_box(exec.execute(&mut world, &env, DoCommandFlags::empty(), true)));
    });
}

fn bench_packet(c: &mut Criterion) {
    let env = CommandEnvelope::new(Command::PlaceSign, TileIndex(1234))
        .with_params(1, 2)
        .with_text("north junction")
        .with_company(CompanyId(1));
    let packet = CommandPacket::from_envelope(RequestId(7), &env);
    let bytes = packet.encode().unwrap();

    c.bench_function("packet_encode", |b| {
        b.iter(|| black_box(packet.encode().unwrap()));
    });
    c.bench_function("packet_decode", |b| {
        b.iter(|| black_box(CommandPacket::decode(&bytes).unwrap()));
    });
}

fn bench_checksum(c: &mut Criterion) {
    let world = World::generate(42, GameConfig::default());
    c.bench_function("world_checksum_64x64", |b| {
        b.iter(|| black_box(world.checksum()));
    });
}

criterion_group!(benches, bench_execute, bench_packet, bench_checksum);
criterion_main!(benches);
