use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tessera::soak::{HeightmapServer, terrain_node_defs};
use tessera::{ActiveObject, CameraState, ClientMap, ClientMapConfig, CliArgs, ObjectKind, ObjectMessage};
use tessera_geom::Vec3;
use tessera_world::NodePos;

const OBJECTS: usize = 8;

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    let level = args.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &args.config {
        Some(path) => ClientMapConfig::load_from_path(path)?,
        None => ClientMapConfig::default(),
    };
    config.apply_cli_overrides(&args);
    log::info!(target: "soak", "config: {config:?}");

    let mut server = HeightmapServer::new(args.seed);
    let mut map = ClientMap::with_node_defs(config.clone(), Arc::new(terrain_node_defs()))?;

    let start_y = server.height_at(0, 0) as f32 + 12.0;
    let mut camera = CameraState::new(Vec3::new(0.0, start_y, 0.0), config.viewing_range).looking(0.0, -20.0);

    let mut object_ids = Vec::with_capacity(OBJECTS);
    for i in 0..OBJECTS {
        let a = i as f32 / OBJECTS as f32 * std::f32::consts::TAU;
        let obj = ActiveObject::new(
            ObjectKind::Entity {
                name: format!("wanderer{i}"),
            },
            camera.position + Vec3::new(a.cos() * 20.0, -4.0, a.sin() * 20.0),
        )
        .with_velocity(Vec3::new(-a.sin() * 3.0, 0.0, a.cos() * 3.0));
        if let Some(id) = map.add_active_object(None, obj) {
            object_ids.push(id);
        }
    }

    for frame in 0..args.frames {
        // Drift forward and turn slowly so blocks fall behind and expire.
        camera.yaw += 6.0 * args.dt;
        camera.position = camera.position + camera.forward() * (8.0 * args.dt);
        map.set_camera(camera);

        server.feed(&mut map, camera.block(), args.radius, args.feed_budget);
        if frame % 10 == 5 {
            let p = camera.position;
            server.random_edit(&mut map, NodePos::new(p.x as i32, p.y as i32, p.z as i32), 24);
        }
        if frame % 90 == 45 {
            if let Some(&id) = object_ids.get(frame as usize / 90 % object_ids.len().max(1)) {
                map.process_active_object_message(
                    id,
                    ObjectMessage::SetPosition {
                        pos: camera.position + Vec3::new(4.0, -2.0, 4.0),
                        vel: Vec3::ZERO,
                    },
                );
            }
        }

        map.step(args.dt);
        let outbound = map.take_outbound_messages();
        server.receive(&outbound);

        if args.stats_every > 0 && frame % args.stats_every == 0 {
            let s = map.stats();
            log::info!(
                target: "soak",
                "frame {frame}: blocks={} meshes={} pending={} inflight={} visible={} objects={} evicted={}",
                s.blocks,
                s.meshes,
                s.pending_jobs,
                s.inflight_jobs,
                s.visible,
                s.objects,
                s.evicted_total
            );
        }
    }

    map.shutdown();
    let s = map.stats();
    let f = server.stats;
    log::info!(
        target: "soak",
        "done: sent={} got={} deleted={} ack_messages={} ack_bytes={} installed={} evicted={}",
        f.blocks_sent,
        f.got_acks,
        f.deleted_acks,
        f.ack_messages,
        f.ack_bytes,
        s.installed_total,
        s.evicted_total
    );
    Ok(())
}
