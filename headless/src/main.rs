mod level;

use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use freeroam_sim::{
    ControllerSettings, FpsCamera, InputState, Octree, SceneTree, Simulation, angle::PI,
};

/// Fixed 60 Hz frame.
const FRAME: Duration = Duration::from_micros(16_667);
/// Frames between status lines.
const REPORT_EVERY: u32 = 30;

/// One segment of the scripted walk.
struct Phase {
    name: &'static str,
    frames: u32,
    input: InputState,
    jump: bool,
    /// Yaw applied at the start of the phase (radians).
    yaw: Option<f32>,
}

impl Phase {
    fn new(name: &'static str, frames: u32, input: InputState) -> Self {
        Self {
            name,
            frames,
            input,
            jump: false,
            yaw: None,
        }
    }

    fn jumping(mut self) -> Self {
        self.jump = true;
        self
    }

    fn facing(mut self, yaw: f32) -> Self {
        self.yaw = Some(yaw);
        self
    }
}

fn script() -> Vec<Phase> {
    let idle = InputState::default();
    let walk = InputState {
        move_forward: true,
        ..idle
    };
    let run = InputState {
        running: true,
        ..walk
    };
    let rotate_out = InputState {
        rotate_out: true,
        ..idle
    };
    let strafe = InputState {
        move_right: true,
        ..idle
    };

    vec![
        Phase::new("settle", 60, idle),
        Phase::new("walk", 90, walk),
        Phase::new("jump", 60, walk).jumping(),
        Phase::new("rotate w", 120, rotate_out),
        Phase::new("run", 120, run),
        Phase::new("strafe", 60, strafe).facing(0.5 * PI),
        Phase::new("coast", 60, idle),
    ]
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<ControllerSettings> {
    let Some(path) = path else {
        return Ok(ControllerSettings::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let settings: ControllerSettings =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = std::env::args().nth(1);
    let settings = load_settings(settings_path.as_deref().map(Path::new))?;

    let level = level::build().context("building demo level")?;
    let octree = Octree::from_scene(&level.scene, level.scene.root(), &level.w4d)?;
    log::info!(
        "indexed {} triangles into {} octree nodes (depth {})",
        octree.len(),
        octree.node_count(),
        octree.depth()
    );

    let mut sim = Simulation::new(
        settings,
        FpsCamera::default(),
        level.camera,
        octree,
        level.spawn,
    )?
    .with_w4d(level.w4d);

    let mut frame = 0u32;
    for phase in script() {
        log::info!("phase: {}", phase.name);
        if let Some(yaw) = phase.yaw {
            let pitch = sim.camera().pitch();
            sim.camera_mut().set_orientation(yaw, pitch);
        }
        *sim.input_mut() = phase.input;
        if phase.jump && !sim.jump() {
            log::info!("jump ignored: not grounded");
        }

        for _ in 0..phase.frames {
            sim.update(FRAME);
            frame += 1;
            if frame % REPORT_EVERY == 0 {
                report(&sim, frame, &level.scene);
            }
        }
    }

    log::info!(
        "done after {frame} frames; floor clamp fired on {} sub-steps",
        sim.floor_clamp_count()
    );
    Ok(())
}

fn report(sim: &Simulation<FpsCamera, Octree>, frame: u32, scene: &SceneTree) {
    let player = sim.player();
    let foot = player.foot();
    let v = player.velocity;
    let camera_w = sim.camera_w();
    log::info!(
        "frame {frame:4}: foot ({:6.2}, {:5.2}, {:6.2}) speed {:5.2} grounded {} w {:.3}",
        foot.x,
        foot.y,
        foot.z,
        v.norm(),
        player.grounded(),
        camera_w
    );

    let threshold = sim.settings().substance_threshold;
    for (entity, alpha) in sim.w4d().opacity_pass(camera_w, threshold) {
        if entity == sim.camera_entity() {
            continue;
        }
        let solid = sim.w4d().is_substantial(Some(entity), camera_w, threshold);
        log::info!(
            "  {:<12} alpha {alpha:.2}{}",
            scene.name(entity).unwrap_or("?"),
            if solid { " solid" } else { "" }
        );
    }
}
