pub mod movement;
pub mod setup;

use crate::input::queue::InputQueue;
use crate::input::{InputCallbacks, InputEvent, InputEventKind, Key, MouseButtons};
use crate::model::terrain::HeightSampler;
use crate::scene::Scene;
use crate::shutdown::StopFlag;
use crate::world::movement::{Motion, Movement, MovementRates};
use nalgebra::Vector3;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub tick: Duration,
    pub rates: MovementRates,
    pub eye_height: f32,
    pub start_position: Vector3<f32>,
    /// Degrees; 0 looks along +z.
    pub start_facing: f32,
    pub queue_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            tick: Duration::from_millis(50),
            rates: MovementRates {
                move_rate: 10.0,
                turn_rate: 90.0,
            },
            eye_height: 2.0,
            start_position: Vector3::new(0.0, 1.0, -10.0),
            start_facing: 0.0,
            queue_capacity: InputQueue::DEFAULT_CAPACITY,
        }
    }
}

/// Unit view direction for a facing angle in degrees.
pub fn facing_direction(facing: f32) -> Vector3<f32> {
    let a = facing.to_radians();
    Vector3::new(a.sin(), 0.0, a.cos())
}

fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Character {
    pub position: Vector3<f32>,
    pub facing: f32,
}

/// Single-threaded part of the world: consumes events, integrates movement and
/// publishes the camera into the scene.
pub struct Simulation {
    character: Character,
    movement: Movement,
    eye_height: f32,
    terrain: Arc<dyn HeightSampler + Send + Sync>,
    scene: Arc<Scene>,
}

impl Simulation {
    pub fn new(
        config: &WorldConfig,
        scene: Arc<Scene>,
        terrain: Arc<dyn HeightSampler + Send + Sync>,
    ) -> Self {
        let character = Character {
            position: config.start_position,
            facing: wrap_degrees(config.start_facing),
        };
        scene.set_eye(character.position, facing_direction(character.facing));
        Simulation {
            character,
            movement: Movement::new(config.rates),
            eye_height: config.eye_height,
            terrain,
            scene,
        }
    }

    pub fn character(&self) -> Character {
        self.character
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        match event.kind {
            InputEventKind::KeyPress(key) => {
                if let Some(motion) = Motion::for_key(key) {
                    self.movement.press(motion, event.timestamp);
                }
            }
            InputEventKind::KeyRelease(key) => {
                if let Some(motion) = Motion::for_key(key) {
                    self.movement.release(motion, event.timestamp);
                }
            }
            other => log::trace!("{} event ignored: {:?}", other, other),
        }
    }

    /// Integrates held keys up to `boundary`, moves the character and pushes
    /// the new eye into the scene.
    pub fn advance(&mut self, boundary: Instant) {
        self.movement.continue_movement(boundary);
        let motion = self.movement.accumulated();

        let forward = facing_direction(self.character.facing);
        let right = Vector3::new(-forward.z, 0.0, forward.x);

        let mut position = self.character.position + forward * motion.forward + right * motion.strafe;
        position.y = self.terrain.sample_height(position.x, position.z) + self.eye_height;

        self.character.position = position;
        self.character.facing = wrap_degrees(self.character.facing + motion.turn);
        self.scene
            .set_eye(position, facing_direction(self.character.facing));
    }

    /// One fixed tick: reset accumulators, drain every event stamped up to the
    /// boundary, then integrate.
    pub fn run_tick(&mut self, queue: &InputQueue, boundary: Instant) {
        self.movement.reset();
        while let Some(event) = queue.pop_until(boundary) {
            self.handle_event(&event);
        }
        self.advance(boundary);
    }
}

/// Input callback target handed to the platform layer.
#[derive(Debug, Clone)]
pub struct InputHandle {
    queue: Arc<InputQueue>,
    exit: StopFlag,
}

impl InputHandle {
    pub fn new(queue: Arc<InputQueue>, exit: StopFlag) -> Self {
        InputHandle { queue, exit }
    }
}

impl InputCallbacks for InputHandle {
    fn on_mouse_button_press(&self, x: f32, y: f32, button: MouseButtons) {
        self.queue
            .push(InputEventKind::MouseButtonPress { x, y, button });
    }

    fn on_mouse_button_release(&self, x: f32, y: f32, button: MouseButtons) {
        self.queue
            .push(InputEventKind::MouseButtonRelease { x, y, button });
    }

    fn on_mouse_move(&self, x: f32, y: f32, buttons: MouseButtons) {
        self.queue.push(InputEventKind::MouseMove { x, y, buttons });
    }

    fn on_key_press(&self, key: Key) {
        if key == Key::Escape {
            log::info!("escape pressed, exiting");
            self.exit.request();
            return;
        }
        self.queue.push(InputEventKind::KeyPress(key));
    }

    fn on_key_release(&self, key: Key) {
        self.queue.push(InputEventKind::KeyRelease(key));
    }
}

/// World simulation thread with its input queue.
pub struct World {
    scene: Arc<Scene>,
    queue: Arc<InputQueue>,
    exit: StopFlag,
    stop: StopFlag,
    thread: Option<JoinHandle<()>>,
}

impl World {
    pub fn create(
        config: WorldConfig,
        scene: Arc<Scene>,
        terrain: Arc<dyn HeightSampler + Send + Sync>,
        exit: StopFlag,
    ) -> io::Result<Self> {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        let queue = Arc::new(InputQueue::new(config.queue_capacity));
        let stop = StopFlag::new();
        let mut simulation = Simulation::new(&config, scene.clone(), terrain);

        let thread = {
            let queue = queue.clone();
            let stop = stop.clone();
            let tick = config.tick;
            std::thread::Builder::new()
                .name("world".into())
                .spawn(move || {
                    let mut boundary = Instant::now() + tick;
                    while !stop.is_requested() {
                        simulation.run_tick(&queue, boundary);
                        boundary += tick;
                        let now = Instant::now();
                        if boundary < now {
                            log::debug!("world tick overran by {:?}", now - boundary);
                            boundary = now;
                        }
                    }
                    log::debug!("world thread finished");
                })?
        };

        Ok(World {
            scene,
            queue,
            exit,
            stop,
            thread: Some(thread),
        })
    }

    pub fn scene(&self) -> Arc<Scene> {
        self.scene.clone()
    }

    pub fn input(&self) -> InputHandle {
        InputHandle::new(self.queue.clone(), self.exit.clone())
    }

    /// Stops the simulation at the next tick boundary and joins the thread.
    pub fn destroy(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.stop.request();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("world thread panicked");
            }
        }
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Slope;

    impl HeightSampler for Slope {
        fn sample_height(&self, x: f32, z: f32) -> f32 {
            0.5 * x + 0.25 * z
        }
    }

    fn simulation() -> (Simulation, Arc<Scene>) {
        let scene = Arc::new(Scene::create([0.0; 3], &[], &[]));
        let sim = Simulation::new(&WorldConfig::default(), scene.clone(), Arc::new(Slope));
        (sim, scene)
    }

    fn event(timestamp: Instant, kind: InputEventKind) -> InputEvent {
        InputEvent { timestamp, kind }
    }

    #[test]
    fn forward_for_one_second_moves_ten_units() {
        let (mut sim, scene) = simulation();
        let queue = InputQueue::default();
        let t0 = Instant::now();
        queue.push_event(event(t0, InputEventKind::KeyPress(Key::Up)));
        queue.push_event(event(
            t0 + Duration::from_secs(1),
            InputEventKind::KeyRelease(Key::Up),
        ));

        sim.run_tick(&queue, t0 + Duration::from_millis(1050));

        let character = sim.character();
        assert_relative_eq!(character.position.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(character.position.z, 0.0, epsilon = 1e-4);
        assert_relative_eq!(character.position.y, Slope.sample_height(0.0, 0.0) + 2.0);
        assert_relative_eq!(character.facing, 0.0);

        let state = scene.lock();
        assert_eq!(state.eye_pos, character.position);
        assert_relative_eq!(state.eye_dir, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn held_key_keeps_moving_across_ticks() {
        let (mut sim, _scene) = simulation();
        let queue = InputQueue::default();
        let t0 = Instant::now();
        queue.push_event(event(t0, InputEventKind::KeyPress(Key::Char('d'))));

        sim.run_tick(&queue, t0 + Duration::from_millis(500));
        sim.run_tick(&queue, t0 + Duration::from_millis(1000));

        // strafing right while facing +z heads towards -x
        let position = sim.character().position;
        assert_relative_eq!(position.x, -10.0, epsilon = 1e-3);
        assert_relative_eq!(position.z, -10.0, epsilon = 1e-3);
        assert_relative_eq!(position.y, Slope.sample_height(-10.0, -10.0) + 2.0, epsilon = 1e-3);
    }

    #[test]
    fn walking_follows_the_facing_direction() {
        let scene = Arc::new(Scene::create([0.0; 3], &[], &[]));
        let config = WorldConfig {
            start_facing: 90.0,
            ..WorldConfig::default()
        };
        let mut sim = Simulation::new(&config, scene, Arc::new(Slope));
        let queue = InputQueue::default();
        let t0 = Instant::now();
        queue.push_event(event(t0, InputEventKind::KeyPress(Key::Up)));
        queue.push_event(event(t0, InputEventKind::KeyPress(Key::Char('d'))));
        queue.push_event(event(
            t0 + Duration::from_secs(1),
            InputEventKind::KeyRelease(Key::Up),
        ));
        queue.push_event(event(
            t0 + Duration::from_secs(1),
            InputEventKind::KeyRelease(Key::Char('d')),
        ));

        sim.run_tick(&queue, t0 + Duration::from_millis(1050));

        // facing +x, so right is +z
        let position = sim.character().position;
        assert_relative_eq!(position.x, 10.0, epsilon = 1e-3);
        assert_relative_eq!(position.z, 0.0, epsilon = 1e-3);
        assert_relative_eq!(facing_direction(90.0), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn turning_wraps_facing() {
        let (mut sim, scene) = simulation();
        let queue = InputQueue::default();
        let t0 = Instant::now();
        queue.push_event(event(t0, InputEventKind::KeyPress(Key::Right)));
        queue.push_event(event(
            t0 + Duration::from_secs(1),
            InputEventKind::KeyRelease(Key::Right),
        ));
        sim.run_tick(&queue, t0 + Duration::from_secs(1));

        assert_relative_eq!(sim.character().facing, 270.0, epsilon = 1e-3);
        assert_relative_eq!(
            scene.lock().eye_dir,
            Vector3::new(-1.0, 0.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn late_events_wait_for_next_tick() {
        let (mut sim, _scene) = simulation();
        let queue = InputQueue::default();
        let t0 = Instant::now();
        let boundary = t0 + Duration::from_millis(50);
        queue.push_event(event(
            boundary + Duration::from_millis(10),
            InputEventKind::KeyPress(Key::Up),
        ));

        sim.run_tick(&queue, boundary);
        assert_eq!(queue.len(), 1);
        assert_relative_eq!(sim.character().position.z, -10.0);

        sim.run_tick(&queue, boundary + Duration::from_millis(110));
        assert!(queue.is_empty());
        assert_relative_eq!(sim.character().position.z, -9.0, epsilon = 1e-3);
    }

    #[test]
    fn escape_requests_exit_without_queueing() {
        let queue = Arc::new(InputQueue::default());
        let exit = StopFlag::new();
        let handle = InputHandle::new(queue.clone(), exit.clone());
        handle.on_key_press(Key::Char('w'));
        handle.on_key_press(Key::Escape);
        assert!(exit.is_requested());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn world_thread_publishes_eye_and_stops() {
        let scene = Arc::new(Scene::create([0.0; 3], &[], &[]));
        let exit = StopFlag::new();
        let config = WorldConfig {
            tick: Duration::from_millis(5),
            ..WorldConfig::default()
        };
        let world = World::create(config, scene.clone(), Arc::new(Slope), exit.clone()).unwrap();
        world.input().on_key_press(Key::Up);
        std::thread::sleep(Duration::from_millis(100));
        world.destroy();

        assert!(!exit.is_requested());
        let state = scene.lock();
        assert!(state.eye_pos.z > -10.0);
        assert_relative_eq!(
            state.eye_pos.y,
            Slope.sample_height(state.eye_pos.x, state.eye_pos.z) + 2.0,
            epsilon = 1e-4
        );
    }
}
