use crate::input::Key;
use std::time::Instant;

/// Directional controls with their own "held since" timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
}

impl Motion {
    pub const ALL: [Motion; 6] = [
        Motion::Forward,
        Motion::Back,
        Motion::StrafeLeft,
        Motion::StrafeRight,
        Motion::TurnLeft,
        Motion::TurnRight,
    ];

    fn index(self) -> usize {
        match self {
            Motion::Forward => 0,
            Motion::Back => 1,
            Motion::StrafeLeft => 2,
            Motion::StrafeRight => 3,
            Motion::TurnLeft => 4,
            Motion::TurnRight => 5,
        }
    }

    pub fn for_key(key: Key) -> Option<Motion> {
        match key {
            Key::Char('w') | Key::Up => Some(Motion::Forward),
            Key::Char('s') | Key::Down => Some(Motion::Back),
            Key::Char('a') => Some(Motion::StrafeLeft),
            Key::Char('d') => Some(Motion::StrafeRight),
            Key::Char('q') | Key::Left => Some(Motion::TurnLeft),
            Key::Char('e') | Key::Right => Some(Motion::TurnRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRates {
    /// World units per second.
    pub move_rate: f32,
    /// Degrees per second.
    pub turn_rate: f32,
}

/// Motion gathered during one tick, in the character's local frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TickMotion {
    pub forward: f32,
    pub strafe: f32,
    pub turn: f32,
}

/// Time integrator for held movement keys.
///
/// Releasing a key integrates the whole interval since it was pressed.
/// `continue_movement` integrates held keys up to `now` and moves their
/// timestamp there, so no instant is counted twice.
#[derive(Debug, Clone)]
pub struct Movement {
    rates: MovementRates,
    held_since: [Option<Instant>; 6],
    accumulated: TickMotion,
}

impl Movement {
    pub fn new(rates: MovementRates) -> Self {
        Movement {
            rates,
            held_since: [None; 6],
            accumulated: TickMotion::default(),
        }
    }

    /// Repeated presses of a held key keep the original timestamp.
    pub fn press(&mut self, motion: Motion, at: Instant) {
        let slot = &mut self.held_since[motion.index()];
        if slot.is_none() {
            *slot = Some(at);
        }
    }

    pub fn release(&mut self, motion: Motion, at: Instant) {
        if let Some(since) = self.held_since[motion.index()].take() {
            let seconds = at.saturating_duration_since(since).as_secs_f32();
            self.integrate(motion, seconds);
        }
    }

    pub fn continue_movement(&mut self, now: Instant) {
        for motion in Motion::ALL.iter().copied() {
            if let Some(since) = self.held_since[motion.index()] {
                if now > since {
                    let seconds = (now - since).as_secs_f32();
                    self.integrate(motion, seconds);
                    self.held_since[motion.index()] = Some(now);
                }
            }
        }
    }

    pub fn is_held(&self, motion: Motion) -> bool {
        self.held_since[motion.index()].is_some()
    }

    pub fn accumulated(&self) -> TickMotion {
        self.accumulated
    }

    /// Zeroes the accumulators; held keys stay held.
    pub fn reset(&mut self) {
        self.accumulated = TickMotion::default();
    }

    fn integrate(&mut self, motion: Motion, seconds: f32) {
        let distance = self.rates.move_rate * seconds;
        let angle = self.rates.turn_rate * seconds;
        let acc = &mut self.accumulated;
        match motion {
            Motion::Forward => acc.forward += distance,
            Motion::Back => acc.forward -= distance,
            Motion::StrafeRight => acc.strafe += distance,
            Motion::StrafeLeft => acc.strafe -= distance,
            Motion::TurnLeft => acc.turn += angle,
            Motion::TurnRight => acc.turn -= angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    const RATES: MovementRates = MovementRates {
        move_rate: 10.0,
        turn_rate: 90.0,
    };

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn release_integrates_the_held_interval() {
        let t0 = Instant::now();
        let mut movement = Movement::new(RATES);
        movement.press(Motion::Forward, t0);
        movement.release(Motion::Forward, t0 + ms(1000));
        assert_relative_eq!(movement.accumulated().forward, 10.0, epsilon = 1e-4);
        assert!(!movement.is_held(Motion::Forward));
    }

    #[test]
    fn held_key_integrates_up_to_boundary() {
        let t0 = Instant::now();
        let mut movement = Movement::new(RATES);
        movement.press(Motion::TurnRight, t0);
        movement.continue_movement(t0 + ms(500));
        assert_relative_eq!(movement.accumulated().turn, -45.0, epsilon = 1e-3);
        assert!(movement.is_held(Motion::TurnRight));
    }

    #[test]
    fn continue_movement_does_not_double_count() {
        let t0 = Instant::now();
        let mut stepped = Movement::new(RATES);
        let mut single = Movement::new(RATES);
        stepped.press(Motion::StrafeLeft, t0);
        single.press(Motion::StrafeLeft, t0);

        for offset in &[100, 100, 350, 350, 720, 1000, 1000] {
            stepped.continue_movement(t0 + ms(*offset));
        }
        single.continue_movement(t0 + ms(1000));

        assert_relative_eq!(stepped.accumulated().strafe, -10.0, epsilon = 1e-4);
        assert_relative_eq!(
            stepped.accumulated().strafe,
            single.accumulated().strafe,
            epsilon = 1e-4
        );
    }

    #[test]
    fn release_after_continue_counts_only_the_rest() {
        let t0 = Instant::now();
        let mut movement = Movement::new(RATES);
        movement.press(Motion::Forward, t0);
        movement.continue_movement(t0 + ms(400));
        movement.reset();
        movement.release(Motion::Forward, t0 + ms(1000));
        assert_relative_eq!(movement.accumulated().forward, 6.0, epsilon = 1e-4);
    }

    #[test]
    fn repeated_press_keeps_first_timestamp() {
        let t0 = Instant::now();
        let mut movement = Movement::new(RATES);
        movement.press(Motion::Back, t0);
        movement.press(Motion::Back, t0 + ms(300));
        movement.release(Motion::Back, t0 + ms(500));
        assert_relative_eq!(movement.accumulated().forward, -5.0, epsilon = 1e-4);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut movement = Movement::new(RATES);
        movement.release(Motion::TurnLeft, Instant::now());
        assert_eq!(movement.accumulated(), TickMotion::default());
    }

    #[test]
    fn continue_before_press_time_is_a_no_op() {
        let t0 = Instant::now();
        let mut movement = Movement::new(RATES);
        movement.press(Motion::Forward, t0 + ms(200));
        movement.continue_movement(t0);
        assert_eq!(movement.accumulated(), TickMotion::default());
        movement.continue_movement(t0 + ms(300));
        assert_relative_eq!(movement.accumulated().forward, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn key_bindings() {
        assert_eq!(Motion::for_key(Key::Char('w')), Some(Motion::Forward));
        assert_eq!(Motion::for_key(Key::Right), Some(Motion::TurnRight));
        assert_eq!(Motion::for_key(Key::Char('x')), None);
    }
}
