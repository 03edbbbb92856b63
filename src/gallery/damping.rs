// Critically damped step toward a goal. Never overshoots and snaps inside SETTLE_EPSILON.

const SETTLE_EPSILON: f32 = 0.001;
const MIN_SMOOTH_TIME: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(super) struct SmoothDamped {
    pub(super) value: f32,
    velocity: f32,
}

impl SmoothDamped {
    // Returns true while still moving.
    pub(super) fn step(&mut self, target: f32, smooth_time: f32, dt: f32) -> bool {
        if (self.value - target).abs() <= SETTLE_EPSILON {
            self.value = target;
            self.velocity = 0.0;
            return false;
        }
        if dt <= 0.0 {
            return true;
        }

        let omega = 2.0 / smooth_time.max(MIN_SMOOTH_TIME);
        let x = omega * dt;
        // Polynomial approximation of exp(-x).
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let change = self.value - target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut output = target + (change + temp) * decay;

        let moving_up = target - self.value > 0.0;
        if moving_up == (output > target) {
            output = target;
            self.velocity = 0.0;
        }

        self.value = output;
        true
    }
}
