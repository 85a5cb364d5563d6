// The gait library. Every routine here is a straight-line sequence of
// move/wait calls against the dispatcher; all asynchrony lives below, in
// the per-actuator completion tracking. Each walking gait runs its cycles
// and then settles the chassis back to neutral before returning, so gaits
// compose without carrying state between calls.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::gait::layout::{Layout, LegGroup, Swing};
use crate::motion::{ActuatorMask, MotionDispatcher};

// Set-points, centi-degrees from calibrated neutral.
const FOOT_UP: i32 = 450;
const FOOT_DOWN: i32 = -50;
const HIP_SWAY: i32 = 450;
const SWAY_FOOT_RAISE: i32 = 850;
const BOB_FOOT_HIGH: i32 = 1050;
const BOB_FOOT_TUCK: i32 = -450;
const WAVE_FOOT_READY: i32 = 700;
const WAVE_FOOT_LIFT: i32 = 1050;
const POSE_FEET_UP: i32 = 500;
const POSE_FEET_HIGH: i32 = 1050;
const POSE_FEET_DOWN: i32 = 100;
const POSE_FEET_IN: i32 = -450;
const NEUTRAL_CDEG: i32 = 0;

// Pacing. Real servos need the pauses; tests run unpaced.
const WAVE_SETTLE: Duration = Duration::from_secs(3);
const STAGGER_GAP: Duration = Duration::from_millis(100);
const SHOWCASE_SHORT: Duration = Duration::from_secs(2);
const SHOWCASE_LEAD: Duration = Duration::from_secs(5);
const SHOWCASE_REST: Duration = Duration::from_secs(10);
const SHOWCASE_LONG: Duration = Duration::from_secs(15);

/// The chassis as the gaits see it: a dispatcher plus the layout table.
pub struct Legs {
    dispatcher: MotionDispatcher,
    layout: &'static Layout,
    pacing: bool,
}

impl Legs {
    pub fn new(dispatcher: MotionDispatcher, layout: &'static Layout) -> Legs {
        Legs {
            dispatcher,
            layout,
            pacing: true,
        }
    }

    /// Skip the wall-clock pauses (wave settle, stagger gaps, showcase
    /// holds). Move/wait ordering is unchanged.
    pub fn unpaced(mut self) -> Legs {
        self.pacing = false;
        self
    }

    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    /// Alternating-tripod walk: one group of feet planted while the other
    /// repositions, hips driving the body over the planted side.
    pub fn tripod(&self, cycles: u32) {
        debug!("tripod gait, {} cycles", cycles);
        let d = &self.dispatcher;
        let all = self.layout.all();

        for _ in 0..cycles {
            d.wait_all(all);

            // plant group A, free group B
            d.move_all(self.layout.feet(LegGroup::A), FOOT_DOWN);
            d.wait_all(self.layout.feet(LegGroup::A));
            d.move_all(self.layout.feet(LegGroup::B), FOOT_UP);
            d.wait_all(self.layout.feet(LegGroup::B));

            // drive the body over the planted legs while the lifted legs
            // reposition. Both hip groups swing concurrently; the wait
            // below is the only barrier before the stance swap.
            self.swing_hips(LegGroup::A, Swing::Back);
            self.swing_hips(LegGroup::B, Swing::Forward);
            d.wait_all(all);

            // mirror half-cycle: plant B, free A
            d.move_all(self.layout.feet(LegGroup::B), FOOT_DOWN);
            d.wait_all(self.layout.feet(LegGroup::B));
            d.move_all(self.layout.feet(LegGroup::A), FOOT_UP);
            d.wait_all(self.layout.feet(LegGroup::A));

            self.swing_hips(LegGroup::B, Swing::Back);
            self.swing_hips(LegGroup::A, Swing::Forward);
            // drained by the next cycle's leading wait, or by the settle
        }
        self.settle();
    }

    /// Rock the body side to side on a widened stance.
    pub fn sway(&self, cycles: u32) {
        debug!("sway gait, {} cycles", cycles);
        let d = &self.dispatcher;
        let all = self.layout.all();
        let hips = self.layout.hips();

        // widen the stance; the first cycle's wait covers the raise
        d.move_all(self.layout.all_feet(), SWAY_FOOT_RAISE);
        for _ in 0..cycles {
            d.wait_all(all);
            d.move_all(hips, HIP_SWAY);
            d.wait_all(hips);
            d.move_all(hips, -HIP_SWAY);
        }
        self.settle();
    }

    /// Push the body up and drop it back down on all feet at once.
    pub fn bob(&self, cycles: u32) {
        debug!("bob gait, {} cycles", cycles);
        let d = &self.dispatcher;
        let all = self.layout.all();
        let feet = self.layout.all_feet();

        d.move_all(all, NEUTRAL_CDEG);
        for _ in 0..cycles {
            d.wait_all(all);
            d.move_all(feet, BOB_FOOT_HIGH);
            d.wait_all(feet);
            d.move_all(feet, BOB_FOOT_TUCK);
        }
        self.settle();
    }

    /// Ripple wave: lift each foot in turn around the ring while lowering
    /// its predecessor. Only the lifting foot gates the phase, so the
    /// lowering foot gets the whole next phase to take weight again.
    pub fn ripple(&self, cycles: u32) {
        debug!("ripple gait, {} cycles", cycles);
        let d = &self.dispatcher;
        let ring = self.layout.wave_ring();

        d.move_all(self.layout.hips(), NEUTRAL_CDEG);
        d.move_all(self.layout.all_feet(), WAVE_FOOT_READY);
        d.wait_all(self.layout.all());
        self.pause(WAVE_SETTLE);

        for _ in 0..cycles {
            for (slot, &lifting) in ring.iter().enumerate() {
                let lowering = ring[(slot + ring.len() - 1) % ring.len()];
                d.move_one(lifting, WAVE_FOOT_LIFT);
                d.move_one(lowering, WAVE_FOOT_READY);
                d.wait_one(lifting);
            }
        }
        self.settle();
    }

    pub fn hips_left(&self) {
        self.pose(self.layout.hips(), HIP_SWAY);
    }

    pub fn hips_right(&self) {
        self.pose(self.layout.hips(), -HIP_SWAY);
    }

    pub fn hips_center(&self) {
        self.pose(self.layout.hips(), NEUTRAL_CDEG);
    }

    pub fn feet_up(&self) {
        self.pose(self.layout.all_feet(), POSE_FEET_UP);
    }

    pub fn feet_up_high(&self) {
        self.pose(self.layout.all_feet(), POSE_FEET_HIGH);
    }

    pub fn feet_down(&self) {
        self.pose(self.layout.all_feet(), POSE_FEET_DOWN);
    }

    pub fn feet_in(&self) {
        self.pose(self.layout.all_feet(), POSE_FEET_IN);
    }

    /// Return every actuator to calibrated center.
    pub fn neutral(&self) {
        self.settle();
    }

    /// Power-up entry to neutral: issue the moves one actuator at a time
    /// with a gap between them, so the whole chassis never draws inrush
    /// current in the same instant.
    pub fn stagger_to_neutral(&self) {
        debug!("staggering {} actuators to neutral", self.layout.len());
        for actuator in self.layout.all().iter() {
            self.dispatcher.move_one(actuator, NEUTRAL_CDEG);
            self.pause(STAGGER_GAP);
        }
        self.dispatcher.wait_all(self.layout.all());
    }

    /// The full demo choreography: pose tour, then each gait in turn,
    /// with holds between the acts.
    pub fn showcase(&self) {
        debug!("showcase routine");
        self.pause(SHOWCASE_LEAD);
        self.feet_up();
        self.pause(SHOWCASE_SHORT);
        self.feet_up_high();
        self.pause(SHOWCASE_SHORT);
        self.feet_down();
        self.pause(SHOWCASE_LEAD);
        self.feet_in();
        self.pause(SHOWCASE_LEAD);
        self.feet_down();
        self.pause(SHOWCASE_SHORT);
        self.hips_left();
        self.pause(SHOWCASE_SHORT);
        self.hips_center();
        self.pause(SHOWCASE_SHORT);
        self.hips_right();
        self.pause(SHOWCASE_SHORT);
        self.hips_center();
        self.pause(SHOWCASE_LONG);

        self.bob(3);
        self.pause(SHOWCASE_LONG);
        self.ripple(4);
        self.pause(SHOWCASE_LONG);
        self.sway(2);
        self.pause(SHOWCASE_REST);
        self.tripod(5);
        self.pause(SHOWCASE_REST);
    }

    fn swing_hips(&self, group: LegGroup, direction: Swing) {
        for (hip, target) in self.layout.hip_swings(group, direction) {
            self.dispatcher.move_one(hip, target);
        }
    }

    /// Single-stage pose: command the group, hold until it arrives.
    fn pose(&self, mask: ActuatorMask, target_cdeg: i32) {
        self.dispatcher.move_all(mask, target_cdeg);
        self.dispatcher.wait_all(mask);
    }

    /// Drain everything in flight, return to center, and confirm arrival.
    /// Every walking gait ends here so the next routine starts from a
    /// known stance.
    fn settle(&self) {
        let all = self.layout.all();
        self.dispatcher.wait_all(all);
        self.dispatcher.move_all(all, NEUTRAL_CDEG);
        self.dispatcher.wait_all(all);
    }

    fn pause(&self, duration: Duration) {
        if self.pacing {
            thread::sleep(duration);
        }
    }
}
