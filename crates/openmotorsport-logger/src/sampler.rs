//! Conversion of telemetry updates into channel samples.

use crate::events::{TelemetryUpdate, WheelTelemetry};
use crate::kinematics::{self, DistanceTracker, MPS_TO_KPH, MPS2_TO_G};
use crate::schema::*;
use openmotorsport_format::{ChannelId, Session, SessionError, SessionResult};

/// A telemetry update stamped with session elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    /// Seconds since logging started, before this update's `delta_time`
    pub elapsed_s: f64,
    pub update: TelemetryUpdate,
}

impl TimedSample {
    pub fn new(elapsed_s: f64, update: TelemetryUpdate) -> Self {
        Self { elapsed_s, update }
    }
}

fn resolve(session: &Session, name: &str, group: &str) -> SessionResult<ChannelId> {
    session
        .channel_id(name, Some(group))
        .ok_or_else(|| SessionError::unknown(name, Some(group)))
}

#[derive(Debug, Clone, Copy)]
struct VehicleChannels {
    acceleration: [ChannelId; 3],
    speed: ChannelId,
    pitch: ChannelId,
    roll: ChannelId,
    time: ChannelId,
    distance: ChannelId,
    gear: ChannelId,
    throttle: ChannelId,
    brake: ChannelId,
    clutch: ChannelId,
    steering: ChannelId,
    rpm: ChannelId,
    clutch_rpm: ChannelId,
    fuel: ChannelId,
    overheating: ChannelId,
}

impl VehicleChannels {
    fn resolve(session: &Session) -> SessionResult<Self> {
        Ok(Self {
            acceleration: [
                resolve(session, CHANNEL_ACCELERATION_X, GROUP_ACCELERATION)?,
                resolve(session, CHANNEL_ACCELERATION_Y, GROUP_ACCELERATION)?,
                resolve(session, CHANNEL_ACCELERATION_Z, GROUP_ACCELERATION)?,
            ],
            speed: resolve(session, CHANNEL_SPEED, GROUP_POSITION)?,
            pitch: resolve(session, CHANNEL_PITCH, GROUP_POSITION)?,
            roll: resolve(session, CHANNEL_ROLL, GROUP_POSITION)?,
            time: resolve(session, CHANNEL_TIME, GROUP_POSITION)?,
            distance: resolve(session, CHANNEL_DISTANCE, GROUP_POSITION)?,
            gear: resolve(session, CHANNEL_GEAR, GROUP_DRIVER)?,
            throttle: resolve(session, CHANNEL_THROTTLE, GROUP_DRIVER)?,
            brake: resolve(session, CHANNEL_BRAKE, GROUP_DRIVER)?,
            clutch: resolve(session, CHANNEL_CLUTCH, GROUP_DRIVER)?,
            steering: resolve(session, CHANNEL_STEERING, GROUP_DRIVER)?,
            rpm: resolve(session, CHANNEL_RPM, GROUP_ENGINE)?,
            clutch_rpm: resolve(session, CHANNEL_CLUTCH_RPM, GROUP_ENGINE)?,
            fuel: resolve(session, CHANNEL_FUEL, GROUP_ENGINE)?,
            overheating: resolve(session, CHANNEL_OVERHEATING, GROUP_ENGINE)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct WheelChannels {
    rotation: ChannelId,
    suspension_deflection: ChannelId,
    ride_height: ChannelId,
    tire_load: ChannelId,
    lateral_force: ChannelId,
    brake_temperature: ChannelId,
    pressure: ChannelId,
    temperature: [ChannelId; 3],
}

impl WheelChannels {
    fn resolve(session: &Session, group: &str) -> SessionResult<Self> {
        Ok(Self {
            rotation: resolve(session, CHANNEL_ROTATION, group)?,
            suspension_deflection: resolve(session, CHANNEL_SUSPENSION_DEFLECTION, group)?,
            ride_height: resolve(session, CHANNEL_RIDE_HEIGHT, group)?,
            tire_load: resolve(session, CHANNEL_TIRE_LOAD, group)?,
            lateral_force: resolve(session, CHANNEL_LATERAL_FORCE, group)?,
            brake_temperature: resolve(session, CHANNEL_BRAKE_TEMPERATURE, group)?,
            pressure: resolve(session, CHANNEL_PRESSURE, group)?,
            temperature: [
                resolve(session, CHANNEL_TEMPERATURE_LEFT, group)?,
                resolve(session, CHANNEL_TEMPERATURE_CENTER, group)?,
                resolve(session, CHANNEL_TEMPERATURE_RIGHT, group)?,
            ],
        })
    }

    fn write(&self, session: &mut Session, wheel: &WheelTelemetry) -> SessionResult<()> {
        session.push_sample(self.rotation, -wheel.rotation as f32)?;
        session.push_sample(self.suspension_deflection, wheel.suspension_deflection as f32)?;
        session.push_sample(self.ride_height, wheel.ride_height as f32)?;
        session.push_sample(self.tire_load, wheel.tire_load as f32)?;
        session.push_sample(self.lateral_force, wheel.lateral_force as f32)?;
        session.push_sample(self.brake_temperature, wheel.brake_temp as f32)?;
        session.push_sample(self.pressure, wheel.pressure as f32)?;
        for (id, value) in self.temperature.iter().zip(wheel.temperature) {
            session.push_sample(*id, value as f32)?;
        }
        Ok(())
    }
}

/// Writes one value per schema channel for each sampled update.
///
/// Channel ids are resolved once when the sampler is built; the cumulative
/// distance state lives here, so one sampler serves exactly one session.
#[derive(Debug, Clone)]
pub struct Sampler {
    vehicle: VehicleChannels,
    wheels: [WheelChannels; 4],
    distance: DistanceTracker,
    samples_taken: u64,
}

impl Sampler {
    /// Resolve every schema channel in `session`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownChannel`] for the first schema channel
    /// missing from `session`.
    pub fn new(session: &Session) -> SessionResult<Self> {
        let [lf, rf, lr, rr] = WHEEL_GROUPS;
        Ok(Self {
            vehicle: VehicleChannels::resolve(session)?,
            wheels: [
                WheelChannels::resolve(session, lf)?,
                WheelChannels::resolve(session, rf)?,
                WheelChannels::resolve(session, lr)?,
                WheelChannels::resolve(session, rr)?,
            ],
            distance: DistanceTracker::new(),
            samples_taken: 0,
        })
    }

    /// Number of samples written so far.
    pub fn samples_taken(&self) -> u64 {
        self.samples_taken
    }

    /// Append one sample of every channel to `session`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidChannelId`] if `session` is not the
    /// session this sampler was built for.
    pub fn sample(&mut self, session: &mut Session, sample: &TimedSample) -> SessionResult<()> {
        let info = &sample.update;
        let ids = self.vehicle;
        let distance_m = self.distance.advance(info.pos);

        for (id, accel) in ids
            .acceleration
            .iter()
            .zip([info.local_accel.x, info.local_accel.y, info.local_accel.z])
        {
            session.push_sample(*id, (accel * MPS2_TO_G) as f32)?;
        }

        session.push_sample(ids.speed, (kinematics::speed_mps(&info.local_vel) * MPS_TO_KPH) as f32)?;
        session.push_sample(ids.pitch, kinematics::pitch_degrees(&info.ori) as f32)?;
        session.push_sample(ids.roll, kinematics::roll_degrees(&info.ori) as f32)?;
        session.push_sample(ids.time, (sample.elapsed_s * 1000.0).trunc() as f32)?;
        session.push_sample(ids.distance, distance_m as f32)?;

        session.push_sample(ids.gear, info.gear as f32)?;
        session.push_sample(ids.throttle, (info.unfiltered_throttle * 100.0) as f32)?;
        session.push_sample(ids.brake, (info.unfiltered_brake * 100.0) as f32)?;
        session.push_sample(ids.clutch, (info.unfiltered_clutch * 100.0) as f32)?;
        session.push_sample(ids.steering, (info.unfiltered_steering * 100.0) as f32)?;

        session.push_sample(ids.rpm, info.engine_rpm as f32)?;
        session.push_sample(ids.clutch_rpm, info.clutch_rpm as f32)?;
        session.push_sample(ids.fuel, info.fuel as f32)?;
        session.push_sample(ids.overheating, if info.overheating { 1.0 } else { 0.0 })?;

        for (channels, wheel) in self.wheels.iter().zip(&info.wheels) {
            channels.write(session, wheel)?;
        }

        self.samples_taken += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Vec3;
    use crate::schema::build_session;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn last(session: &Session, name: &str, group: &str) -> Option<f32> {
        let id = session.channel_id(name, Some(group))?;
        session.channel(id)?.data().last()
    }

    fn close(actual: Option<f32>, expected: f32) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-3)
    }

    #[test]
    fn test_unit_conversions() -> TestResult {
        let mut session = build_session(200)?;
        let mut sampler = Sampler::new(&session)?;

        let mut update = TelemetryUpdate {
            local_accel: Vec3::new(9.80665, 0.0, -19.6133),
            local_vel: Vec3::new(0.0, 0.0, -50.0),
            gear: 4,
            unfiltered_throttle: 0.75,
            unfiltered_steering: -0.25,
            engine_rpm: 7250.0,
            overheating: true,
            ..TelemetryUpdate::default()
        };
        update.wheels[2].rotation = 80.0;
        update.wheels[2].temperature = [85.0, 90.0, 95.0];

        sampler.sample(&mut session, &TimedSample::new(12.3456, update))?;

        assert!(close(last(&session, CHANNEL_ACCELERATION_X, GROUP_ACCELERATION), 1.0));
        assert!(close(last(&session, CHANNEL_ACCELERATION_Z, GROUP_ACCELERATION), -2.0));
        assert!(close(last(&session, CHANNEL_SPEED, GROUP_POSITION), 180.0));
        assert!(close(last(&session, CHANNEL_TIME, GROUP_POSITION), 12345.0));
        assert!(close(last(&session, CHANNEL_DISTANCE, GROUP_POSITION), 0.0));
        assert!(close(last(&session, CHANNEL_GEAR, GROUP_DRIVER), 4.0));
        assert!(close(last(&session, CHANNEL_THROTTLE, GROUP_DRIVER), 75.0));
        assert!(close(last(&session, CHANNEL_STEERING, GROUP_DRIVER), -25.0));
        assert!(close(last(&session, CHANNEL_RPM, GROUP_ENGINE), 7250.0));
        assert!(close(last(&session, CHANNEL_OVERHEATING, GROUP_ENGINE), 1.0));
        assert!(close(last(&session, CHANNEL_ROTATION, "Wheel LR"), -80.0));
        assert!(close(last(&session, CHANNEL_TEMPERATURE_CENTER, "Wheel LR"), 90.0));
        assert!(close(last(&session, CHANNEL_ROTATION, "Wheel RF"), 0.0));
        Ok(())
    }

    #[test]
    fn test_every_channel_gets_one_value_per_sample() -> TestResult {
        let mut session = build_session(200)?;
        let mut sampler = Sampler::new(&session)?;

        for i in 0..3 {
            let update = TelemetryUpdate {
                pos: Vec3::new(f64::from(i) * 10.0, 0.0, 0.0),
                ..TelemetryUpdate::default()
            };
            sampler.sample(&mut session, &TimedSample::new(f64::from(i) * 0.2, update))?;
        }

        assert_eq!(sampler.samples_taken(), 3);
        assert!(session.channels().iter().all(|c| c.data().len() == 3));
        assert!(close(last(&session, CHANNEL_DISTANCE, GROUP_POSITION), 20.0));
        Ok(())
    }

    #[test]
    fn test_incomplete_schema_is_rejected() {
        let session = Session::new();
        let err = Sampler::new(&session).err();
        assert!(matches!(err, Some(SessionError::UnknownChannel { .. })));
    }
}
