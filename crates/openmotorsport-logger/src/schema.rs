//! Fixed channel schema of a logged session.
//!
//! Channels are created in the order listed here, so ids are stable across
//! sessions: acceleration, position, driver and engine channels first, then
//! the per-wheel block for each of LF, RF, LR and RR.

use openmotorsport_format::{ChannelSpec, Session, SessionResult};

pub const UNITS_KPH: &str = "kph";
pub const UNITS_GEE: &str = "g";
pub const UNITS_DEGREES: &str = "deg";
pub const UNITS_MILLISECONDS: &str = "ms";
pub const UNITS_LITRES: &str = "l";
pub const UNITS_RPM: &str = "rpm";
pub const UNITS_CELSIUS: &str = "c";
pub const UNITS_BOOLEAN: &str = "boolean";
pub const UNITS_PERCENT: &str = "%";
pub const UNITS_GEAR: &str = "gear";
pub const UNITS_METERS: &str = "m";
pub const UNITS_NEWTONS: &str = "n";
pub const UNITS_RADIANS_PER_SECOND: &str = "rad/sec";
pub const UNITS_PASCAL: &str = "pa";

pub const GROUP_ACCELERATION: &str = "Acceleration";
pub const GROUP_POSITION: &str = "Position";
pub const GROUP_DRIVER: &str = "Driver";
pub const GROUP_ENGINE: &str = "Engine";

pub const CHANNEL_ACCELERATION_X: &str = "Acceleration X";
pub const CHANNEL_ACCELERATION_Y: &str = "Acceleration Y";
pub const CHANNEL_ACCELERATION_Z: &str = "Acceleration Z";
pub const CHANNEL_SPEED: &str = "Speed";
pub const CHANNEL_PITCH: &str = "Pitch";
pub const CHANNEL_ROLL: &str = "Roll";
pub const CHANNEL_TIME: &str = "Time";
pub const CHANNEL_DISTANCE: &str = "Distance";
pub const CHANNEL_GEAR: &str = "Gear";
pub const CHANNEL_THROTTLE: &str = "Throttle";
pub const CHANNEL_BRAKE: &str = "Brake";
pub const CHANNEL_CLUTCH: &str = "Clutch";
pub const CHANNEL_STEERING: &str = "Steering";
pub const CHANNEL_RPM: &str = "RPM";
pub const CHANNEL_CLUTCH_RPM: &str = "Clutch RPM";
pub const CHANNEL_FUEL: &str = "Fuel";
pub const CHANNEL_OVERHEATING: &str = "Overheating";

pub const CHANNEL_ROTATION: &str = "Rotation";
pub const CHANNEL_SUSPENSION_DEFLECTION: &str = "Suspension Deflection";
pub const CHANNEL_RIDE_HEIGHT: &str = "Ride Height";
pub const CHANNEL_TIRE_LOAD: &str = "Tire Load";
pub const CHANNEL_LATERAL_FORCE: &str = "Lateral Force";
pub const CHANNEL_BRAKE_TEMPERATURE: &str = "Brake Temperature";
pub const CHANNEL_PRESSURE: &str = "Pressure";
pub const CHANNEL_TEMPERATURE_LEFT: &str = "Temperature Left";
pub const CHANNEL_TEMPERATURE_CENTER: &str = "Temperature Center";
pub const CHANNEL_TEMPERATURE_RIGHT: &str = "Temperature Right";

/// Wheel groups in the order of [`crate::events::TelemetryUpdate::wheels`].
pub const WHEEL_GROUPS: [&str; 4] = ["Wheel LF", "Wheel RF", "Wheel LR", "Wheel RR"];

/// Number of sectors per lap recorded in session metadata.
pub const SECTORS_PER_LAP: u16 = 3;

/// Session-wide channels as `(group, name, units)`.
pub const VEHICLE_CHANNELS: [(&str, &str, &str); 17] = [
    (GROUP_ACCELERATION, CHANNEL_ACCELERATION_X, UNITS_GEE),
    (GROUP_ACCELERATION, CHANNEL_ACCELERATION_Y, UNITS_GEE),
    (GROUP_ACCELERATION, CHANNEL_ACCELERATION_Z, UNITS_GEE),
    (GROUP_POSITION, CHANNEL_SPEED, UNITS_KPH),
    (GROUP_POSITION, CHANNEL_PITCH, UNITS_DEGREES),
    (GROUP_POSITION, CHANNEL_ROLL, UNITS_DEGREES),
    (GROUP_POSITION, CHANNEL_TIME, UNITS_MILLISECONDS),
    (GROUP_POSITION, CHANNEL_DISTANCE, UNITS_METERS),
    (GROUP_DRIVER, CHANNEL_GEAR, UNITS_GEAR),
    (GROUP_DRIVER, CHANNEL_THROTTLE, UNITS_PERCENT),
    (GROUP_DRIVER, CHANNEL_BRAKE, UNITS_PERCENT),
    (GROUP_DRIVER, CHANNEL_CLUTCH, UNITS_PERCENT),
    (GROUP_DRIVER, CHANNEL_STEERING, UNITS_PERCENT),
    (GROUP_ENGINE, CHANNEL_RPM, UNITS_RPM),
    (GROUP_ENGINE, CHANNEL_CLUTCH_RPM, UNITS_RPM),
    (GROUP_ENGINE, CHANNEL_FUEL, UNITS_LITRES),
    (GROUP_ENGINE, CHANNEL_OVERHEATING, UNITS_BOOLEAN),
];

/// Per-wheel channels as `(name, units)`.
pub const WHEEL_CHANNELS: [(&str, &str); 10] = [
    (CHANNEL_ROTATION, UNITS_RADIANS_PER_SECOND),
    (CHANNEL_SUSPENSION_DEFLECTION, UNITS_METERS),
    (CHANNEL_RIDE_HEIGHT, UNITS_METERS),
    (CHANNEL_TIRE_LOAD, UNITS_NEWTONS),
    (CHANNEL_LATERAL_FORCE, UNITS_NEWTONS),
    (CHANNEL_BRAKE_TEMPERATURE, UNITS_CELSIUS),
    (CHANNEL_PRESSURE, UNITS_PASCAL),
    (CHANNEL_TEMPERATURE_LEFT, UNITS_CELSIUS),
    (CHANNEL_TEMPERATURE_CENTER, UNITS_CELSIUS),
    (CHANNEL_TEMPERATURE_RIGHT, UNITS_CELSIUS),
];

/// Total number of channels in a logged session.
pub const CHANNEL_COUNT: usize = VEHICLE_CHANNELS.len() + WHEEL_GROUPS.len() * WHEEL_CHANNELS.len();

/// Every channel of the schema in creation order.
pub fn channel_specs(interval_ms: u32) -> Vec<ChannelSpec> {
    let vehicle = VEHICLE_CHANNELS.iter().map(|(group, name, units)| {
        ChannelSpec::new(*name)
            .group(*group)
            .units(*units)
            .interval_ms(interval_ms)
    });
    let wheels = WHEEL_GROUPS.iter().flat_map(|group| {
        WHEEL_CHANNELS.iter().map(move |(name, units)| {
            ChannelSpec::new(*name)
                .group(*group)
                .units(*units)
                .interval_ms(interval_ms)
        })
    });
    vehicle.chain(wheels).collect()
}

/// Create a session holding the full channel schema.
///
/// # Errors
///
/// Returns a [`openmotorsport_format::SessionError`] if the schema contains a
/// duplicate channel key.
pub fn build_session(interval_ms: u32) -> SessionResult<Session> {
    let mut session = Session::new();
    for spec in channel_specs(interval_ms) {
        session.add_channel(spec)?;
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openmotorsport_format::{ChannelId, SampleInterval};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_schema_has_57_unique_channels() -> TestResult {
        let session = build_session(200)?;
        assert_eq!(CHANNEL_COUNT, 57);
        assert_eq!(session.channels().len(), CHANNEL_COUNT);
        Ok(())
    }

    #[test]
    fn test_creation_order_fixes_ids() -> TestResult {
        let session = build_session(100)?;
        assert_eq!(
            session.channel_id(CHANNEL_ACCELERATION_X, Some(GROUP_ACCELERATION)),
            Some(ChannelId(0))
        );
        assert_eq!(
            session.channel_id(CHANNEL_DISTANCE, Some(GROUP_POSITION)),
            Some(ChannelId(7))
        );
        assert_eq!(
            session.channel_id(CHANNEL_OVERHEATING, Some(GROUP_ENGINE)),
            Some(ChannelId(16))
        );
        assert_eq!(
            session.channel_id(CHANNEL_ROTATION, Some("Wheel LF")),
            Some(ChannelId(17))
        );
        assert_eq!(
            session.channel_id(CHANNEL_TEMPERATURE_RIGHT, Some("Wheel RR")),
            Some(ChannelId(56))
        );
        Ok(())
    }

    #[test]
    fn test_every_channel_uses_configured_interval() -> TestResult {
        let session = build_session(50)?;
        assert!(
            session
                .channels()
                .iter()
                .all(|c| c.interval() == SampleInterval::Fixed(50) && c.units().is_some())
        );
        Ok(())
    }
}
