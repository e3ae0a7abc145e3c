//! Ray probe around karts in a running race.

use kartlab::sensor::{SENSOR_BUCKETS, SENSOR_STEPS};
use kartlab::{GraphicsConfig, KartlabError, Race, RaceConfig, Runtime, Surroundings};

fn started(config: RaceConfig) -> (Runtime, RaceConfig) {
    let mut runtime = Runtime::new();
    runtime.init(GraphicsConfig::ld().with_resolution(8, 6)).unwrap();
    (
        runtime,
        RaceConfig {
            render: false,
            ..config
        },
    )
}

/// theta index pointing straight down (180°).
const DOWN: usize = 18;

#[test]
fn test_grid_shape() {
    let (runtime, config) = started(RaceConfig::default());
    let mut race = Race::new(&runtime, config).unwrap();
    race.start().unwrap();

    let grid = race.surroundings(0).unwrap().unwrap();
    assert_eq!(Surroundings::shape(), (37, 37, 5));
    assert_eq!(grid.as_slice().len(), SENSOR_STEPS * SENSOR_STEPS * SENSOR_BUCKETS);
}

#[test]
fn test_ground_below_is_track() {
    let (runtime, config) = started(RaceConfig::default());
    let mut race = Race::new(&runtime, config).unwrap();
    race.start().unwrap();

    let grid = race.surroundings(0).unwrap().unwrap();
    for omega in 0..SENSOR_STEPS {
        // Ground is half a unit below the kart origin: only bucket 0 is set.
        assert_eq!(grid.ray(DOWN, omega).unwrap(), &[1, 0, 0, 0, 0]);
    }
    // Nothing above the kart.
    assert_eq!(grid.ray(0, 0).unwrap(), &[0; 5]);
}

#[test]
fn test_neighbour_kart_is_seen() {
    let (runtime, config) = started(RaceConfig {
        num_kart: 2,
        ..RaceConfig::default()
    });
    let mut race = Race::new(&runtime, config).unwrap();
    race.start().unwrap();

    // Kart 1 starts on the same grid row, a few units to the side.
    let grid = race.surroundings(0).unwrap().unwrap();
    assert!(grid.as_slice().iter().any(|&c| c == 2));
}

#[test]
fn test_probe_does_not_mutate_world() {
    let (runtime, config) = started(RaceConfig::default());
    let mut race = Race::new(&runtime, config).unwrap();
    race.start().unwrap();

    let before = race.world_state().unwrap();
    let a = race.surroundings(0).unwrap().unwrap();
    let b = race.surroundings(0).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(race.world_state().unwrap(), before);
}

#[test]
fn test_unknown_kart() {
    let (runtime, config) = started(RaceConfig::default());
    let mut race = Race::new(&runtime, config).unwrap();
    race.start().unwrap();
    assert!(matches!(race.surroundings(5), Err(KartlabError::Engine(_))));
}
