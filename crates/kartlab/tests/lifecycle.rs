//! Runtime init/clean and session exclusivity.

use kartlab::{GraphicsConfig, KartlabError, PlayerConfig, Race, RaceConfig, Runtime};

fn graphics() -> GraphicsConfig {
    GraphicsConfig::ld().with_resolution(16, 12)
}

fn quiet() -> RaceConfig {
    RaceConfig {
        render: false,
        ..RaceConfig::default()
    }
}

#[test]
fn test_double_init_fails() {
    let mut runtime = Runtime::new();
    runtime.init(graphics()).unwrap();
    assert!(matches!(runtime.init(graphics()), Err(KartlabError::AlreadyInitialized)));
    assert!(runtime.is_initialized());
}

#[test]
fn test_clean_without_init_is_noop() {
    let mut runtime = Runtime::new();
    runtime.clean().unwrap();
    runtime.clean().unwrap();
    assert!(!runtime.is_initialized());
}

#[test]
fn test_reinit_after_clean() {
    let mut runtime = Runtime::new();
    runtime.init(graphics()).unwrap();
    runtime.clean().unwrap();
    runtime.init(GraphicsConfig::hd().with_resolution(8, 8)).unwrap();
    assert!(runtime.graphics().unwrap().glow);
}

#[test]
fn test_session_requires_init() {
    let runtime = Runtime::new();
    let err = Race::new(&runtime, quiet()).unwrap_err();
    assert!(matches!(err, KartlabError::NotInitialized));
    assert!(!runtime.is_running());
}

#[test]
fn test_one_session_at_a_time() {
    let mut runtime = Runtime::new();
    runtime.init(graphics()).unwrap();

    let race = Race::new(&runtime, quiet()).unwrap();
    assert!(runtime.is_running());
    assert!(matches!(
        Race::new(&runtime, quiet()),
        Err(KartlabError::SessionAlreadyActive)
    ));
    assert!(matches!(runtime.clean(), Err(KartlabError::SessionActive)));
    assert!(matches!(runtime.init(graphics()), Err(KartlabError::SessionActive)));

    drop(race);
    assert!(!runtime.is_running());
    let again = Race::new(&runtime, quiet()).unwrap();
    drop(again);
    runtime.clean().unwrap();
}

#[test]
fn test_failed_session_frees_slot() {
    let mut runtime = Runtime::new();
    runtime.init(graphics()).unwrap();

    let no_players = RaceConfig {
        players: Vec::new(),
        ..quiet()
    };
    assert!(matches!(
        Race::new(&runtime, no_players),
        Err(KartlabError::InvalidConfig(_))
    ));

    let bad_step = RaceConfig {
        step_size: 0.0,
        ..quiet()
    };
    assert!(matches!(Race::new(&runtime, bad_step), Err(KartlabError::InvalidConfig(_))));

    let unknown_track = RaceConfig {
        track: "atlantis".into(),
        ..quiet()
    };
    assert!(matches!(Race::new(&runtime, unknown_track), Err(KartlabError::Engine(_))));

    assert!(!runtime.is_running());
}

#[test]
fn test_listings() {
    let mut runtime = Runtime::new();
    assert!(runtime.list_tracks().is_empty());
    assert!(runtime.list_karts().is_empty());

    runtime.init(graphics()).unwrap();
    let tracks = runtime.list_tracks();
    assert_eq!(tracks, runtime.list_tracks());
    assert_eq!(
        tracks,
        vec!["battleisland", "hacienda", "lighthouse", "stadium", "zengarden"]
    );
    let karts = runtime.list_karts();
    assert_eq!(karts, runtime.list_karts());
    assert!(karts.iter().any(|k| k == "tux"));

    runtime.clean().unwrap();
    assert!(runtime.list_tracks().is_empty());
}

#[test]
fn test_unknown_kart_falls_back() {
    let mut runtime = Runtime::new();
    runtime.init(graphics()).unwrap();
    let config = RaceConfig {
        players: vec![PlayerConfig::new("not-a-kart", Default::default(), 0)],
        ..quiet()
    };
    let mut race = Race::new(&runtime, config).unwrap();
    race.start().unwrap();
    assert_eq!(race.world_state().unwrap().karts[0].ident, "tux");
}
