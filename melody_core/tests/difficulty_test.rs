use melody_core::chart::Quality;
use melody_core::gameplay::difficulty::{AdaptiveConfig, DifficultyLevel, DifficultyManager};
use melody_core::EngineError;

#[test]
fn test_raise_after_five_perfects_with_high_accuracy() {
    let mut manager = DifficultyManager::default();
    assert_eq!(manager.level(), DifficultyLevel::Easy);

    // Three groups of four perfects and a good: accurate, but the streak
    // never reaches five
    for _ in 0..3 {
        for _ in 0..4 {
            assert!(manager.record_judgment(Quality::Perfect).is_none());
        }
        assert!(manager.record_judgment(Quality::Good).is_none());
    }
    for _ in 0..4 {
        assert!(manager.record_judgment(Quality::Perfect).is_none());
    }

    let change = manager
        .record_judgment(Quality::Perfect)
        .expect("Fifth perfect should raise");
    assert_eq!(change.from, DifficultyLevel::Easy);
    assert_eq!(change.to, DifficultyLevel::Medium);
    assert_eq!(change.config, DifficultyLevel::Medium.config());
    assert!(manager.rolling_accuracy() >= 0.85);
    assert_eq!(manager.perfect_streak(), 0);
    assert_eq!(manager.miss_streak(), 0);

    // Fresh evidence needed before the next change
    assert!(manager.record_judgment(Quality::Perfect).is_none());
}

#[test]
fn test_lower_after_misses_once_window_half_full() {
    let mut manager = DifficultyManager::default();
    manager.set_level(DifficultyLevel::Medium);

    for _ in 0..9 {
        assert!(manager.record_judgment(Quality::Miss).is_none());
    }
    let change = manager.record_judgment(Quality::Miss).expect("Should lower");
    assert_eq!(change.to, DifficultyLevel::Easy);

    assert!(manager.record_judgment(Quality::Miss).is_none());
    assert!(manager.record_judgment(Quality::Miss).is_none());
    let change = manager.record_judgment(Quality::Miss).expect("Should lower again");
    assert_eq!(change.to, DifficultyLevel::VeryEasy);

    for _ in 0..20 {
        assert!(manager.record_judgment(Quality::Miss).is_none());
    }
    assert_eq!(manager.level(), DifficultyLevel::VeryEasy);
}

#[test]
fn test_never_exceeds_bounds() {
    let mut manager = DifficultyManager::default();
    manager
        .set_bounds(DifficultyLevel::VeryEasy, DifficultyLevel::Medium)
        .unwrap();

    for _ in 0..200 {
        manager.record_judgment(Quality::Perfect);
        assert!(manager.level() <= DifficultyLevel::Medium);
    }
    assert_eq!(manager.level(), DifficultyLevel::Medium);
    assert!(manager.increase().is_none());
    assert_eq!(manager.set_level(DifficultyLevel::VeryHard), None);
}

#[test]
fn test_tightened_bounds_clamp_current_level() {
    let mut manager = DifficultyManager::default();
    let change = manager
        .set_bounds(DifficultyLevel::Medium, DifficultyLevel::Hard)
        .unwrap()
        .expect("Easy is below the new minimum");
    assert_eq!(change.to, DifficultyLevel::Medium);

    let err = manager
        .set_bounds(DifficultyLevel::VeryHard, DifficultyLevel::Easy)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvertedBounds {
            min: DifficultyLevel::VeryHard,
            max: DifficultyLevel::Easy,
        }
    );
    assert_eq!(manager.bounds(), (DifficultyLevel::Medium, DifficultyLevel::Hard));
}

#[test]
fn test_disabled_adaptation_only_tracks() {
    let config = AdaptiveConfig {
        enabled: false,
        ..AdaptiveConfig::default()
    };
    let mut manager = DifficultyManager::new(config).unwrap();
    for _ in 0..30 {
        assert!(manager.record_judgment(Quality::Perfect).is_none());
    }
    assert_eq!(manager.level(), DifficultyLevel::Easy);
    assert_eq!(manager.perfect_streak(), 30);
    assert_eq!(manager.rolling_accuracy(), 1.0);
}

#[test]
fn test_custom_thresholds() {
    let config = AdaptiveConfig {
        window_size: 4,
        raise_perfect_streak: 2,
        ..AdaptiveConfig::default()
    };
    let mut manager = DifficultyManager::new(config).unwrap();
    assert!(manager.record_judgment(Quality::Perfect).is_none());
    let change = manager.record_judgment(Quality::Perfect).expect("Should raise early");
    assert_eq!(change.to, DifficultyLevel::Medium);
}

#[test]
fn test_age_presets_and_full_reset() {
    let mut manager = DifficultyManager::default();
    let change = manager.configure_for_age(9).expect("Age 9 is medium");
    assert_eq!(change.to, DifficultyLevel::Medium);
    assert_eq!(manager.config().lane_count, 4);

    manager.record_judgment(Quality::Good);
    let change = manager.full_reset().expect("Back to the initial level");
    assert_eq!(change.to, DifficultyLevel::Easy);
    assert_eq!(manager.rolling_accuracy(), 0.5);
}

#[test]
fn test_level_configs_get_harder() {
    let configs: Vec<_> = DifficultyLevel::ALL.iter().map(|l| l.config()).collect();
    for pair in configs.windows(2) {
        assert!(pair[0].note_speed < pair[1].note_speed);
        assert!(pair[0].timing_multiplier > pair[1].timing_multiplier);
        assert!(pair[0].lane_count <= pair[1].lane_count);
    }
    assert_eq!(DifficultyLevel::VeryEasy.display_name(), "Super Easy");
}
