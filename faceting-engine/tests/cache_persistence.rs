use faceting_engine::{
    Action, CacheStore, Event, FacetConfig, FacetEngine, FileCacheStore, SaveStatus, Solver,
    StoneState,
};
use std::path::PathBuf;

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "faceting-engine-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn config(dir: PathBuf) -> FacetConfig {
    FacetConfig {
        attempts_budget: 5,
        total: 8,
        goal3: 3,
        cache_dir: dir,
        ..FacetConfig::default()
    }
}

#[test]
fn reloaded_tables_reproduce_fresh_values() {
    let dir = temp_path("reload");
    let engine = FacetEngine::new(config(dir.clone()), FileCacheStore::new(&dir)).unwrap();
    let history = [
        Event::success(Action::First),
        Event::failure(Action::Second),
        Event::success(Action::Negative),
    ];

    let mut fresh = engine.open_driver();
    let fresh_rec = fresh.recommend(&history);
    let solver = fresh.into_solver();
    let saved = engine.persist(&solver).unwrap();
    assert_eq!(
        saved,
        Some(SaveStatus::Written {
            entries: solver.len()
        })
    );
    assert!(engine.store().path_for(&engine.problem()).exists());

    let mut cached = engine.open_driver();
    assert_eq!(cached.solver().len(), solver.len());
    let cached_rec = cached.recommend(&history);
    assert_eq!(cached_rec.decision, fresh_rec.decision);
    for (lhs, rhs) in cached_rec.candidates.iter().zip(&fresh_rec.candidates) {
        assert!(lhs.estimate.bit_eq(&rhs.estimate));
    }
    assert!(!cached.solver().is_dirty());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn partial_tables_are_extended_but_never_rewritten() {
    let dir = temp_path("partial");
    let cfg = config(dir.clone());
    let params = cfg.problem();
    let store = FileCacheStore::new(&dir);

    // Only the subtree below one history is solved and saved.
    let mut partial = Solver::new(params);
    let deep = StoneState::from_history(&params, &[Event::success(Action::First); 4]);
    partial.evaluate(&deep);
    store.save(&params, partial.table()).unwrap();
    let on_disk = std::fs::read(store.path_for(&params)).unwrap();

    let engine = FacetEngine::new(cfg, store).unwrap();
    let mut solver = engine.open_solver();
    assert_eq!(solver.len(), partial.len());
    let value = solver.evaluate(&StoneState::initial(&params));
    assert!(solver.is_dirty());
    assert!(value.bit_eq(&Solver::new(params).evaluate(&StoneState::initial(&params))));

    assert_eq!(engine.persist(&solver).unwrap(), Some(SaveStatus::AlreadyPresent));
    assert_eq!(std::fs::read(engine.store().path_for(&params)).unwrap(), on_disk);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unreadable_cache_falls_back_to_computation() {
    let dir = temp_path("garbage");
    let cfg = config(dir.clone());
    let store = FileCacheStore::new(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(store.path_for(&cfg.problem()), "not json at all").unwrap();

    let engine = FacetEngine::new(cfg, store).unwrap();
    let mut driver = engine.open_driver();
    assert!(driver.solver().is_empty());
    assert!(driver.state_value(&[]).success > 0.0);

    let _ = std::fs::remove_dir_all(dir);
}
