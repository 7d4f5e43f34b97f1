mod common;

use common::{id_of, pair, session_with, test_config, FixedEngine, TestLibrary};
use dupe_arbiter_core::locations::{IgnoreList, Location};
use dupe_arbiter_core::safety::SafetyManager;
use dupe_arbiter_core::search::{JsonResultSource, SearchEngine};
use dupe_arbiter_core::{ApplySummary, Error, Session, SkipReason};
use std::fs;

#[test]
fn test_apply_all_counts_each_group() {
    let library = TestLibrary::new();
    // Applied: 1_a is both the largest file and the preferred name
    let keep = library.image("1_a.jpg", 2000, 0.0);
    let drop = library.image("2_a.jpg", 1000, 0.0);
    // Skipped: no ordinal in either name
    let x = library.image("x.jpg", 1000, 0.0);
    let y = library.image("y.jpg", 1000, 0.0);
    // Failed: the file to delete disappears before the plan runs
    let stays = library.image("5_q.jpg", 1000, 0.0);
    let vanished = library.image("6_q.jpg", 1000, 0.0);

    let mut session = session_with(
        test_config(),
        vec![pair(&keep, &drop), pair(&x, &y), pair(&stays, &vanished)],
    );
    fs::remove_file(&vanished.path).unwrap();

    let summary = session.apply_all().unwrap();
    assert_eq!(
        summary,
        ApplySummary {
            applied: 1,
            skipped: 1,
            failed: 1
        }
    );

    assert!(keep.path.exists());
    assert!(!drop.path.exists());
    assert!(stays.path.exists());
    assert_eq!(session.history().undo_len(), 1);
    // Pairs of the skipped and the failed group are still there
    assert_eq!(session.results().len(), 2);
}

#[test]
fn test_plan_reports_skip_reasons() {
    let library = TestLibrary::new();
    let x = library.image("x.jpg", 1000, 0.0);
    let y = library.image("y.jpg", 1000, 0.0);
    let session = session_with(test_config(), vec![pair(&x, &y)]);

    let plans = session.plan();
    assert_eq!(plans.len(), 1);
    assert!(matches!(
        plans[0].1.outcome,
        Err(SkipReason::NoOrdinal(_))
    ));
}

#[test]
fn test_ignored_pairs_stay_out_of_later_loads() {
    let library = TestLibrary::new();
    let a = library.image("1_a.jpg", 1, 0.0);
    let b = library.image("2_a.jpg", 1, 0.0);
    let c = library.image("3_a.jpg", 1, 0.0);
    let results = vec![pair(&a, &b), pair(&b, &c)];

    let mut session = session_with(test_config(), results.clone());
    let first = session.results().iter().next().unwrap().id;
    session.ignore(first).unwrap();
    assert_eq!(session.results().len(), 1);

    let ignore = session.close().unwrap();
    assert!(ignore.contains(&b.path, &a.path));

    let path = library.path("ignore.json");
    ignore.save_to_file(&path).unwrap();
    let reloaded = IgnoreList::from_file(&path).unwrap();

    let mut session = Session::new(test_config())
        .unwrap()
        .with_ignore_list(reloaded);
    let loaded = session.load_from(&mut FixedEngine::new(results)).unwrap();
    assert_eq!(loaded, 1);
    assert_eq!(session.groups().len(), 1);
    assert_eq!(session.groups()[0].files.len(), 2);
}

#[test]
fn test_failed_search_is_reported() {
    let mut session = Session::new(test_config()).unwrap();
    let mut engine = FixedEngine::new(Vec::new());
    engine.fail = true;

    assert!(matches!(session.load_from(&mut engine), Err(Error::Search(_))));
}

#[test]
fn test_load_from_json_export() {
    let library = TestLibrary::new();
    let a = library.image("1_a.jpg", 1, 0.0);
    let b = library.image("2_a.jpg", 1, 0.0);
    let c = library.image("3_a.jpg", 1, 0.0);
    let mut far = pair(&b, &c);
    far.difference = 20.0;

    let export = library.path("results.json");
    fs::write(
        &export,
        serde_json::to_string_pretty(&vec![pair(&a, &b), far]).unwrap(),
    )
    .unwrap();

    let mut source = JsonResultSource::new(&export);
    let mut session = Session::new(test_config()).unwrap();
    assert_eq!(session.load_from(&mut source).unwrap(), 1);
    assert_eq!(source.result_count(), 1);
    assert_eq!(session.images().len(), 2);
}

#[test]
fn test_orphans_from_interrupted_session_are_recovered() {
    let library = TestLibrary::new();
    let a = library.image("1_a.jpg", 2000, 0.0);
    let b = library.image("2_a.jpg", 1000, 0.0);

    {
        let mut session = session_with(test_config(), vec![pair(&a, &b)]);
        session.delete(id_of(&session, &b.path)).unwrap();
        // Dropped without close: the staged file stays behind
    }
    assert!(!b.path.exists());

    let safety = SafetyManager::new(&test_config());
    let orphans = safety.find_orphaned_temp_files(&[Location::new(library.dir.path(), false)]);
    assert_eq!(orphans, vec![safety.temp_path(&b.path)]);

    let restored = safety.recover(&orphans[0]).unwrap();
    assert_eq!(restored, b.path);
    assert_eq!(library.read("2_a.jpg"), common::contents_of("2_a.jpg"));
}
