use super::*;

#[test]
fn idle_when_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    assert!(!store.is_active());
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn save_then_load_with_stash() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    let state = SessionState {
        previous_branch: "main".into(),
        stash_ref: Some("0123abcd".into()),
    };
    store.save(&state).unwrap();
    assert!(store.is_active());
    assert_eq!(store.load().unwrap(), Some(state));
    assert_eq!(
        fs::read_to_string(dir.path().join("LAZYWORK_PREVIOUS_BRANCH")).unwrap(),
        "main"
    );
}

#[test]
fn save_without_stash_drops_stale_stash_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("LAZYWORK_STASH_REF"), "old").unwrap();
    let store = SessionStore::new(dir.path());
    store
        .save(&SessionState {
            previous_branch: "develop".into(),
            stash_ref: None,
        })
        .unwrap();
    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.previous_branch, "develop");
    assert_eq!(loaded.stash_ref, None);
    assert!(!dir.path().join("LAZYWORK_STASH_REF").exists());
}

#[test]
fn load_trims_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("LAZYWORK_PREVIOUS_BRANCH"), "main\n").unwrap();
    fs::write(dir.path().join("LAZYWORK_STASH_REF"), "\n").unwrap();
    let loaded = SessionStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(loaded.previous_branch, "main");
    assert_eq!(loaded.stash_ref, None);
}

#[test]
fn clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    store.clear().unwrap();
    store
        .save(&SessionState {
            previous_branch: "main".into(),
            stash_ref: Some("abc".into()),
        })
        .unwrap();
    store.clear().unwrap();
    assert!(!store.is_active());
    assert!(!dir.path().join("LAZYWORK_STASH_REF").exists());
    store.clear().unwrap();
}
