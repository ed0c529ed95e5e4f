//! Integration tests: end-to-end registry scenarios over the fixture modules
//! in `tests/files`, persisted through `FileStorage`.

use std::fs;
use std::path::{Path, PathBuf};

use modreg::core::paths::RepoPaths;
use modreg::registry::{FileStorage, Registry, RegistryError, StoreError};
use modreg::schema::{ImportError, YangImporter};
use tempfile::TempDir;

fn files_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/files")
}

fn fixture(name: &str) -> PathBuf {
    files_dir().join(format!("{name}.yang"))
}

fn open(repo: &Path) -> Registry {
    Registry::open(
        Box::new(FileStorage::new(RepoPaths::new(repo))),
        Box::new(YangImporter::new()),
    )
    .unwrap()
}

fn install(registry: &Registry, name: &str, replay: bool) {
    registry
        .install_module(&fixture(name), &[files_dir()], replay)
        .unwrap();
}

fn xml(registry: &Registry, name: &str) -> String {
    registry.render_module(name).unwrap().to_xml()
}

fn names(registry: &Registry) -> Vec<String> {
    registry
        .list_modules()
        .iter()
        .map(|r| r.name().to_string())
        .collect()
}

// =============================================================================
// Observed scenarios
// =============================================================================

#[test]
fn data_deps_scenario() {
    let repo = TempDir::new().unwrap();
    let registry = open(repo.path());

    install(&registry, "test", false);
    install(&registry, "ietf-interfaces", true);
    install(&registry, "iana-if-type", false);
    install(&registry, "refs", true);

    registry.remove_module("refs").unwrap();
    registry.remove_module("ietf-interfaces").unwrap();
    registry.remove_module("iana-if-type").unwrap();
    registry.remove_module("test").unwrap();

    assert_eq!(
        xml(&registry, "test"),
        "<module xmlns=\"urn:modreg\">\
            <name>test</name>\
            <has-data/>\
            <removed/>\
        </module>"
    );
    assert_eq!(
        xml(&registry, "ietf-interfaces"),
        "<module xmlns=\"urn:modreg\">\
            <name>ietf-interfaces</name>\
            <revision>2014-05-08</revision>\
            <has-data/>\
            <replay-support/>\
            <removed/>\
        </module>"
    );
    assert_eq!(
        xml(&registry, "iana-if-type"),
        "<module xmlns=\"urn:modreg\">\
            <name>iana-if-type</name>\
            <revision>2014-05-08</revision>\
            <removed/>\
        </module>"
    );
    assert_eq!(
        xml(&registry, "refs"),
        "<module xmlns=\"urn:modreg\">\
            <name>refs</name>\
            <has-data/>\
            <replay-support/>\
            <removed/>\
            <data-deps>\
                <module>test</module>\
                <inst-id>\
                    <xpath xmlns:r=\"urn:refs\">/r:cont/r:def-inst-id</xpath>\
                    <default-module>test</default-module>\
                </inst-id>\
                <inst-id>\
                    <xpath xmlns:r=\"urn:refs\">/r:inst-id</xpath>\
                </inst-id>\
            </data-deps>\
        </module>"
    );
}

#[test]
fn op_deps_scenario() {
    let repo = TempDir::new().unwrap();
    let registry = open(repo.path());

    install(&registry, "ops-ref", true);
    install(&registry, "ops", false);

    registry.remove_module("ops").unwrap();
    registry.remove_module("ops-ref").unwrap();

    assert_eq!(
        xml(&registry, "ops-ref"),
        "<module xmlns=\"urn:modreg\">\
            <name>ops-ref</name>\
            <has-data/>\
            <replay-support/>\
            <removed/>\
        </module>"
    );
    assert_eq!(
        xml(&registry, "ops"),
        "<module xmlns=\"urn:modreg\">\
            <name>ops</name>\
            <has-data/>\
            <removed/>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:rpc1</xpath>\
                <in>\
                    <module>ops-ref</module>\
                    <inst-id>\
                        <xpath xmlns:o=\"urn:ops\">/o:rpc1/o:l2</xpath>\
                        <default-module>ops-ref</default-module>\
                    </inst-id>\
                </in>\
            </op-deps>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:rpc2</xpath>\
                <out>\
                    <module>ops-ref</module>\
                </out>\
            </op-deps>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:rpc3</xpath>\
            </op-deps>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:cont/o:list1/o:cont2/o:act1</xpath>\
                <out>\
                    <module>ops</module>\
                    <inst-id>\
                        <xpath xmlns:o=\"urn:ops\">/o:cont/o:list1/o:cont2/o:act1/o:l8</xpath>\
                        <default-module>ops</default-module>\
                    </inst-id>\
                </out>\
            </op-deps>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:cont/o:list1/o:act2</xpath>\
            </op-deps>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:cont/o:cont3/o:notif2</xpath>\
                <in>\
                    <inst-id>\
                        <xpath xmlns:o=\"urn:ops\">/o:cont/o:cont3/o:notif2/o:l13</xpath>\
                    </inst-id>\
                </in>\
            </op-deps>\
            <op-deps>\
                <xpath xmlns:o=\"urn:ops\">/o:notif3</xpath>\
                <in>\
                    <module>ops-ref</module>\
                    <inst-id>\
                        <xpath xmlns:o=\"urn:ops\">/o:notif3/o:list2/o:l15</xpath>\
                        <default-module>ops</default-module>\
                    </inst-id>\
                </in>\
            </op-deps>\
        </module>"
    );
}

// =============================================================================
// Failure atomicity
// =============================================================================

#[test]
fn failed_installs_leave_file_unchanged() {
    let repo = TempDir::new().unwrap();
    let registry = open(repo.path());
    install(&registry, "test", false);

    let modules = RepoPaths::new(repo.path()).modules_path();
    let before = fs::read(&modules).unwrap();

    let err = registry
        .install_module(&fixture("missing-import"), &[files_dir()], false)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Import(ImportError::UnresolvedImport { ref module, .. })
            if module == "does-not-exist"
    ));

    let err = registry
        .install_module(&fixture("broken"), &[files_dir()], false)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Import(ImportError::ParseFailure { .. })));

    let err = registry
        .install_module(&fixture("test"), &[files_dir()], true)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Store(StoreError::DuplicateModule(ref n)) if n == "test"
    ));

    assert_eq!(fs::read(&modules).unwrap(), before);
    assert_eq!(names(&registry), vec!["test"]);
    assert!(!registry.get_module_record("test").unwrap().replay_support());
}

#[test]
fn remove_twice_fails_and_changes_nothing() {
    let repo = TempDir::new().unwrap();
    let registry = open(repo.path());
    install(&registry, "test", false);
    registry.remove_module("test").unwrap();

    let modules = RepoPaths::new(repo.path()).modules_path();
    let before = fs::read(&modules).unwrap();

    assert!(matches!(
        registry.remove_module("test"),
        Err(RegistryError::Store(StoreError::AlreadyRemoved(_)))
    ));
    assert!(matches!(
        registry.remove_module("nope"),
        Err(RegistryError::Store(StoreError::NotFound(_)))
    ));
    assert_eq!(fs::read(&modules).unwrap(), before);
}

// =============================================================================
// Purge
// =============================================================================

#[test]
fn purge_blocked_by_live_dependent() {
    let repo = TempDir::new().unwrap();
    let registry = open(repo.path());
    install(&registry, "test", false);
    install(&registry, "refs", false);

    registry.remove_module("test").unwrap();
    match registry.purge_module("test") {
        Err(RegistryError::Store(StoreError::StillReferenced { module, dependents })) => {
            assert_eq!(module, "test");
            assert_eq!(dependents, vec!["refs".to_string()]);
        }
        other => panic!("expected StillReferenced, got {other:?}"),
    }

    registry.remove_module("refs").unwrap();
    registry.purge_module("test").unwrap();
    assert_eq!(names(&registry), vec!["refs"]);
}

#[test]
fn purge_removed_keeps_referenced_records() {
    let repo = TempDir::new().unwrap();
    let registry = open(repo.path());
    install(&registry, "ops-ref", false);
    install(&registry, "ops", false);
    install(&registry, "test", false);

    registry.remove_module("ops-ref").unwrap();
    registry.remove_module("test").unwrap();

    let purged = registry.purge_removed().unwrap();
    let purged: Vec<_> = purged.iter().map(|n| n.to_string()).collect();
    assert_eq!(purged, vec!["test"]);
    assert_eq!(names(&registry), vec!["ops-ref", "ops"]);
    assert_eq!(
        registry
            .dependents("ops-ref")
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>(),
        vec!["ops"]
    );
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn reopen_keeps_registration_order() {
    let repo = TempDir::new().unwrap();
    {
        let registry = open(repo.path());
        install(&registry, "test", false);
        install(&registry, "ietf-interfaces", true);
        install(&registry, "iana-if-type", false);
        install(&registry, "refs", false);
        registry.remove_module("iana-if-type").unwrap();
    }

    let reopened = open(repo.path());
    assert_eq!(
        names(&reopened),
        vec!["test", "ietf-interfaces", "iana-if-type", "refs"]
    );
    assert!(reopened.get_module_record("iana-if-type").unwrap().is_removed());
    assert!(reopened.get_module_record("ietf-interfaces").unwrap().replay_support());
    assert_eq!(
        reopened.render_module("refs").unwrap(),
        open(repo.path()).render_module("refs").unwrap()
    );
}

#[test]
fn stale_handle_cannot_overwrite_newer_state() {
    let repo = TempDir::new().unwrap();
    let first = open(repo.path());
    let second = open(repo.path());

    install(&first, "test", false);
    let err = second
        .install_module(&fixture("ops-ref"), &[files_dir()], false)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Storage(_)));
    assert!(second.list_modules().is_empty());

    let fresh = open(repo.path());
    assert_eq!(names(&fresh), vec!["test"]);
}
