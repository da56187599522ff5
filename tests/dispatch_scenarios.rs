// tests/dispatch_scenarios.rs

mod common;
use crate::common::{at, Fixture, DEPLOYMENT_ROOT, DESCRIPTOR};

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use deploysync::engine::{DispatchEffect, DispatchTarget, SkipReason};
use deploysync::exec::MaterializeTrigger;
use deploysync::fs::FileSystem;
use deploysync::watch::{ChangeKind, IgnoreSet};

use ChangeKind::{Created, Deleted, Modified};

const WEBAPP: &str = "/ws/app/src/main/webapp";
const CLASSES_X: &str = "/ws/app/target/classes/com/x";

fn skipped(path: &str, reason: SkipReason) -> DispatchEffect {
    DispatchEffect::Skipped {
        path: PathBuf::from(path),
        reason,
    }
}

#[test]
fn new_webapp_file_is_copied_to_deployment_root() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/ws/app/src/main/webapp/index.html", "<html/>");

    let effects = fx.dispatch(WEBAPP, &[(Created, "index.html")]);

    assert_eq!(
        effects,
        vec![DispatchEffect::Copied {
            from: PathBuf::from("/ws/app/src/main/webapp/index.html"),
            to: PathBuf::from("/srv/webapps/app/index.html"),
        }]
    );
    assert_eq!(fx.deployed("index.html").unwrap(), b"<html/>");
}

#[test]
fn modified_class_file_overwrites_deployed_copy() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/srv/webapps/app/WEB-INF/classes/com/x/Y.class", "old");
    fx.fs.add_file("/ws/app/target/classes/com/x/Y.class", "new");

    fx.dispatch(CLASSES_X, &[(Modified, "Y.class")]);

    assert_eq!(fx.deployed("WEB-INF/classes/com/x/Y.class").unwrap(), b"new");
}

#[test]
fn deleted_class_file_is_removed_and_second_delete_is_harmless() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/srv/webapps/app/WEB-INF/classes/com/x/Y.class", "bytes");

    let effects = fx.dispatch(CLASSES_X, &[(Deleted, "Y.class")]);
    assert_eq!(
        effects,
        vec![DispatchEffect::Removed(PathBuf::from(
            "/srv/webapps/app/WEB-INF/classes/com/x/Y.class"
        ))]
    );
    assert!(fx.deployed("WEB-INF/classes/com/x/Y.class").is_none());

    let effects = fx.dispatch(CLASSES_X, &[(Deleted, "Y.class")]);
    assert_eq!(
        effects,
        vec![skipped(
            "/srv/webapps/app/WEB-INF/classes/com/x/Y.class",
            SkipReason::NotDeployed
        )]
    );
}

#[test]
fn new_directory_is_created_registered_and_then_synced() {
    let mut fx = Fixture::new();
    fx.fs.add_dir("/ws/app/src/main/webapp/assets");

    let effects = fx.dispatch(WEBAPP, &[(Created, "assets")]);

    assert!(effects.contains(&DispatchEffect::CreatedDir(PathBuf::from(
        "/srv/webapps/app/assets"
    ))));
    assert!(effects.contains(&DispatchEffect::Registered(PathBuf::from(
        "/ws/app/src/main/webapp/assets"
    ))));
    assert!(fx.fs.is_dir(Path::new("/srv/webapps/app/assets")));
    assert!(fx.backend.is_registered("/ws/app/src/main/webapp/assets"));

    fx.fs.add_file("/ws/app/src/main/webapp/assets/logo.png", [1u8, 2, 3]);
    fx.dispatch("/ws/app/src/main/webapp/assets", &[(Created, "logo.png")]);

    assert_eq!(fx.deployed("assets/logo.png").unwrap(), vec![1u8, 2, 3]);
}

#[test]
fn files_already_inside_a_new_directory_are_mirrored() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/ws/app/src/main/webapp/js/app.js", "js");
    fx.fs.add_file("/ws/app/src/main/webapp/js/vendor/lib.js", "lib");

    let effects = fx.dispatch(WEBAPP, &[(Created, "js")]);

    assert!(effects.contains(&DispatchEffect::Registered(PathBuf::from(
        "/ws/app/src/main/webapp/js/vendor"
    ))));
    assert_eq!(fx.deployed("js/app.js").unwrap(), b"js");
    assert_eq!(fx.deployed("js/vendor/lib.js").unwrap(), b"lib");
}

#[test]
fn recreated_target_directory_is_watched_even_though_unmapped() {
    let mut fx = Fixture::new();
    fx.fs.add_dir("/ws/app/build");

    let effects = fx.dispatch("/ws/app", &[(Created, "build")]);

    assert!(effects.contains(&skipped("/ws/app/build", SkipReason::Unmapped)));
    assert!(fx.backend.is_registered("/ws/app/build"));
    assert!(fx.dispatcher.registry().contains_dir(Path::new("/ws/app/build")));
}

#[test]
fn modified_directories_and_vanished_paths_are_filtered() {
    let mut fx = Fixture::new();

    let effects = fx.dispatch(
        WEBAPP,
        &[(Modified, "css"), (Modified, "gone.html"), (Created, "gone.html")],
    );

    assert_eq!(
        effects,
        vec![
            skipped("/ws/app/src/main/webapp/css", SkipReason::ModifiedDirectory),
            skipped("/ws/app/src/main/webapp/gone.html", SkipReason::Vanished),
            skipped("/ws/app/src/main/webapp/gone.html", SkipReason::Vanished),
        ]
    );
    assert!(fx.deployed("gone.html").is_none());
}

#[test]
fn events_apply_in_arrival_order() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/srv/webapps/app/page.html", "stale");

    // Created then deleted before the batch was handled: the file is gone,
    // so only the deletion has an effect.
    let effects = fx.dispatch(WEBAPP, &[(Created, "page.html"), (Deleted, "page.html")]);

    assert_eq!(
        effects,
        vec![
            skipped("/ws/app/src/main/webapp/page.html", SkipReason::Vanished),
            DispatchEffect::Removed(PathBuf::from("/srv/webapps/app/page.html")),
        ]
    );
    assert!(fx.deployed("page.html").is_none());
}

#[test]
fn deleting_a_watched_directory_evicts_its_subtree() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/srv/webapps/app/WEB-INF/classes/com/x/Y.class", "y");
    fx.fs.remove(Path::new("/ws/app/target/classes/com")).unwrap();

    let effects = fx.dispatch("/ws/app/target/classes", &[(Deleted, "com")]);

    assert!(effects.contains(&DispatchEffect::Evicted(PathBuf::from(
        "/ws/app/target/classes/com"
    ))));
    assert!(effects.contains(&DispatchEffect::Evicted(PathBuf::from(CLASSES_X))));
    assert!(effects.contains(&DispatchEffect::Removed(PathBuf::from(
        "/srv/webapps/app/WEB-INF/classes/com"
    ))));
    assert!(!fx.dispatcher.registry().contains_dir(Path::new(CLASSES_X)));
    assert!(fx.backend.unregistered().contains(&PathBuf::from(CLASSES_X)));
    assert!(fx.deployed("WEB-INF/classes/com/x/Y.class").is_none());
}

#[test]
fn batch_for_a_vanished_directory_drops_its_registration() {
    let mut fx = Fixture::new();
    fx.fs.remove(Path::new(CLASSES_X)).unwrap();

    let effects = fx.dispatch(CLASSES_X, &[(Deleted, "Y.class")]);

    assert!(effects.contains(&DispatchEffect::Evicted(PathBuf::from(CLASSES_X))));
    assert!(!fx.dispatcher.registry().contains_dir(Path::new(CLASSES_X)));
}

#[test]
fn unknown_handle_is_skipped() {
    let mut fx = Fixture::new();

    let effects = fx.dispatch("/elsewhere", &[(Created, "a.txt")]);

    assert_eq!(effects, vec![skipped("/elsewhere/a.txt", SkipReason::UnknownHandle)]);
}

#[test]
fn ignored_paths_have_no_deployment_effect() {
    let mut fx = Fixture::with_ignore(&["**/*.swp"]);
    fx.fs.add_file("/ws/app/src/main/webapp/.index.html.swp", "swap");
    fx.fs.add_file("/ws/app/src/main/webapp/index.html", "page");

    let effects = fx.dispatch(
        WEBAPP,
        &[(Created, ".index.html.swp"), (Created, "index.html")],
    );

    assert_eq!(
        effects[0],
        skipped(
            "/ws/app/src/main/webapp/.index.html.swp",
            SkipReason::Ignored
        )
    );
    assert!(fx.deployed(".index.html.swp").is_none());
    assert_eq!(fx.deployed("index.html").unwrap(), b"page");
}

#[test]
fn copy_failure_is_reported_and_batch_continues() {
    let mut fx = Fixture::new();
    // A file where the deployed directory should be.
    fx.fs.add_file("/srv/webapps/app/css", "not a dir");
    fx.fs.add_file("/ws/app/src/main/webapp/css/site.css", "body{}");
    fx.fs.add_file("/ws/app/src/main/webapp/index.html", "page");

    let effects = fx.dispatch("/ws/app/src/main/webapp/css", &[(Created, "site.css")]);
    assert!(matches!(
        &effects[..],
        [DispatchEffect::Failed { path, .. }] if path == Path::new("/ws/app/src/main/webapp/css/site.css")
    ));

    fx.dispatch(WEBAPP, &[(Created, "index.html")]);
    assert_eq!(fx.deployed("index.html").unwrap(), b"page");
}

#[test]
fn dependency_project_change_marks_materialization_due() {
    let mut fx = Fixture::new();
    fx.scheduler.marker().store(at(2_000)).unwrap();
    assert!(!fx.scheduler.is_due());

    fx.fs.add_file("/ws/lib/target/classes/lib/L.class", "l");
    let effects = fx.dispatch("/ws/lib/target/classes/lib", &[(Created, "L.class")]);

    assert!(effects.contains(&DispatchEffect::MarkedDue));
    assert!(fx.scheduler.is_due());
    // Dependency classes map into the primary deployment.
    assert_eq!(fx.deployed("WEB-INF/classes/lib/L.class").unwrap(), b"l");
}

#[test]
fn new_dependency_directory_marks_due_once_for_its_created_event() {
    let mut fx = Fixture::new();
    fx.scheduler.marker().store(at(2_000)).unwrap();
    fx.fs.add_file("/ws/lib/target/classes/lib/util/A.class", "a");
    fx.fs.add_file("/ws/lib/target/classes/lib/util/B.class", "b");

    let effects = fx.dispatch("/ws/lib/target/classes/lib", &[(Created, "util")]);

    let marks = effects.iter().filter(|e| **e == DispatchEffect::MarkedDue).count();
    assert_eq!(marks, 1);
    assert!(fx.scheduler.is_due());
    assert_eq!(fx.deployed("WEB-INF/classes/lib/util/A.class").unwrap(), b"a");
    assert_eq!(fx.deployed("WEB-INF/classes/lib/util/B.class").unwrap(), b"b");
}

#[test]
fn primary_project_change_leaves_marker_alone() {
    let mut fx = Fixture::new();
    fx.scheduler.marker().store(at(2_000)).unwrap();
    fx.fs.add_file("/ws/app/src/main/webapp/index.html", "page");

    let effects = fx.dispatch(WEBAPP, &[(Created, "index.html")]);

    assert!(!effects.contains(&DispatchEffect::MarkedDue));
    assert!(!fx.scheduler.is_due());
}

#[test]
fn descriptor_change_requests_materialization() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut fx = Fixture::build(IgnoreSet::empty(), Some(tx));

    let effects = fx.dispatch("/ws/app", &[(Modified, "pom.xml")]);

    assert_eq!(
        effects,
        vec![
            skipped(DESCRIPTOR, SkipReason::Unmapped),
            DispatchEffect::DescriptorChanged,
        ]
    );
    assert!(matches!(rx.try_recv(), Ok(MaterializeTrigger::DescriptorChanged)));

    fx.dispatch("/ws/app", &[(Deleted, "pom.xml")]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn interrupted_dispatcher_drops_remaining_events() {
    let mut fx = Fixture::new();
    fx.fs.add_file("/ws/app/src/main/webapp/index.html", "page");
    fx.interrupted.store(true, Ordering::SeqCst);

    let effects = fx.dispatch(WEBAPP, &[(Created, "index.html")]);

    assert!(effects.is_empty());
    assert!(fx.deployed("index.html").is_none());
}

#[test]
fn dispatch_target_is_exposed_for_inspection() {
    let fx = Fixture::new();
    let DispatchTarget { project, .. } = fx.dispatcher.target();
    assert_eq!(project.deployment_root, Path::new(DEPLOYMENT_ROOT));
}
