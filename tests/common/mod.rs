#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use deploysync::deps::{DependencyCopyScheduler, MarkerStore};
use deploysync::engine::{DispatchEffect, DispatchTarget, Dispatcher};
use deploysync::fs::mock::MockFileSystem;
use deploysync::fs::FileSystem;
use deploysync::project::ManagedProject;
use deploysync::watch::{
    register_tree, ChangeEvent, ChangeKind, IgnoreSet, RegistrationMode, RegistrationRequest,
    WatchBatch, WatchHandle, WatchOwner, WatchRegistry,
};
use deploysync_test_utils::fake_backend::FakeBackend;

pub use deploysync_test_utils::init_tracing;

pub const APP_ROOT: &str = "/ws/app";
pub const LIB_ROOT: &str = "/ws/lib";
pub const DEPLOYMENT_ROOT: &str = "/srv/webapps/app";
pub const DESCRIPTOR: &str = "/ws/app/pom.xml";

/// A dispatcher over a mock workspace:
///
/// - `/ws/app`: primary project (webapp resources + compiled classes)
/// - `/ws/lib`: dependency project
/// - `/srv/webapps/app`: deployment
pub struct Fixture {
    pub fs: MockFileSystem,
    pub backend: FakeBackend,
    pub dispatcher: Dispatcher,
    pub scheduler: Arc<DependencyCopyScheduler>,
    pub interrupted: AtomicBool,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(IgnoreSet::empty(), None)
    }

    pub fn with_ignore(patterns: &[&str]) -> Self {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        Self::build(IgnoreSet::new(&owned).unwrap(), None)
    }

    pub fn build(
        ignore: IgnoreSet,
        materialize_tx: Option<tokio::sync::mpsc::UnboundedSender<deploysync::exec::MaterializeTrigger>>,
    ) -> Self {
        init_tracing();

        let fs = MockFileSystem::new();
        fs.add_file(DESCRIPTOR, "<project/>");
        fs.set_modified(DESCRIPTOR, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        fs.add_dir("/ws/app/src/main/webapp/css");
        fs.add_dir("/ws/app/target/classes/com/x");
        fs.add_file("/ws/lib/pom.xml", "<project/>");
        fs.add_dir("/ws/lib/target/classes/lib");
        fs.add_dir(DEPLOYMENT_ROOT);

        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
        let project = ManagedProject {
            deployment_name: "app".into(),
            source_root: PathBuf::from(APP_ROOT),
            deployment_root: PathBuf::from(DEPLOYMENT_ROOT),
        };
        let scheduler = Arc::new(DependencyCopyScheduler::new(
            project.clone(),
            PathBuf::from(DESCRIPTOR),
            MarkerStore::new(Path::new("/state"), "app", shared.clone()),
            shared.clone(),
        ));

        let mut backend = FakeBackend::new();
        let mut registry = WatchRegistry::new();
        for (root, dependency) in [(APP_ROOT, false), (LIB_ROOT, true)] {
            register_tree(
                &fs,
                &mut backend,
                &mut registry,
                &RegistrationRequest {
                    root: PathBuf::from(root),
                    owner: WatchOwner {
                        source_root: PathBuf::from(root),
                        deployment: "app".into(),
                        is_dependency_project: dependency,
                        descriptor: None,
                    },
                },
                RegistrationMode::Initial,
            )
            .unwrap();
        }

        let dispatcher = Dispatcher::new(
            registry,
            shared,
            DispatchTarget {
                project,
                descriptor_path: PathBuf::from(DESCRIPTOR),
                scheduler: Arc::clone(&scheduler),
                ignore,
                materialize_tx,
            },
        );

        Self {
            fs,
            backend,
            dispatcher,
            scheduler,
            interrupted: AtomicBool::new(false),
        }
    }

    /// Dispatch one batch of events for the directory `dir`.
    pub fn dispatch(&mut self, dir: &str, events: &[(ChangeKind, &str)]) -> Vec<DispatchEffect> {
        let batch = WatchBatch {
            handle: WatchHandle::for_dir(dir),
            events: events
                .iter()
                .map(|(kind, name)| ChangeEvent::new(*kind, *name))
                .collect(),
        };
        self.dispatcher
            .handle_batch(&mut self.backend, batch, &self.interrupted)
    }

    pub fn deployed(&self, rel: &str) -> Option<Vec<u8>> {
        self.fs.contents(Path::new(DEPLOYMENT_ROOT).join(rel))
    }
}

pub fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}
