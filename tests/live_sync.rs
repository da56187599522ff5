// tests/live_sync.rs
//
// End-to-end runs against the real filesystem and the `notify` backend.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deploysync::engine::{Collaborators, Engine, EngineSettings};
use deploysync::exec::Materializer;
use deploysync::fs::{FileSystem, RealFileSystem};
use deploysync::project::PomModelProvider;
use deploysync::types::MaterializeMode;
use deploysync_test_utils::builders::PomBuilder;
use deploysync_test_utils::eventually;
use deploysync_test_utils::fake_materializer::FakeMaterializer;

type TestResult = Result<(), Box<dyn Error>>;

struct Workspace {
    _tmp: tempfile::TempDir,
    app: PathBuf,
    lib: PathBuf,
    deployment: PathBuf,
    settings: EngineSettings,
}

fn workspace() -> Result<Workspace, Box<dyn Error>> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().canonicalize()?;
    let ws = root.join("ws");
    let app = ws.join("app");
    let lib = ws.join("lib");

    fs::create_dir_all(app.join("src/main/webapp"))?;
    fs::create_dir_all(app.join("target/classes/com/x"))?;
    fs::create_dir_all(lib.join("target/classes"))?;
    fs::write(
        ws.join("pom.xml"),
        PomBuilder::new("com.acme", "parent").module("app").module("lib").build(),
    )?;
    fs::write(
        app.join("pom.xml"),
        PomBuilder::new("com.acme", "app").dependency("com.acme", "lib").build(),
    )?;
    fs::write(lib.join("pom.xml"), PomBuilder::new("com.acme", "lib").build())?;

    let deployment = root.join("webapps/app");
    fs::create_dir_all(&deployment)?;

    let settings = EngineSettings {
        source_root: app.clone(),
        deployments_root: root.join("webapps"),
        default_root: "ROOT".into(),
        marker_dir: root.join("markers"),
        materialize_mode: MaterializeMode::Blocking,
        debounce: Duration::from_millis(50),
        ignore: vec!["**/*.tmp".to_string()],
    };

    Ok(Workspace {
        _tmp: tmp,
        app,
        lib,
        deployment,
        settings,
    })
}

fn collaborators(materializer: Option<FakeMaterializer>) -> Collaborators {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    Collaborators {
        fs: fs.clone(),
        provider: Arc::new(PomModelProvider::new(fs)),
        materializer: materializer.map(|m| Arc::new(m) as Arc<dyn Materializer>),
    }
}

fn read(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).ok()
}

#[tokio::test]
async fn webapp_and_class_changes_are_mirrored() -> TestResult {
    init_tracing();
    let ws = workspace()?;
    let mut engine = Engine::start(ws.settings.clone(), collaborators(None)).await?;

    fs::write(ws.app.join("src/main/webapp/index.html"), "<html/>")?;
    let deployed = ws.deployment.join("index.html");
    assert!(eventually(|| read(&deployed).as_deref() == Some(b"<html/>".as_slice())).await);

    fs::write(ws.app.join("target/classes/com/x/Y.class"), "v1")?;
    let class = ws.deployment.join("WEB-INF/classes/com/x/Y.class");
    assert!(eventually(|| read(&class).as_deref() == Some(b"v1".as_slice())).await);

    fs::write(ws.app.join("target/classes/com/x/Y.class"), "v2")?;
    assert!(eventually(|| read(&class).as_deref() == Some(b"v2".as_slice())).await);

    fs::remove_file(ws.app.join("target/classes/com/x/Y.class"))?;
    assert!(eventually(|| !class.exists()).await);

    engine.stop();
    Ok(())
}

#[tokio::test]
async fn new_directories_are_watched() -> TestResult {
    init_tracing();
    let ws = workspace()?;
    let mut engine = Engine::start(ws.settings.clone(), collaborators(None)).await?;

    let assets = ws.app.join("src/main/webapp/assets");
    fs::create_dir(&assets)?;
    assert!(eventually(|| ws.deployment.join("assets").is_dir()).await);

    // Give the worker a moment to register the new directory.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(assets.join("logo.png"), [1u8, 2, 3])?;
    let logo = ws.deployment.join("assets/logo.png");
    assert!(eventually(|| read(&logo).as_deref() == Some([1u8, 2, 3].as_slice())).await);

    engine.stop();
    Ok(())
}

#[tokio::test]
async fn ignored_files_are_not_deployed() -> TestResult {
    init_tracing();
    let ws = workspace()?;
    let mut engine = Engine::start(ws.settings.clone(), collaborators(None)).await?;

    fs::write(ws.app.join("src/main/webapp/draft.tmp"), "scratch")?;
    fs::write(ws.app.join("src/main/webapp/page.html"), "page")?;

    assert!(eventually(|| ws.deployment.join("page.html").exists()).await);
    assert!(!ws.deployment.join("draft.tmp").exists());

    engine.stop();
    Ok(())
}

#[tokio::test]
async fn dependency_project_edits_invalidate_the_marker() -> TestResult {
    init_tracing();
    let ws = workspace()?;
    let materializer = FakeMaterializer::new();
    let mut engine = Engine::start(ws.settings.clone(), collaborators(Some(materializer.clone()))).await?;

    assert_eq!(materializer.calls(), 1);
    assert!(!engine.scheduler().is_due());

    fs::write(ws.lib.join("target/classes/L.class"), "l")?;
    assert!(eventually(|| engine.scheduler().is_due()).await);
    assert!(!engine.scheduler().marker().path().exists());

    engine.stop();
    Ok(())
}

#[tokio::test]
async fn changes_after_stop_are_ignored() -> TestResult {
    init_tracing();
    let ws = workspace()?;
    let mut engine = Engine::start(ws.settings.clone(), collaborators(None)).await?;
    engine.stop();

    fs::write(ws.app.join("src/main/webapp/late.html"), "late")?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!ws.deployment.join("late.html").exists());
    Ok(())
}
