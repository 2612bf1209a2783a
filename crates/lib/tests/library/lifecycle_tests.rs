//! Resource lifecycles executed through the local transport.

use std::fs;

use tempfile::TempDir;
use tracing_test::traced_test;

use hostcmd_lib::command::{CommandArgs, ResourceOptions};
use hostcmd_lib::runner::Phase;
use hostcmd_lib::transport::{TransportConfig, TransportError};

use super::common::{local_runner, resource};

fn config() -> TransportConfig {
  TransportConfig::default()
}

mod directories {
  use super::*;

  #[tokio::test]
  async fn create_is_idempotent_and_delete_only_removes_empty() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("app");
    let (manifest, runner) = local_runner();

    let handle = runner
      .create_directory(&dir.to_string_lossy(), false, ResourceOptions::default())
      .unwrap();
    let res = resource(&manifest, &handle);

    runner.execute(&res, Phase::Create, &config()).await.unwrap();
    runner.execute(&res, Phase::Create, &config()).await.unwrap();
    assert!(dir.is_dir());

    fs::write(dir.join("keep"), "x").unwrap();
    runner.execute(&res, Phase::Delete, &config()).await.unwrap();
    assert!(dir.join("keep").exists());

    fs::remove_file(dir.join("keep")).unwrap();
    runner.execute(&res, Phase::Delete, &config()).await.unwrap();
    assert!(!dir.exists());
  }
}

mod files {
  use super::*;

  #[tokio::test]
  async fn write_then_delete_without_prior_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("app.conf");
    let (manifest, runner) = local_runner();

    let handle = runner
      .write_file(&path.to_string_lossy(), "a: 1\n", false, ResourceOptions::default())
      .unwrap();
    let res = resource(&manifest, &handle);

    runner.execute(&res, Phase::Create, &config()).await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");
    assert!(!temp.path().join("app.conf.backup").exists());

    runner.execute(&res, Phase::Delete, &config()).await.unwrap();
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn write_then_delete_restores_prior_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("app.conf");
    fs::write(&path, "original").unwrap();
    let (manifest, runner) = local_runner();

    let handle = runner
      .write_file(&path.to_string_lossy(), "managed", false, ResourceOptions::default())
      .unwrap();
    let res = resource(&manifest, &handle);

    runner.execute(&res, Phase::Create, &config()).await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "managed");
    assert_eq!(
      fs::read_to_string(temp.path().join("app.conf.backup")).unwrap(),
      "original"
    );

    runner.execute(&res, Phase::Delete, &config()).await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    assert!(!temp.path().join("app.conf.backup").exists());
  }

  #[tokio::test]
  async fn rerun_create_and_update_then_delete_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("conf.yaml");
    let (manifest, runner) = local_runner();

    let handle = runner
      .write_file(&path.to_string_lossy(), "v1", false, ResourceOptions::default())
      .unwrap();
    let res = resource(&manifest, &handle);

    runner.execute(&res, Phase::Create, &config()).await.unwrap();
    runner.execute(&res, Phase::Create, &config()).await.unwrap();
    runner.execute(&res, Phase::Update, &config()).await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "v1");

    runner.execute(&res, Phase::Delete, &config()).await.unwrap();
    assert!(!path.exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn file_inside_managed_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("etc");
    let path = dir.join("app.conf");
    let (manifest, runner) = local_runner();

    let mkdir = runner
      .create_directory(&dir.to_string_lossy(), false, ResourceOptions::default())
      .unwrap();
    let write = runner
      .write_file(
        &path.to_string_lossy(),
        "x",
        false,
        ResourceOptions::depends_on([mkdir.clone()]),
      )
      .unwrap();

    let (mkdir, write) = (resource(&manifest, &mkdir), resource(&manifest, &write));
    runner.execute(&mkdir, Phase::Create, &config()).await.unwrap();
    runner.execute(&write, Phase::Create, &config()).await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "x");

    // Tear down in reverse: file first, then the now-empty directory.
    runner.execute(&write, Phase::Delete, &config()).await.unwrap();
    runner.execute(&mkdir, Phase::Delete, &config()).await.unwrap();
    assert!(!dir.exists());
  }
}

mod commands {
  use super::*;

  #[tokio::test]
  async fn environment_reaches_the_command() {
    let (manifest, runner) = local_runner();
    let handle = runner
      .command(
        "greet",
        CommandArgs::create("echo \"$GREETING\"").with_env("GREETING", "hello world"),
        ResourceOptions::default(),
      )
      .unwrap();

    let output = runner
      .execute(&resource(&manifest, &handle), Phase::Create, &config())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(output.stdout, "hello world");
  }

  #[tokio::test]
  async fn update_falls_back_to_create() {
    let (manifest, runner) = local_runner();
    let plain = runner
      .command("plain", CommandArgs::create("echo create"), ResourceOptions::default())
      .unwrap();
    let with_update = runner
      .command(
        "updatable",
        CommandArgs::create("echo create").with_update("echo update"),
        ResourceOptions::default(),
      )
      .unwrap();

    let out = runner
      .execute(&resource(&manifest, &plain), Phase::Update, &config())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(out.stdout, "create");

    let out = runner
      .execute(&resource(&manifest, &with_update), Phase::Update, &config())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(out.stdout, "update");
  }

  #[tokio::test]
  async fn missing_delete_is_a_no_op() {
    let (manifest, runner) = local_runner();
    let handle = runner
      .command("once", CommandArgs::create("true"), ResourceOptions::default())
      .unwrap();
    let result = runner
      .execute(&resource(&manifest, &handle), Phase::Delete, &config())
      .await
      .unwrap();
    assert!(result.is_none());
  }

  #[tokio::test]
  async fn failure_is_returned_unchanged() {
    let (manifest, runner) = local_runner();
    let handle = runner
      .command(
        "broken",
        CommandArgs::create("echo nope >&2; exit 7"),
        ResourceOptions::default(),
      )
      .unwrap();

    let err = runner
      .execute(&resource(&manifest, &handle), Phase::Create, &config())
      .await
      .unwrap_err();
    match err {
      TransportError::CommandFailed { code, stderr, .. } => {
        assert_eq!(code, Some(7));
        assert_eq!(stderr, "nope");
      }
      other => panic!("expected CommandFailed, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn failure_before_reading_stdin_keeps_output() {
    let (manifest, runner) = local_runner();
    let handle = runner
      .command(
        "early-exit",
        CommandArgs::create("echo denied >&2; exit 5").with_stdin("x".repeat(4 * 1024 * 1024)),
        ResourceOptions::default(),
      )
      .unwrap();

    let err = runner
      .execute(&resource(&manifest, &handle), Phase::Create, &config())
      .await
      .unwrap_err();
    assert!(
      matches!(&err, TransportError::CommandFailed { code: Some(5), stderr, .. } if stderr == "denied"),
      "got {:?}",
      err
    );
  }

  #[tokio::test]
  #[traced_test]
  async fn registration_and_execution_are_logged() {
    let (manifest, runner) = local_runner();
    let handle = runner
      .command("logged", CommandArgs::create("true"), ResourceOptions::default())
      .unwrap();
    runner
      .execute(&resource(&manifest, &handle), Phase::Create, &config())
      .await
      .unwrap();

    assert!(logs_contain("registered command"));
    assert!(logs_contain("local-logged"));
    assert!(logs_contain("executing"));
  }
}
