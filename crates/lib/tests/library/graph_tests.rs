//! Ordering constraints of an evaluated host description.

use hostcmd_lib::command::Change;
use hostcmd_lib::config::HostConfig;
use hostcmd_lib::graph::{ExecutionDag, GraphError, Manifest};

const WEB: &str = r#"
targets:
  - name: web
    os: linux
    readiness: cloud-init
    connection:
      host: 10.0.0.5
      user: ubuntu
    packages:
      - name: curl
      - name: jq
    directories:
      - path: /etc/app
        elevate: true
    files:
      - path: /etc/app/app.conf
        content: "port: 8080\n"
        elevate: true
        depends_on: ["dir:/etc/app"]
    services:
      - name: app
        triggered_by: ["file:/etc/app/app.conf"]
  - name: cache
    os: linux
    packages:
      - name: redis
"#;

fn evaluate(text: &str) -> Manifest {
  HostConfig::parse(text).unwrap().evaluate().unwrap().manifest
}

fn position(order: &[String], name: &str) -> usize {
  order.iter().position(|n| n == name).unwrap()
}

fn install_name(manifest: &Manifest, prefix: &str) -> String {
  manifest
    .commands
    .keys()
    .find(|k| k.starts_with(prefix))
    .cloned()
    .unwrap()
}

#[test]
fn readiness_probe_is_the_first_wave() {
  let manifest = evaluate(WEB);
  let dag = ExecutionDag::from_manifest(&manifest).unwrap();
  let waves = dag.waves().unwrap();
  assert!(waves[0].contains(&"web-wait-ready".to_string()));
  for (name, command) in &manifest.commands {
    if name.starts_with("web-") && name != "web-wait-ready" {
      assert!(command.depends_on.contains(&"web-wait-ready".to_string()), "{} is not gated", name);
    }
  }
}

#[test]
fn package_installs_run_one_after_another() {
  let manifest = evaluate(WEB);
  let dag = ExecutionDag::from_manifest(&manifest).unwrap();
  let order = dag.topological_order().unwrap();

  let curl = install_name(&manifest, "web-install-curl-");
  let jq = install_name(&manifest, "web-install-jq-");
  assert!(position(&order, "web-refresh-index") < position(&order, &curl));
  assert!(position(&order, &curl) < position(&order, &jq));
  assert_eq!(dag.dependencies(&jq), vec![curl.clone(), "web-refresh-index".to_string(), "web-wait-ready".to_string()]);
}

#[test]
fn targets_do_not_share_a_package_chain() {
  let manifest = evaluate(WEB);
  let dag = ExecutionDag::from_manifest(&manifest).unwrap();
  let redis = install_name(&manifest, "cache-install-redis-");
  assert!(dag.dependencies(&redis).iter().all(|d| d.starts_with("cache-")));
}

#[test]
fn destroy_order_tears_down_dependents_first() {
  let manifest = evaluate(WEB);
  let order = ExecutionDag::from_manifest(&manifest).unwrap().destroy_order().unwrap();
  assert!(position(&order, "web-restart-app") < position(&order, "web-write-/etc/app/app.conf"));
  assert!(position(&order, "web-write-/etc/app/app.conf") < position(&order, "web-mkdir-/etc/app"));
  assert!(position(&order, "web-mkdir-/etc/app") < position(&order, "web-wait-ready"));
}

#[test]
fn manifest_round_trips_through_disk() {
  let manifest = evaluate(WEB);
  let temp = tempfile::TempDir::new().unwrap();
  let path = temp.path().join("plans").join("manifest.json");
  manifest.save(&path).unwrap();

  let loaded = Manifest::load(&path).unwrap();
  assert_eq!(loaded, manifest);
  for (name, command) in &manifest.commands {
    assert_eq!(command.change_against(&loaded.commands[name]).unwrap(), Change::None);
  }
}

#[test]
fn config_edit_only_touches_what_changed() {
  let before = evaluate(WEB);
  let after = evaluate(&WEB.replace("port: 8080", "port: 9090"));

  let changed: Vec<&String> = after
    .commands
    .iter()
    .filter(|(name, cmd)| cmd.change_against(&before.commands[*name]).unwrap() != Change::None)
    .map(|(name, _)| name)
    .collect();
  assert_eq!(changed, vec!["web-restart-app", "web-write-/etc/app/app.conf"]);
}

#[test]
fn tampered_manifest_is_rejected() {
  let mut manifest = evaluate(WEB);
  let write = manifest.commands.get_mut("web-write-/etc/app/app.conf").unwrap();
  write.depends_on.push("web-restart-app".to_string());
  assert!(matches!(
    ExecutionDag::from_manifest(&manifest),
    Err(GraphError::CycleDetected)
  ));
}
