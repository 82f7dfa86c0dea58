//! Multi-process behaviour, exercised through the real `corral` binary.

use corral::exit_codes;
use corral::locks::{FileLock, LockOptions, LockTimeout, clean_stale_locks, locks_dir_for};
use corral::state::{Connection, ConnectionRegistry};
use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn corral(state_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_corral"));
    cmd.arg("--state-dir").arg(state_dir);
    cmd.env_remove("CORRAL_STATE_DIR");
    cmd
}

fn spawn_add(state_dir: &Path, name: &str) -> Child {
    corral(state_dir)
        .args(["connection", "add", name, "--root", "/srv/work"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "corral failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn concurrent_adds_from_two_processes_are_both_kept() {
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");
    let registry_path = state_dir.join("connections.json");

    let mut a = spawn_add(&state_dir, "alpha");
    let mut b = spawn_add(&state_dir, "beta");

    // A third process reads under the shared lock for as long as the writers run.
    loop {
        let writers_done = a.try_wait().unwrap().is_some() && b.try_wait().unwrap().is_some();
        let list = corral(&state_dir)
            .args(["connection", "list"])
            .output()
            .unwrap();
        assert_success(&list);
        if writers_done {
            break;
        }
    }

    assert_success(&a.wait_with_output().unwrap());
    assert_success(&b.wait_with_output().unwrap());

    let final_list = corral(&state_dir)
        .args(["connection", "list"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&final_list.stdout);
    assert!(stdout.contains("alpha") && stdout.contains("beta"), "{}", stdout);

    let registry =
        ConnectionRegistry::open(&registry_path, LockOptions::default(), Default::default())
            .unwrap();
    let names: Vec<String> = registry.list().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
}

#[cfg(unix)]
#[test]
fn exclusive_sections_never_overlap_across_processes() {
    const WORKERS: usize = 4;
    const ROUNDS: usize = 5;
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");
    let resource = dir.path().join("counter.json");
    let journal = dir.path().join("journal.log");

    // Each round is a fresh process that takes the write lock, records its
    // entry, lingers, and records its exit.
    let script = r#"echo "enter $$" >> "$JOURNAL"; sleep 0.02; echo "exit $$" >> "$JOURNAL""#;

    let workers: Vec<_> = (0..WORKERS)
        .map(|_| {
            let state_dir = state_dir.clone();
            let resource = resource.clone();
            let journal = journal.clone();
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let output = corral(&state_dir)
                        .arg("lock")
                        .arg("run")
                        .arg(&resource)
                        .args(["--", "sh", "-c", script])
                        .env("JOURNAL", &journal)
                        .output()
                        .unwrap();
                    assert_success(&output);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let journal = std::fs::read_to_string(&journal).unwrap();
    let mut holders = 0usize;
    let mut max_holders = 0usize;
    let mut current = None;
    for line in journal.lines() {
        let (event, pid) = line.split_once(' ').unwrap();
        match event {
            "enter" => {
                holders += 1;
                current = Some(pid);
            }
            "exit" => {
                assert_eq!(current, Some(pid), "exit from a process that did not enter last");
                holders -= 1;
            }
            other => panic!("unexpected journal line: {}", other),
        }
        max_holders = max_holders.max(holders);
    }
    assert_eq!(holders, 0);
    assert_eq!(max_holders, 1);
    assert_eq!(journal.lines().count(), 2 * WORKERS * ROUNDS);
}

#[test]
fn many_processes_lose_no_updates() {
    const K: usize = 8;
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");

    let children: Vec<Child> = (0..K)
        .map(|i| spawn_add(&state_dir, &format!("conn-{}", i)))
        .collect();
    for child in children {
        assert_success(&child.wait_with_output().unwrap());
    }

    let raw = std::fs::read_to_string(state_dir.join("connections.json")).unwrap();
    let file: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entries: BTreeMap<String, Connection> =
        serde_json::from_value(file["entries"].clone()).unwrap();
    assert_eq!(entries.len(), K);
}

#[test]
fn concurrent_name_allocations_are_unique() {
    const K: usize = 6;
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");

    let children: Vec<Child> = (0..K)
        .map(|i| {
            corral(&state_dir)
                .args(["names", "allocate", &format!("agent-{}", i)])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .unwrap()
        })
        .collect();

    let mut names = HashSet::new();
    for child in children {
        let output = child.wait_with_output().unwrap();
        assert_success(&output);
        let name = String::from_utf8(output.stdout).unwrap().trim().to_string();
        assert!(names.insert(name), "name handed out twice");
    }
    assert_eq!(names.len(), K);
}

#[test]
fn killed_holder_releases_lock_and_leaves_reclaimable_file() {
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");
    let resource = dir.path().join("shared.json");

    let mut holder = corral(&state_dir)
        .arg("lock")
        .arg("hold")
        .arg(&resource)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut line = String::new();
    let stdout = holder.stdout.take().unwrap();
    BufReader::new(stdout).read_line(&mut line).unwrap();
    assert!(line.starts_with("locked "), "unexpected output: {:?}", line);

    let mut contender = FileLock::new(&resource, LockOptions::default()).unwrap();
    assert!(!contender.try_lock().unwrap());

    holder.kill().unwrap();
    holder.wait().unwrap();

    let started = Instant::now();
    let mut lock = FileLock::new(
        &resource,
        LockOptions::default().with_timeout(LockTimeout::After(Duration::from_secs(5))),
    )
    .unwrap();
    lock.lock().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    lock.unlock().unwrap();

    let locks_dir = locks_dir_for(&resource);
    assert_eq!(clean_stale_locks(&locks_dir).unwrap(), 1);
    assert_eq!(clean_stale_locks(&locks_dir).unwrap(), 0);
}

#[test]
fn busy_lock_maps_to_lock_busy_exit_code() {
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");
    let resource = dir.path().join("shared.json");

    let mut lock = FileLock::new(&resource, LockOptions::default()).unwrap();
    lock.lock().unwrap();

    let output = corral(&state_dir)
        .arg("lock")
        .arg("hold")
        .arg(&resource)
        .args(["--timeout-ms", "-1", "--hold-ms", "0"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(exit_codes::LOCK_BUSY));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("resource busy"), "stderr: {}", stderr);

    lock.unlock().unwrap();
}

#[test]
fn lock_clean_through_cli_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");

    let add = corral(&state_dir)
        .args(["connection", "add", "local", "--root", "/srv"])
        .output()
        .unwrap();
    assert_success(&add);

    let listed = corral(&state_dir).args(["lock", "list"]).output().unwrap();
    assert_success(&listed);
    let listing = String::from_utf8_lossy(&listed.stdout);
    assert!(listing.contains("connections.json (STALE"), "{}", listing);

    let first = corral(&state_dir).args(["lock", "clean"]).output().unwrap();
    assert_success(&first);
    assert!(String::from_utf8_lossy(&first.stdout).starts_with("Removed 1 "));

    let second = corral(&state_dir).args(["lock", "clean"]).output().unwrap();
    assert_success(&second);
    assert!(String::from_utf8_lossy(&second.stdout).starts_with("Removed 0 "));
}
