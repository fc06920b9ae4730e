use jni_debug_helper::adb::CommandOutput;
use jni_debug_helper::session::PidError;
use jni_debug_helper::vscode::ConfigWriteError;
use jni_debug_helper::{
    CommandRunner, Gateway, MarkerPair, Session, SessionError, SessionParams, SpliceError, Step,
};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Fake adb: answers `ps -A` from a script, fails any command containing one of
/// `fail_on`, and records every command line it sees.
struct FakeAdb {
    ps_replies: RefCell<Vec<String>>,
    fail_on: Vec<&'static str>,
    calls: RefCell<Vec<String>>,
}

impl FakeAdb {
    fn new(ps_replies: &[&str]) -> Self {
        Self {
            ps_replies: RefCell::new(ps_replies.iter().rev().map(|s| s.to_string()).collect()),
            fail_on: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn failing_on(mut self, needle: &'static str) -> Self {
        self.fail_on.push(needle);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn ran(&self, needle: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.contains(needle))
    }
}

impl CommandRunner for FakeAdb {
    fn run(&self, args: &[String]) -> io::Result<CommandOutput> {
        let line = args.join(" ");
        self.calls.borrow_mut().push(line.clone());
        if self.fail_on.iter().any(|needle| line.contains(needle)) {
            return Ok(CommandOutput {
                success: false,
                status: Some(1),
                stdout: String::new(),
                stderr: "error: device offline".to_string(),
            });
        }
        let stdout = if line.ends_with("shell ps -A") {
            self.ps_replies.borrow_mut().pop().unwrap_or_default()
        } else {
            String::new()
        };
        Ok(CommandOutput {
            success: true,
            status: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

const NO_SERVER: &str = "USER PID PPID NAME\nroot 1 0 init\n";
const APP_RUNNING: &str = "\
USER           PID  PPID NAME
root             1     0 init
u0_a123       1234   612 com.example.app   \n";

const LAUNCH_JSON: &str = r#"{
    "version": "0.2.0",
    "configurations": [
        {
            "name": "Hand written",
            "type": "lldb",
            "request": "launch"
        },
        // #lldbclient-generated-begin
        // #lldbclient-generated-end
    ]
}
"#;

fn params(launch_file: &Path) -> SessionParams {
    SessionParams {
        device: None,
        package: "com.example.app".to_string(),
        activity: "org.golang.app.GoNativeActivity".to_string(),
        debug_server: PathBuf::from("/ndk/toolchains/arm64/lldb-server"),
        symbol_file: PathBuf::from("/work/jni/arm64-v8a/libgojni.so"),
        port: 23456,
        wait_for_debugger: false,
        config_name: "Go Mobile Debugging".to_string(),
        launch_file: launch_file.to_path_buf(),
        markers: MarkerPair::default(),
    }
}

fn launch_file(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("launch.json");
    fs::write(&path, LAUNCH_JSON).unwrap();
    path
}

#[test]
fn full_session_writes_attach_config_and_starts_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = launch_file(&dir);
    let gateway = Gateway::with_runner(FakeAdb::new(&[NO_SERVER, APP_RUNNING]), false);

    let pid = Session::new(&gateway, &params(&path)).run().unwrap();
    assert_eq!(pid, 1234);

    let expected = r#"{
    "version": "0.2.0",
    "configurations": [
        {
            "name": "Hand written",
            "type": "lldb",
            "request": "launch"
        },
        // #lldbclient-generated-begin
        {
            "name": "Go Mobile Debugging",
            "type": "lldb",
            "request": "custom",
            "initCommands": ["platform select remote-android", "file /work/jni/arm64-v8a/libgojni.so"],
            "processCreateCommands": ["platform connect connect://localhost:23456", "attach 1234"]
        }
        // #lldbclient-generated-end
    ]
}
"#;
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);

    let calls = gateway.runner().calls();
    assert_eq!(
        calls.last().map(String::as_str),
        Some(
            "shell run-as com.example.app /data/data/com.example.app/lldb-server \
             platform --server --listen \"*:23456\""
        )
    );
    assert!(gateway.runner().ran("shell setprop debug.debuggerd.wait_for_debugger false"));
}

#[test]
fn rerunning_replaces_previous_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = launch_file(&dir);

    let first = Gateway::with_runner(FakeAdb::new(&[NO_SERVER, APP_RUNNING]), false);
    Session::new(&first, &params(&path)).run().unwrap();

    let relaunched = APP_RUNNING.replace("1234", "4321");
    let second = Gateway::with_runner(FakeAdb::new(&[NO_SERVER, relaunched.as_str()]), false);
    Session::new(&second, &params(&path)).run().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("\"name\": \"Go Mobile Debugging\"").count(), 1);
    assert!(text.contains("\"attach 4321\""));
    assert!(!text.contains("\"attach 1234\""));
    assert!(text.contains("\"name\": \"Hand written\""));
}

#[test]
fn failed_cleanup_does_not_block_deploy() {
    let dir = tempfile::tempdir().unwrap();
    let path = launch_file(&dir);
    let with_server = "USER PID NAME\nu0_a123 999 /data/data/com.example.app/lldb-server\n";
    let adb = FakeAdb::new(&[with_server, APP_RUNNING]).failing_on("kill -9");
    let gateway = Gateway::with_runner(adb, false);

    Session::new(&gateway, &params(&path)).run().unwrap();
    assert!(gateway.runner().ran("kill -9 999"));
    assert!(gateway.runner().ran("push /ndk/toolchains/arm64/lldb-server"));
}

#[test]
fn unreadable_process_listing_during_cleanup_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = launch_file(&dir);
    let gateway = Gateway::with_runner(FakeAdb::new(&["garbage", APP_RUNNING]), false);
    assert_eq!(Session::new(&gateway, &params(&path)).run().unwrap(), 1234);
}

#[test]
fn failure_stops_all_later_steps() {
    // (failing command, step, later command that must never run)
    let cases = [
        ("push", Step::Deploy, "setprop"),
        ("cp /data/local/tmp", Step::Deploy, "setprop"),
        ("setprop", Step::Configure, "forward"),
        ("forward", Step::Forward, "am start"),
        ("am start", Step::Launch, "platform --server"),
        ("platform --server", Step::StartServer, "\u{0}"),
    ];
    for (needle, step, later) in cases {
        let dir = tempfile::tempdir().unwrap();
        let path = launch_file(&dir);
        let adb = FakeAdb::new(&[NO_SERVER, APP_RUNNING]).failing_on(needle);
        let gateway = Gateway::with_runner(adb, false);

        let err = Session::new(&gateway, &params(&path)).run().unwrap_err();
        assert_eq!(err.step(), step, "failing on '{needle}'");
        assert!(!gateway.runner().ran(later), "'{later}' ran after '{needle}' failed");
    }
}

#[test]
fn failed_config_write_leaves_launch_file_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("launch.json");
    fs::write(&path, "{\n  // #lldbclient-generated-begin\n}\n").unwrap();
    let gateway = Gateway::with_runner(FakeAdb::new(&[NO_SERVER, APP_RUNNING]), false);

    let err = Session::new(&gateway, &params(&path)).run().unwrap_err();
    match &err {
        SessionError::ConfigWrite(ConfigWriteError::Splice { source, .. }) => {
            assert!(matches!(source, SpliceError::UnterminatedMarker { line: 2, .. }))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 6);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "{\n  // #lldbclient-generated-begin\n}\n"
    );
    assert!(!gateway.runner().ran("platform --server"));
}

#[test]
fn app_missing_from_process_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = launch_file(&dir);
    let gateway = Gateway::with_runner(FakeAdb::new(&[NO_SERVER, NO_SERVER]), false);

    let err = Session::new(&gateway, &params(&path)).run().unwrap_err();
    assert!(matches!(err, SessionError::PidNotFound(PidError::Lookup(_))));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(fs::read_to_string(&path).unwrap(), LAUNCH_JSON);
}

#[test]
fn device_serial_scopes_every_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = launch_file(&dir);
    let mut params = params(&path);
    params.device = Some("R58M123ABC".to_string());
    let gateway = Gateway::with_runner(FakeAdb::new(&[NO_SERVER, APP_RUNNING]), false);

    Session::new(&gateway, &params).run().unwrap();
    assert!(gateway
        .runner()
        .calls()
        .iter()
        .all(|c| c.starts_with("-s R58M123ABC ")));
    assert!(fs::read_to_string(&path)
        .unwrap()
        .contains("connect://R58M123ABC:23456"));
}
