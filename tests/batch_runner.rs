use std::fs;
use std::path::{Path, PathBuf};

use stagekit::batch::{run_cmd, stage_batch, BatchError, BatchRunner, CommandSpec, MANIFEST_NAME};

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn write_executable(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, body).expect("write executable");
    let mut perms = fs::metadata(path).expect("stat executable").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod executable");
}

#[test]
fn stages_one_script_per_command_with_manifest() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let work = temp.path().join("batch");
    let commands = vec![
        CommandSpec::Argv(vec!["echo".into(), "hi".into()]),
        CommandSpec::Raw("echo bye\n".into()),
        CommandSpec::Argv(vec!["true".into()]),
    ];

    let manifest_path = stage_batch(&commands, &work).expect("stage batch");
    assert_eq!(manifest_path, work.join(MANIFEST_NAME));

    let manifest = fs::read_to_string(&manifest_path).expect("read manifest");
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), commands.len());
    for (tag, line) in lines.iter().enumerate() {
        let script = work.join(format!("{tag}.sh"));
        assert_eq!(*line, format!("sh {}", script.display()));
        assert!(script.is_file(), "missing script {}", script.display());
    }
}

#[test]
fn argv_commands_are_joined_and_raw_commands_written_verbatim() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let work = temp.path().to_path_buf();
    let commands = vec![
        CommandSpec::Argv(vec!["echo".into(), "hi".into()]),
        CommandSpec::Raw("echo hi\n".into()),
    ];

    stage_batch(&commands, &work).expect("stage batch");

    let joined = fs::read_to_string(work.join("0.sh")).expect("read argv script");
    assert_eq!(joined, "#!/bin/bash\necho hi\n");
    let verbatim = fs::read_to_string(work.join("1.sh")).expect("read raw script");
    assert_eq!(verbatim, "#!/bin/bash\necho hi\n");
}

#[test]
fn staging_tolerates_an_existing_work_dir() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let work = temp.path().join("reused");
    let commands = vec![CommandSpec::Raw("true\n".into())];

    stage_batch(&commands, &work).expect("first staging");
    stage_batch(&commands, &work).expect("second staging over existing dir");
}

#[cfg(unix)]
#[test]
fn run_batch_runs_manifest_lines_through_the_executor() {
    let temp = tempfile::tempdir().expect("create temp dir");
    // Stand-in executor: ignores --jobs and runs manifest lines sequentially.
    let fake = temp.path().join("fake-parallel");
    write_executable(&fake, "#!/bin/sh\nexec sh\n");

    let work = temp.path().join("batch");
    let markers = [temp.path().join("one"), temp.path().join("two")];
    let commands: Vec<CommandSpec> = markers
        .iter()
        .map(|marker| CommandSpec::Raw(format!("touch {}\n", marker.display())))
        .collect();

    let runner = BatchRunner::with_executor(fake.display().to_string());
    runner.run_batch(&commands, &work, 2).expect("run batch");
    for marker in &markers {
        assert!(marker.is_file(), "job did not run: {}", marker.display());
    }
}

#[cfg(unix)]
#[test]
fn run_batch_surfaces_executor_failure() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let fake = temp.path().join("broken-executor");
    write_executable(&fake, "#!/bin/sh\nexit 3\n");

    let commands = vec![CommandSpec::Raw("true\n".into())];
    let runner = BatchRunner::with_executor(fake.display().to_string());
    let err = runner
        .run_batch(&commands, &temp.path().join("batch"), 1)
        .expect_err("non-zero executor exit must fail the batch");
    match err {
        BatchError::ExecutorFailed { status, .. } => assert_eq!(status.code(), Some(3)),
        other => panic!("expected executor failure, got {other:?}"),
    }
}

#[test]
fn run_batch_under_gnu_parallel_when_available() {
    let Some(_parallel) = find_in_path("parallel") else {
        return;
    };

    let temp = tempfile::tempdir().expect("create temp dir");
    let work = temp.path().join("batch");
    let markers: Vec<PathBuf> = (0..4).map(|i| temp.path().join(format!("job{i}"))).collect();
    let commands: Vec<CommandSpec> = markers
        .iter()
        .map(|marker| {
            CommandSpec::Argv(vec!["touch".into(), marker.display().to_string()])
        })
        .collect();

    BatchRunner::new()
        .run_batch(&commands, &work, 2)
        .expect("run batch under parallel");
    for marker in &markers {
        assert!(marker.is_file(), "job did not run: {}", marker.display());
    }
}

#[test]
fn run_cmd_redirects_stdout_to_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("captured.txt");

    run_cmd(&["echo".into(), "hello".into()], Some(&out)).expect("run echo");
    assert_eq!(fs::read_to_string(&out).expect("read capture"), "hello\n");
}

#[test]
fn run_cmd_reports_stderr_on_failure() {
    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo oops >&2; exit 2".to_string(),
    ];
    let err = run_cmd(&argv, None).expect_err("non-zero exit must fail");
    match err {
        BatchError::CommandFailed { status, stderr, .. } => {
            assert_eq!(status.code(), Some(2));
            assert!(stderr.contains("oops"), "stderr not captured: {stderr}");
        }
        other => panic!("expected command failure, got {other:?}"),
    }
}
