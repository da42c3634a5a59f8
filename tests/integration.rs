use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> std::process::Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_virtualpop"));
    Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command")
}

fn assert_success(args: &[&str]) {
    let output = run_bin(args);
    let stdout_str = String::from_utf8_lossy(&output.stdout);
    let stderr_str = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

fn prepare_dir(name: &str, config_contents: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");
    test_dir
}

#[test]
fn basic_workflow() {
    let config_contents = String::new()
        + "[growth]\n"
        + "k_mu = 0.6\n"
        + "linf_mu = 60.0\n"
        + "\n"
        + "[recruitment]\n"
        + "rmax = 800.0\n"
        + "repro_weights = [0.0, 0.0, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]\n"
        + "\n"
        + "[mortality]\n"
        + "m = 0.5\n"
        + "harvest_rate = 1.5\n"
        + "\n"
        + "[simulation]\n"
        + "time_max = 3.0\n"
        + "time_min_date = \"2010-01-01\"\n"
        + "n0 = 400\n"
        + "fished_times = [2.0, 2.5, 3.0]\n"
        + "seed = 42\n"
        + "\n"
        + "[output]\n"
        + "sample_fraction = 0.5\n"
        + "bin_size = 2.0\n";
    let test_dir = prepare_dir("basic_workflow", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert_success(&["--sim-dir", test_dir_str, "check"]);
    assert_success(&["--sim-dir", test_dir_str, "run"]);
    assert_success(&["--sim-dir", test_dir_str, "run", "--seed", "43"]);

    let run_0 = test_dir.join("run-0000");
    let run_1 = test_dir.join("run-0001");
    for run_dir in [&run_0, &run_1] {
        assert!(run_dir.join("results.json").is_file());
        assert!(run_dir.join("samples.msgpack").is_file());
    }

    let results: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(run_0.join("results.json")).expect("failed to read results"),
    )
    .expect("failed to parse results");
    assert_eq!(results["seed"], 42);
    assert_eq!(results["pop"]["abundance"].as_array().map(Vec::len), Some(37));
    assert_eq!(results["pop"]["dates"][0], "2010-01-01");
    assert_eq!(results["growth"]["t_anchor"], 0.25);

    let n_samples = results["lfq"]["times"].as_array().map(Vec::len).unwrap_or(0);
    assert!((1..=3).contains(&n_samples), "{n_samples} samples");
    let n_bins = results["lfq"]["mid_lengths"].as_array().map(Vec::len).unwrap_or(0);
    assert_eq!(results["lfq"]["catch"].as_array().map(Vec::len), Some(n_bins));

    let results_1: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(run_1.join("results.json")).expect("failed to read results"),
    )
    .expect("failed to parse results");
    assert_eq!(results_1["seed"], 43);

    assert_success(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!run_0.exists() && !run_1.exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn mismatched_schedule_is_rejected() {
    let config_contents = String::new()
        + "[recruitment]\n"
        + "repro_weights = [1.0, 0.0, 0.0, 0.0]\n"
        + "\n"
        + "[simulation]\n"
        + "dt = 0.0833333333333333\n";
    let test_dir = prepare_dir("mismatched_schedule", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--sim-dir", test_dir_str, "run"]);
    assert!(!output.status.success());
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}
