//! CLI command tests.
//!
//! Each test runs the compiled `sparx` binary against netlists written to a
//! temporary directory and inspects its exit status and output.

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

const MZI: &str = r#"{
    "instances": {
        "lft": "coupler",
        "top": {"component": "straight", "settings": {"length": 25.0}},
        "btm": {"component": "straight", "settings": {"length": 15.0}},
        "rgt": "coupler"
    },
    "connections": {
        "lft,out0": "btm,in0",
        "btm,out0": "rgt,in0",
        "lft,out1": "top,in0",
        "top,out0": "rgt,in1"
    },
    "ports": {
        "in0": "lft,in0",
        "in1": "lft,in1",
        "out0": "rgt,out0",
        "out1": "rgt,out1"
    }
}"#;

fn sparx(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sparx"))
        .args(args)
        .env_remove("SPARX_BACKEND")
        .output()
        .unwrap()
}

fn write_netlist(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, json).unwrap();
    path
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// `|S|^2` of `(from, to)` for every sample in a JSON-rendered SDict.
fn power(sdict: &serde_json::Value, from: &str, to: &str) -> Vec<f64> {
    sdict["entries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["from"] == from && e["to"] == to)
        .map(|e| {
            e["values"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| {
                    let re = c[0].as_f64().unwrap();
                    let im = c[1].as_f64().unwrap();
                    re * re + im * im
                })
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// check
// ============================================================================

mod check {
    use super::*;

    #[test]
    fn reports_ports_and_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);

        let out = sparx(&["check", "--netlist", path.to_str().unwrap()]);
        assert!(out.status.success(), "{}", stderr(&out));

        let text = stdout(&out);
        assert!(text.contains("ports: in0, in1, out0, out1"));
        assert!(text.contains("lft: coupler (sparx)"));
        assert!(text.contains("top.length = 25.0"));
        assert!(text.contains("4 external ports, 4 leaf instances"));
    }

    #[test]
    fn names_the_unconnected_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(
            &dir,
            "open.json",
            r#"{
                "instances": {"wg": "straight"},
                "ports": {"in0": "wg,in0"}
            }"#,
        );

        let out = sparx(&["check", "-n", path.to_str().unwrap()]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("wg,out0"));
    }

    #[test]
    fn missing_file_is_reported() {
        let out = sparx(&["check", "--netlist", "does/not/exist.json"]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("File not found: does/not/exist.json"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "bad.json", "{ not json");

        let out = sparx(&["check", "--netlist", path.to_str().unwrap()]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("Failed to parse netlist"));
    }
}

// ============================================================================
// eval
// ============================================================================

mod eval {
    use super::*;

    #[test]
    fn json_output_conserves_power() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);

        let out = sparx(&[
            "eval",
            "--netlist",
            path.to_str().unwrap(),
            "--format",
            "json",
            "--sweep",
            "wl=1.5:1.6:5",
        ]);
        assert!(out.status.success(), "{}", stderr(&out));

        let sdict: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
        let bar = power(&sdict, "in0", "out0");
        let cross = power(&sdict, "in0", "out1");
        assert_eq!(bar.len(), 5);
        for (b, c) in bar.iter().zip(&cross) {
            assert!((b + c - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn backends_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);
        let path = path.to_str().unwrap();

        let results: Vec<Vec<f64>> = ["dense", "klu", "forward"]
            .iter()
            .map(|backend| {
                let out = sparx(&["eval", "-n", path, "-b", backend, "-f", "json"]);
                assert!(out.status.success(), "{backend}: {}", stderr(&out));
                let sdict: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
                power(&sdict, "in0", "out1")
            })
            .collect();
        for r in &results[1..] {
            assert!((r[0] - results[0][0]).abs() < 1e-9);
        }
    }

    #[test]
    fn table_has_one_column_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);

        let out = sparx(&[
            "eval",
            "-n",
            path.to_str().unwrap(),
            "--set",
            "wl=1.5,1.55,1.6",
        ]);
        assert!(out.status.success(), "{}", stderr(&out));

        let text = stdout(&out);
        let header = text.lines().next().unwrap();
        assert_eq!(header.matches("wl=").count(), 3);
        assert!(text.lines().any(|l| l.contains("in0 -> out1")));
    }

    #[test]
    fn writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);
        let target = dir.path().join("s.json");

        let out = sparx(&[
            "eval",
            "-n",
            path.to_str().unwrap(),
            "-f",
            "json",
            "-o",
            target.to_str().unwrap(),
            "--set",
            "top.length=15",
        ]);
        assert!(out.status.success(), "{}", stderr(&out));
        assert!(stdout(&out).is_empty());

        // Equal arms: everything exits through the bar port of a 50/50 MZI.
        let sdict: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert!(power(&sdict, "in0", "out0")[0] < 1e-12);
        assert!((power(&sdict, "in0", "out1")[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mode_projection_strips_mode_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);

        let out = sparx(&[
            "eval",
            "-n",
            path.to_str().unwrap(),
            "--modes",
            "TE,TM",
            "--mode",
            "TE",
            "-f",
            "json",
        ]);
        assert!(out.status.success(), "{}", stderr(&out));

        let sdict: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
        let ports: Vec<&str> = sdict["ports"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap())
            .collect();
        assert_eq!(ports, vec!["in0", "in1", "out0", "out1"]);
    }

    #[test]
    fn mode_without_modes_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);

        let out = sparx(&["eval", "-n", path.to_str().unwrap(), "--mode", "TE"]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("--modes"));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);
        let path = path.to_str().unwrap();

        let out = sparx(&["eval", "-n", path, "-b", "gpu"]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("Available backends"));

        let out = sparx(&["eval", "-n", path, "-f", "csv"]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("Unknown format"));

        let out = sparx(&["eval", "-n", path, "--sweep", "wl=1.5"]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("start:stop:n"));
    }

    #[test]
    fn unknown_instance_setting_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_netlist(&dir, "mzi.json", MZI);

        let out = sparx(&["eval", "-n", path.to_str().unwrap(), "--set", "nope.length=3"]);
        assert!(!out.status.success());
        assert!(stderr(&out).contains("nope"));
    }
}

// ============================================================================
// models / version
// ============================================================================

mod info {
    use super::*;

    #[test]
    fn models_lists_library() {
        let out = sparx(&["models"]);
        assert!(out.status.success());
        let text = stdout(&out);
        for name in ["straight", "coupler", "mirror", "mmi1x2", "phase_shifter", "attenuator"] {
            assert!(text.contains(name), "{name} missing");
        }
        assert!(text.contains("coupling=0.5"));
    }

    #[test]
    fn version_prints_package_version() {
        let out = sparx(&["version"]);
        assert!(out.status.success());
        assert!(stdout(&out).contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn missing_subcommand_fails() {
        let out = sparx(&[]);
        assert!(!out.status.success());
    }
}
