use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

use survboard::codec::FeatureLayout;
use survboard::model::{ModelArtifact, RiskSpec};

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_survboard"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run survboard cli")
}

fn write_cox_model(dir: &Path) -> PathBuf {
    let models = dir.join("models");
    fs::create_dir_all(&models).expect("create model directory");
    let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
    let mut coefficients = vec![0.0; 11];
    coefficients[3] = 0.4;
    ModelArtifact {
        name: "CoxPH".to_string(),
        num_features: 11,
        feature_names: layout.required_order().to_vec(),
        baseline_survival: (0..=72).map(|t| 1.0 - t as f64 / 100.0).collect(),
        input_scaling: None,
        risk: RiskSpec::CoxPH { coefficients },
    }
    .save(&models.join("CoxPH.toml"))
    .expect("save model");
    models
}

#[test]
fn predict_single_patient_writes_exports() {
    let tmp = tempdir().expect("temporary directory");
    write_cox_model(tmp.path());

    let output = run(
        tmp.path(),
        &[
            "predict",
            "--model",
            "CoxPH",
            "--set",
            "Stage=I",
            "--set",
            "Age=>60",
            "--summary-out",
            "summary.tsv",
            "--curves-out",
            "curves.tsv",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "CLI failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // Stage I has zero risk, so the baseline is reported directly.
    assert!(stdout.contains("1-Year survival probability: 88.00%"), "{stdout}");
    assert!(stdout.contains("5-Year survival probability: 40.00%"), "{stdout}");
    assert!(stdout.contains("Model: CoxPH"), "{stdout}");
    assert!(
        stdout.contains(
            "Estimated Survival Probability (Survival probability vs Time, month) saved to: curves.tsv"
        ),
        "{stdout}"
    );

    let summary = fs::read_to_string(tmp.path().join("summary.tsv")).expect("summary export");
    let mut lines = summary.lines();
    assert!(
        lines
            .next()
            .expect("header")
            .starts_with("Patients\t1-Year\t3-Year\t5-Year\tAge\t")
    );
    assert!(
        lines
            .next()
            .expect("row")
            .starts_with("1\t88.00%\t64.00%\t40.00%\t>60\t")
    );

    let curves = fs::read_to_string(tmp.path().join("curves.tsv")).expect("curve export");
    assert_eq!(curves.lines().count(), 1 + 73);
    assert!(curves.starts_with("Patients\tTime\tSurvival\n1\t0\t1.0\n"));
}

#[test]
fn predict_reads_a_patient_table() {
    let tmp = tempdir().expect("temporary directory");
    write_cox_model(tmp.path());
    fs::write(
        tmp.path().join("patients.tsv"),
        "Stage\tMetastasis\nI\tNo\nIII\tYes\nIV\t\n",
    )
    .expect("write patients");

    let output = run(
        tmp.path(),
        &[
            "predict",
            "--model",
            "CoxPH",
            "--patients",
            "patients.tsv",
            "--display",
            "single",
            "--curves-out",
            "curves.tsv",
        ],
    );
    assert!(
        output.status.success(),
        "CLI failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Predicted survival for 3 patients"), "{stdout}");

    // Single display exports only the most recent patient.
    let curves = fs::read_to_string(tmp.path().join("curves.tsv")).expect("curve export");
    assert!(curves.lines().skip(1).all(|line| line.starts_with("3\t")));
}

#[test]
fn unknown_label_fails_without_output() {
    let tmp = tempdir().expect("temporary directory");
    write_cox_model(tmp.path());

    let output = run(
        tmp.path(),
        &[
            "predict",
            "--model",
            "CoxPH",
            "--set",
            "Stage=Unknown-Stage-X",
            "--summary-out",
            "summary.tsv",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert_eq!(stderr.lines().count(), 1, "{stderr}");
    assert!(stderr.contains("Unknown-Stage-X"), "{stderr}");
    assert!(!tmp.path().join("summary.tsv").exists());
}

#[test]
fn short_model_fails_on_five_year_horizon() {
    let tmp = tempdir().expect("temporary directory");
    let models = tmp.path().join("models");
    fs::create_dir_all(&models).expect("create model directory");
    let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
    ModelArtifact {
        name: "Short".to_string(),
        num_features: 11,
        feature_names: layout.required_order().to_vec(),
        baseline_survival: (0..40).map(|t| 1.0 - t as f64 / 80.0).collect(),
        input_scaling: None,
        risk: RiskSpec::CoxPH {
            coefficients: vec![0.0; 11],
        },
    }
    .save(&models.join("Short.toml"))
    .expect("save model");

    let output = run(tmp.path(), &["predict", "--model", "Short"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("5-Year"), "{stderr}");
}

#[test]
fn missing_model_is_reported() {
    let tmp = tempdir().expect("temporary directory");
    let output = run(tmp.path(), &["predict", "--model", "RSF"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("RSF"), "{stderr}");
}

#[test]
fn bundled_models_predict_with_builtin_layout() {
    let tmp = tempdir().expect("temporary directory");
    let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
    let bundled = bundled.to_str().expect("path str");

    for model in ["DeepSurv", "CoxPH"] {
        let output = run(tmp.path(), &["predict", "--model-dir", bundled, "--model", model]);
        assert!(
            output.status.success(),
            "{model} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn schema_lists_every_attribute() {
    let tmp = tempdir().expect("temporary directory");
    let output = run(tmp.path(), &["schema"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
    for name in layout.required_order() {
        assert!(stdout.contains(name.as_str()), "missing {name}");
    }
    assert!(stdout.contains("Age, year"));
}
