use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("inferlab").unwrap()
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("inferlab.toml");
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

/// Ten reviews per class; file names carry folds 1..=5.
fn write_corpus(root: &Path) {
    let reviews = [
        ("pos", ["a wonderful moving film", "wonderful acting and a moving story"]),
        ("neg", ["an awful boring film", "boring plot and awful acting"]),
    ];
    for (polarity, texts) in reviews {
        let dir = root.join(polarity);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..10 {
            let name = format!("cv{:03}_{i}.txt", (i / 2) * 100 + i);
            fs::write(dir.join(name), texts[i % 2]).unwrap();
        }
    }
}

#[test]
fn example_prints_every_section() {
    cmd()
        .arg("example")
        .assert()
        .success()
        .stdout(contains("[sampling]"))
        .stdout(contains("[sentiment]"))
        .stdout(contains("[waltz]"));
}

#[test]
fn validate_defaults_without_file() {
    cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(contains("Configuration is valid"));
}

#[test]
fn validate_rejects_out_of_range_value() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[sentiment]\nmin_df = 2.0\n");
    cmd()
        .args(["--config", &config, "validate"])
        .assert()
        .failure()
        .stderr(contains("sentiment.min_df"));
}

#[test]
fn waltz_prints_labelings() {
    cmd()
        .arg("waltz")
        .assert()
        .success()
        .stdout(contains("[0, 0, 0, 0, 0, 0, 0, 0, 3, 3, 3, 3, 3, 2, 3]"))
        .stdout(contains("4 labelings"));
}

#[test]
fn waltz_json() {
    cmd()
        .args(["--json", "waltz", "--no-filter"])
        .assert()
        .success()
        .stdout(contains("\"filtered\": false"))
        .stdout(contains("\"labelings\""));
}

#[test]
fn alarm_prints_queries_and_learned_cpds() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[sampling]\nrejection_size = 500\n");
    cmd()
        .args(["--config", &config, "alarm"])
        .assert()
        .success()
        .stdout(contains("P(Burglary | JohnCalls=True, MaryCalls=True)"))
        .stdout(contains("CPD of MaryCalls:"))
        .stdout(contains("MaryCalls_0"));
}

#[test]
fn alarm_exhausted_budget_suggests_retry() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[sampling]\nmax_rejection_draws = 1\n");
    cmd()
        .args(["--config", &config, "alarm"])
        .assert()
        .failure()
        .stderr(contains("Alarm pipeline failed"))
        .stderr(contains("larger max_rejection_draws"));
}

#[test]
fn musicianship_prints_both_phases() {
    cmd()
        .arg("musicianship")
        .assert()
        .success()
        .stdout(contains("EXACT INFERENCE"))
        .stdout(contains("APPROXIMATE INFERENCE"))
        .stdout(contains("not normalized"));
}

#[test]
fn sentiment_on_fixture_corpus() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("reviews");
    write_corpus(&corpus);
    let config = write_config(dir.path(), "[sentiment]\nmin_df = 0.0\nfolds = 5\n");
    cmd()
        .args(["--config", &config, "sentiment", "--corpus"])
        .arg(&corpus)
        .assert()
        .success()
        .stdout(contains("Algorithm: Bernoulli"))
        .stdout(contains("Algorithm: Multinomial"))
        .stdout(contains("Test cohen_kappa_score score"));
}

#[test]
fn sentiment_with_corpus_folds_json() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("reviews");
    write_corpus(&corpus);
    let config = write_config(dir.path(), "[sentiment]\nmin_df = 0.0\n");
    cmd()
        .args(["--config", &config, "--json", "sentiment", "--use-corpus-folds", "--corpus"])
        .arg(&corpus)
        .assert()
        .success()
        .stdout(contains("5 folds from file names"))
        .stdout(contains("\"roc_auc_macro\""));
}

#[test]
fn sentiment_missing_corpus_fails() {
    let dir = TempDir::new().unwrap();
    cmd()
        .args(["sentiment", "--corpus"])
        .arg(dir.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(contains("Sentiment pipeline failed"));
}
