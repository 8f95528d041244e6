use std::fs;
use std::path::Path;

use ollabench_client::mock::ScriptedClient;
use ollabench_client::OllamaStats;
use ollabench_common::ModelSpec;
use ollabench_core::{BenchmarkRunner, CategorySelection, PromptCatalog, ResultRecorder, RunSummary};
use ollabench_obs::SystemInfo;

fn stats() -> OllamaStats {
    OllamaStats {
        total_duration: Some(3_000_000_000),
        load_duration: Some(50_000_000),
        prompt_eval_count: Some(10),
        prompt_eval_duration: Some(100_000_000),
        eval_count: Some(60),
        eval_duration: Some(2_000_000_000),
    }
}

fn system() -> SystemInfo {
    SystemInfo {
        cpu: Some("Bench CPU 16-Core".into()),
        ram_total_bytes: Some(32 * 1024 * 1024 * 1024),
        gpus: vec!["GPU 0".into()],
        os: Some("Linux".into()),
        os_version: Some("6.1".into()),
    }
}

fn catalog_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

fn models(names: &[&str]) -> Vec<ModelSpec> {
    names.iter().map(|m| ModelSpec::from(*m)).collect()
}

fn rows(path: &Path) -> Vec<csv::StringRecord> {
    csv::Reader::from_path(path).unwrap().records().map(|r| r.unwrap()).collect()
}

fn run(
    client: &ScriptedClient,
    models: &[ModelSpec],
    catalog: &PromptCatalog,
    out: &Path,
) -> RunSummary {
    let mut recorder = ResultRecorder::open(out).unwrap();
    let mut runner = BenchmarkRunner::new(client, &mut recorder, system());
    runner.run(models, catalog).unwrap()
}

#[test]
fn single_category_rows_follow_catalog_order() {
    let prompts = catalog_dir(&[
        ("coding.json", r#"[{"id": "c1", "prompt": "sort"}, {"id": "c2", "prompt": "parse"}]"#),
        ("general_text.json", r#"["hello"]"#),
    ]);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("all_benchmarks.csv");
    let catalog = PromptCatalog::load(prompts.path(), &"coding".parse().unwrap()).unwrap();
    let client = ScriptedClient::new(stats());

    let summary = run(&client, &models(&["m1"]), &catalog, &path);
    assert_eq!(summary, RunSummary { attempted: 2, succeeded: 2, failed: 0 });

    let rows = rows(&path);
    assert_eq!(rows.len(), 2);
    let got: Vec<(&str, &str, &str)> = rows.iter().map(|r| (&r[0], &r[1], &r[2])).collect();
    assert_eq!(got, [("m1", "coding", "c1"), ("m1", "coding", "c2")]);
    assert_eq!(&rows[0][4], "m1: sort");
}

#[test]
fn all_categories_iterate_models_outermost() {
    let prompts = catalog_dir(&[
        ("coding.json", r#"[{"id": "c1", "prompt": "sort"}]"#),
        ("general_text.json", r#"[{"id": "g1", "prompt": "joke"}]"#),
    ]);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("all_benchmarks.csv");
    let catalog = PromptCatalog::load(prompts.path(), &CategorySelection::All).unwrap();
    let client = ScriptedClient::new(stats());

    run(&client, &models(&["m1", "m2"]), &catalog, &path);

    let got: Vec<(String, String)> =
        rows(&path).iter().map(|r| (r[0].to_string(), r[1].to_string())).collect();
    let expected = [("m1", "coding"), ("m1", "general_text"), ("m2", "coding"), ("m2", "general_text")];
    assert_eq!(got.len(), expected.len());
    for (g, e) in got.iter().zip(expected) {
        assert_eq!((g.0.as_str(), g.1.as_str()), e);
    }
    assert_eq!(
        client.calls(),
        vec![
            ("m1".to_string(), "sort".to_string()),
            ("m1".to_string(), "joke".to_string()),
            ("m2".to_string(), "sort".to_string()),
            ("m2".to_string(), "joke".to_string()),
        ]
    );
}

#[test]
fn row_count_is_models_times_prompts() {
    let prompts = catalog_dir(&[
        ("coding.json", r#"["a", "b", "c"]"#),
        ("general_text.json", r#"["d"]"#),
        ("summarization.json", r#"["e", "f"]"#),
    ]);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("all_benchmarks.csv");
    let catalog = PromptCatalog::load(prompts.path(), &CategorySelection::All).unwrap();
    let client = ScriptedClient::new(stats());
    let models = models(&["m1", "m2", "m3"]);

    let summary = run(&client, &models, &catalog, &path);
    assert_eq!(summary.attempted, 18);
    assert_eq!(rows(&path).len(), 18);
}

#[test]
fn one_failure_does_not_stop_the_run() {
    let prompts = catalog_dir(&[("coding.json", r#"[{"id": "p1", "prompt": "one"}, {"id": "p2", "prompt": "two"}]"#)]);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("all_benchmarks.csv");
    let catalog = PromptCatalog::load(prompts.path(), &CategorySelection::All).unwrap();
    let client = ScriptedClient::new(stats()).fail_on("A", "one");

    let summary = run(&client, &models(&["A", "B"]), &catalog, &path);
    assert_eq!(summary, RunSummary { attempted: 4, succeeded: 3, failed: 1 });

    let rows = rows(&path);
    assert_eq!(rows.len(), 4);
    let (failed, complete): (Vec<_>, Vec<_>) = rows.iter().partition(|r| r[5].is_empty());
    assert_eq!(failed.len(), 1);
    assert_eq!((&failed[0][0], &failed[0][2]), ("A", "p1"));
    assert!((4..=13).all(|i| failed[0][i].is_empty()));
    for row in complete {
        assert!((4..=13).all(|i| !row[i].is_empty()), "incomplete row {row:?}");
    }
}

#[test]
fn system_snapshot_is_identical_on_every_row() {
    let prompts = catalog_dir(&[("coding.json", r#"["a", "b"]"#), ("general_text.json", r#"["c"]"#)]);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("all_benchmarks.csv");
    let catalog = PromptCatalog::load(prompts.path(), &CategorySelection::All).unwrap();
    let client = ScriptedClient::new(stats()).fail_on("m2", "c");

    run(&client, &models(&["m1", "m2"]), &catalog, &path);

    let rows = rows(&path);
    assert_eq!(rows.len(), 6);
    for row in &rows {
        assert_eq!(&row[14], "Bench CPU 16-Core");
        assert_eq!(row[15].parse::<f64>().unwrap(), 32.0);
        assert_eq!(&row[16], "GPU 0");
    }
}

#[test]
fn second_run_appends_without_new_header() {
    let prompts = catalog_dir(&[("coding.json", r#"["a", "b"]"#)]);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("all_benchmarks.csv");
    let catalog = PromptCatalog::load(prompts.path(), &CategorySelection::All).unwrap();
    let client = ScriptedClient::new(stats());

    run(&client, &models(&["m1"]), &catalog, &path);
    run(&client, &models(&["m2"]), &catalog, &path);

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("model,")).count(), 1);
    let models: Vec<String> = rows(&path).iter().map(|r| r[0].to_string()).collect();
    assert_eq!(models, ["m1", "m1", "m2", "m2"]);
}
