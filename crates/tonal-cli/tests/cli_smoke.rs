use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tonal() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("tonal").expect("tonal binary");
    cmd.env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("TONAL_API_BASE")
        .env_remove("TONAL_CONFIG");
    cmd
}

#[test]
fn checklist_prints_sixteen_numbered_lines() {
    let output = tonal().arg("checklist").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 16);
    assert!(lines[0].starts_with("1. Modal Verb Strength: "));
    assert!(lines[15].starts_with("16. Readability: "));
}

#[test]
fn checklist_fingerprint() {
    tonal()
        .args(["checklist", "--fingerprint"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sha256:"));
}

#[test]
fn build_writes_one_request_per_nonempty_row() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("abstracts.csv");
    let out = dir.path().join("batch.jsonl");
    std::fs::write(
        &input,
        "ArticleID,Abstract\n11,We prove it.\n12,\n13,It may hold.\n",
    )
    .unwrap();

    tonal()
        .arg("build")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .args(["--model", "gpt-4o-mini"])
        .assert()
        .success();

    let payload = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<serde_json::Value> = payload
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["custom_id"], "11");
    assert_eq!(lines[1]["custom_id"], "13");
    assert_eq!(lines[1]["body"]["model"], "gpt-4o-mini");
    assert_eq!(lines[1]["body"]["text"]["format"]["type"], "json_schema");
}

#[test]
fn build_rejects_duplicate_ids() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dup.jsonl");
    std::fs::write(
        &input,
        "{\"id\": 1, \"text\": \"a\"}\n{\"id\": \"1\", \"text\": \"b\"}\n",
    )
    .unwrap();

    tonal()
        .arg("build")
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("batch.jsonl"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("duplicate id '1'"));
}

#[test]
fn run_without_api_key_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    std::fs::write(&input, "{\"id\": \"1\", \"text\": \"a\"}\n").unwrap();

    tonal()
        .arg("run")
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("out.jsonl"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn demux_writes_wide_table_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("outcomes.jsonl");
    let out = dir.path().join("wide.csv");
    let rows = [
        json!({"id": "1", "output": {"sections": [
            {"criterion": "5. Caution-Signaling Connectors: some", "justification": "", "score": 7}
        ]}, "validation_passed": true, "validation_reason": "OK"}),
        json!({"id": "2", "output": [
            {"criterion": "Hedging and modal verbs", "justification": "", "score": 3}
        ], "validation_passed": false, "validation_reason": "Output is not an object"}),
        json!({"id": "3", "output": null, "validation_passed": false,
               "validation_reason": "No schema output found in response"}),
    ];
    let text: String = rows.iter().map(|r| format!("{}\n", r)).collect();
    std::fs::write(&input, text).unwrap();

    tonal()
        .arg("demux")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .args(["--column-style", "alias"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rows: 3"))
        .stdout(predicate::str::contains("ambiguous: 1"))
        .stdout(predicate::str::contains("parse errors: 1"));

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "id");
    assert_eq!(&headers[5], "llm_caution");
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(&records[0][5], "7");
    assert_eq!(&records[1][1], "");
    assert_eq!(&records[1][2], "");
}

#[test]
fn demux_csv_reports_python_literal_rows_as_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("evaluations.csv");
    let out = dir.path().join("wide.csv");

    let mut wtr = csv::Writer::from_path(&input).unwrap();
    wtr.write_record(["id", "evaluations"]).unwrap();
    wtr.write_record([
        "a",
        r#"{"sections": [{"criterion": "Caution-Signaling Connectors", "justification": "", "score": 4}]}"#,
    ])
    .unwrap();
    wtr.write_record([
        "b",
        "{'sections': [{'criterion': 'Caution-Signaling Connectors', 'justification': None, 'score': 4}]}",
    ])
    .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    tonal()
        .arg("demux")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .args(["--column-style", "alias"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rows: 2"))
        .stdout(predicate::str::contains("parse errors: 1"));

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(&records[0][5], "4");
    assert_eq!(&records[1][5], "");
}

fn result_line(id: &str) -> String {
    let evaluation = json!({"sections": [
        {"criterion": "Readability", "justification": "plain", "score": 8}
    ]});
    json!({
        "custom_id": id,
        "response": {"body": {"output": [
            {"type": "message", "content": [{"type": "output_text", "text": evaluation.to_string()}]}
        ]}}
    })
    .to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn run_reports_dropped_inputs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file-in"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/batches"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "batch_1", "status": "validating"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/batches/batch_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "batch_1", "status": "completed", "output_file_id": "file-out"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/file-out/content"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("{}\n{}\n", result_line("1"), result_line("3"))),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let out = dir.path().join("out.jsonl");
    std::fs::write(
        &input,
        "{\"id\":\"1\",\"text\":\"a\"}\n{\"id\":\"2\",\"text\":\"b\"}\n{\"id\":\"3\",\"text\":\"c\"}\n",
    )
    .unwrap();

    let base = server.uri();
    let (input_arg, out_arg) = (input.clone(), out.clone());
    let assert = tokio::task::spawn_blocking(move || {
        tonal()
            .env("OPENAI_API_KEY", "test-key")
            .env("TONAL_API_BASE", base)
            .arg("run")
            .arg(&input_arg)
            .arg("--out")
            .arg(&out_arg)
            .args(["--poll-interval", "0", "--max-polls", "5"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(1)
        .stdout(predicate::str::contains("1 inputs produced no output: 2"));

    let outcomes = std::fs::read_to_string(&out).unwrap();
    assert_eq!(outcomes.lines().count(), 2);
}
