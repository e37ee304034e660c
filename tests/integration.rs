use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn medprep_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("medprep");
    path
}

/// Minimal single-page PDF showing `phrase` in Helvetica, with correct xref
/// offsets so both page-level and whole-document extraction can parse it.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Two-sheet workbook using shared strings.
fn minimal_xlsx() -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = zip::write::SimpleFileOptions::default();
        let files: [(&str, &str); 5] = [
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0"?><workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Renal" sheetId="1" r:id="rId1"/><sheet name="Endocrine" sheetId="2" r:id="rId2"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0"?><Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Target="worksheets/sheet2.xml"/></Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                "<sst><si><t>Acute kidney injury staging</t></si><si><t>Insulin titration</t></si></sst>",
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row><c t="s"><v>0</v></c></row></sheetData></worksheet>"#,
            ),
            (
                "xl/worksheets/sheet2.xml",
                r#"<worksheet><sheetData><row><c t="s"><v>1</v></c><c><v>12</v></c></row></sheetData></worksheet>"#,
            ),
        ];
        for (name, body) in files {
            zip.start_file(name, opts).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn write_config(root: &Path, extra: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = format!(
        r#"[corpus]
root = "{root}/PDFs"

[store]
path = "{root}/data/tokenized_content.json"

[predict]
seed = 42

[taxonomy]
heart_failure = ["heart failure", "CHF"]
diabetes = ["diabetes", "insulin"]
kidney_disease = ["kidney", "renal"]
{extra}
"#,
        root = root.display(),
        extra = extra
    );
    let config_path = config_dir.join("medprep.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let guidelines = root.join("PDFs/Guidelines");
    let questions = root.join("PDFs/Question_Papers");
    fs::create_dir_all(&guidelines).unwrap();
    fs::create_dir_all(&questions).unwrap();

    fs::write(
        guidelines.join("CHF_guidelines.pdf"),
        minimal_pdf("Heart failure management and staging criteria are reviewed annually"),
    )
    .unwrap();
    fs::write(questions.join("mcq_bank.xlsx"), minimal_xlsx()).unwrap();

    let config_path = write_config(&root, "");
    (tmp, config_path)
}

fn run_medprep(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = medprep_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run medprep binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn tokenize(config_path: &Path) {
    let (stdout, stderr, success) = run_medprep(config_path, &["tokenize", "--progress", "off"]);
    assert!(success, "tokenize failed: stdout={}, stderr={}", stdout, stderr);
}

fn parse_json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("bad JSON ({}): {}", e, stdout))
}

#[test]
fn test_tokenize_writes_store() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_medprep(&config_path, &["tokenize", "--progress", "off"]);
    assert!(success, "tokenize failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("total: 2 files"));
    assert!(stdout.contains("ok"));

    let store = fs::read_to_string(tmp.path().join("data/tokenized_content.json")).unwrap();
    let store = parse_json(&store);
    for category in [
        "guidelines",
        "harrison_textbooks",
        "neurology_textbooks",
        "question_papers",
    ] {
        assert!(store.get(category).is_some(), "missing category {}", category);
    }
    assert_eq!(store["guidelines"][0]["filename"], "CHF_guidelines.pdf");
    assert_eq!(store["guidelines"][0]["file_type"], ".pdf");
}

#[test]
fn test_tokenize_dry_run() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) =
        run_medprep(&config_path, &["tokenize", "--dry-run", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("files found: 2"));
    assert!(!tmp.path().join("data/tokenized_content.json").exists());
}

#[test]
fn test_chf_end_to_end() {
    let (_tmp, config_path) = setup_test_env();
    tokenize(&config_path);

    let (stdout, stderr, success) = run_medprep(&config_path, &["content", "heart failure"]);
    assert!(success, "content failed: {}", stderr);
    assert!(stdout.contains("From CHF_guidelines.pdf:"));
    assert!(stdout.to_lowercase().contains("heart failure"));

    let (stdout, _, success) =
        run_medprep(&config_path, &["summarize", "heart failure", "--json"]);
    assert!(success);
    let summary = parse_json(&stdout);
    assert!(summary["summary"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| {
            let p = p.as_str().unwrap();
            p.contains("management") || p.contains("staging")
        }));

    let (stdout, _, success) = run_medprep(&config_path, &["predict", "--limit", "1", "--json"]);
    assert!(success);
    let preds = parse_json(&stdout);
    let preds = preds["predictions"].as_array().unwrap();
    assert_eq!(preds.len(), 1);
    // the workbook also feeds diabetes and kidney_disease
    let topic = preds[0]["topic"].as_str().unwrap();
    assert!(["heart_failure", "diabetes", "kidney_disease"].contains(&topic));
}

#[test]
fn test_predict_single_topic_corpus() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let guidelines = root.join("PDFs/Guidelines");
    fs::create_dir_all(&guidelines).unwrap();
    fs::write(
        guidelines.join("CHF_guidelines.pdf"),
        minimal_pdf("Heart failure management and staging criteria"),
    )
    .unwrap();
    let config_path = write_config(root, "");
    tokenize(&config_path);

    let (stdout, _, success) = run_medprep(&config_path, &["predict", "--limit", "1", "--json"]);
    assert!(success);
    let preds = parse_json(&stdout);
    assert_eq!(preds["predictions"].as_array().unwrap().len(), 1);
    assert_eq!(preds["predictions"][0]["topic"], "heart_failure");
}

#[test]
fn test_predict_is_reproducible_with_seed() {
    let (_tmp, config_path) = setup_test_env();
    tokenize(&config_path);

    let args = ["predict", "--limit", "3", "--seed", "7", "--json"];
    let (first, _, _) = run_medprep(&config_path, &args);
    let (second, _, _) = run_medprep(&config_path, &args);
    assert_eq!(first, second);
}

#[test]
fn test_empty_store_predict_fallback() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_medprep(&config_path, &["predict", "--limit", "5", "--json"]);
    assert!(success);
    let preds = parse_json(&stdout);
    let topics: Vec<&str> = preds["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["topic"].as_str().unwrap())
        .collect();
    assert_eq!(
        topics,
        vec![
            "cardiovascular_disease",
            "diabetes_management",
            "respiratory_conditions"
        ]
    );
}

#[test]
fn test_malformed_store_is_empty_index() {
    let (tmp, config_path) = setup_test_env();
    fs::create_dir_all(tmp.path().join("data")).unwrap();
    fs::write(tmp.path().join("data/tokenized_content.json"), "{ broken").unwrap();

    let (stdout, stderr, success) = run_medprep(&config_path, &["predict", "--json"]);
    assert!(success, "predict failed: {}", stderr);
    assert!(stdout.contains("cardiovascular_disease"));
    assert!(stderr.contains("malformed token store"));
}

#[test]
fn test_content_unknown_topic() {
    let (_tmp, config_path) = setup_test_env();
    tokenize(&config_path);

    let (_, stderr, success) = run_medprep(&config_path, &["content", "oncology"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
    assert!(stderr.contains("heart_failure"));
}

#[test]
fn test_summarize_unknown_topic_placeholder() {
    let (_tmp, config_path) = setup_test_env();
    tokenize(&config_path);

    let (stdout, _, success) = run_medprep(&config_path, &["summarize", "oncology"]);
    assert!(success);
    assert!(stdout.contains("No specific content available for oncology"));
}

#[test]
fn test_workbook_sheets_in_token_data() {
    let (_tmp, config_path) = setup_test_env();
    tokenize(&config_path);

    let (stdout, stderr, success) = run_medprep(
        &config_path,
        &["token-data", "question_papers", "mcq_bank.xlsx"],
    );
    assert!(success, "token-data failed: {}", stderr);
    let record = parse_json(&stdout);
    assert_eq!(record["file_type"], ".xlsx");
    let chunk = record["chunks"][0].as_str().unwrap();
    assert!(chunk.contains("Sheet: Renal Acute kidney injury staging"));
    assert!(chunk.contains("Sheet: Endocrine Insulin titration 12"));

    let (_, stderr, success) =
        run_medprep(&config_path, &["token-data", "question_papers", "nope.xlsx"]);
    assert!(!success);
    assert!(stderr.contains("No token data"));
}

#[test]
fn test_files_lists_corpus() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_medprep(&config_path, &["files"]);
    assert!(success);
    assert!(stdout.contains("CHF_guidelines.pdf"));
    assert!(stdout.contains("mcq_bank.xlsx"));
    assert!(stdout.contains("(folder not found)"));
    assert!(stdout.contains("2 files"));
}

#[test]
fn test_stats_and_exports() {
    let (tmp, config_path) = setup_test_env();
    tokenize(&config_path);

    let (stdout, _, success) = run_medprep(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("question_papers"));
    assert!(stdout.contains("total"));

    let csv_path = tmp.path().join("out/summary.csv");
    let (_, _, success) = run_medprep(
        &config_path,
        &["export", "csv", "--output", csv_path.to_str().unwrap()],
    );
    assert!(success);
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("category,filename,file_type,size_bytes"));
    assert!(csv.contains("guidelines,CHF_guidelines.pdf,.pdf,"));

    let (stdout, _, success) = run_medprep(&config_path, &["export", "vocab"]);
    assert!(success);
    let tokens: Vec<&str> = stdout.lines().filter(|l| !l.starts_with('#')).collect();
    assert!(tokens.contains(&"insulin"));
    let mut sorted = tokens.clone();
    sorted.sort();
    assert_eq!(tokens, sorted);
}

#[test]
fn test_validate() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_medprep(&config_path, &["validate"]);
    assert!(!success);
    assert!(stderr.contains("Token store not found"));

    tokenize(&config_path);
    let (stdout, _, success) = run_medprep(&config_path, &["validate"]);
    assert!(success);
    assert!(stdout.contains("files: 2"));
    // the one-line PDF is below the default 10-token minimum
    assert!(stdout.contains("guidelines/CHF_guidelines.pdf has only"));
}

#[test]
fn test_extract_single_file() {
    let (tmp, config_path) = setup_test_env();
    let csv = tmp.path().join("notes.csv");
    fs::write(&csv, "topic,pearl\nGout,\"Urate crystals, negatively birefringent\"\n").unwrap();

    let (stdout, _, success) = run_medprep(&config_path, &["extract", csv.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("Gout Urate crystals, negatively birefringent"));

    let (stdout, _, success) = run_medprep(
        &config_path,
        &["extract", tmp.path().join("gone.pdf").to_str().unwrap()],
    );
    assert!(success);
    assert!(stdout.starts_with("[missing file]"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "\n[chunking]\nmax_words = 0\n");

    let (_, stderr, success) = run_medprep(&config_path, &["predict"]);
    assert!(!success);
    assert!(stderr.contains("max_words"));
}
