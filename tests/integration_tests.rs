use biorempp::core::progress::{ProcessingStage, ProgressTracker};
use biorempp::core::session::SessionStore;
use biorempp::core::ConfigProvider;
use biorempp::utils::validation::Validate;
use biorempp::{
    BioremError, BioremPipeline, CliConfig, EtlEngine, LocalStorage, ReferenceKind, TomlConfig,
};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const UPLOAD: &str = ">GenomeA\nK00001\nK00002\nK00001\n>GenomeB\nK00003\nK00010\n";

const BIOREMPP_DB: &str = "ko;genesymbol;genename;cpd;compoundclass;referenceAG;compoundname;enzyme_activity\n\
K00001;adh;alcohol dehydrogenase;C00469;Aliphatic;EPA;Ethanol;oxidoreductase\n\
K00001;adh;alcohol dehydrogenase;C00146;Aromatic;IARC;Phenol;oxidoreductase\n\
K00003;hom;homoserine dehydrogenase;C01319;Metal;ATSDR;Mercury;reductase\n";

const HADEG_DB: &str = "Gene;ko;Pathway;compound_pathway\n\
alkB;K00001;A_Terminal_oxidation;Alkanes\n\
almA;K00010;A_Subterminal_oxidation;Alkanes\n";

const KEGG_DB: &str = "ko;pathname;genesymbol\n\
K00001;Naphthalene degradation;adh\n\
K00002;Aminobenzoate degradation;akr\n";

const TOXCSM_DB: &str = "SMILES;cpd;ChEBI;compoundname;label_NR_AR;value_NR_AR\n\
CCO;C00469;16236;ethanol;Low Safety;0.71\n\
Oc1ccccc1;C00146;15882;phenol;High Safety;0.12\n";

struct Fixture {
    _temp_dir: TempDir,
    input: String,
    refs: String,
    output: String,
}

fn fixture(upload: &str) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let refs = root.join("data");
    std::fs::create_dir_all(&refs).unwrap();
    std::fs::write(refs.join("database_biorempp.csv"), BIOREMPP_DB).unwrap();
    std::fs::write(refs.join("database_hadeg.csv"), HADEG_DB).unwrap();
    std::fs::write(refs.join("database_kegg.csv"), KEGG_DB).unwrap();
    std::fs::write(refs.join("database_toxcsm.csv"), TOXCSM_DB).unwrap();

    let input = root.join("upload.txt");
    std::fs::write(&input, upload).unwrap();

    Fixture {
        input: input.to_str().unwrap().to_string(),
        refs: refs.to_str().unwrap().to_string(),
        output: root.join("output").to_str().unwrap().to_string(),
        _temp_dir: temp_dir,
    }
}

fn cli_config(fx: &Fixture, formats: &[&str], bundle: bool) -> CliConfig {
    CliConfig {
        input: Some(fx.input.clone()),
        references_dir: fx.refs.clone(),
        output_path: fx.output.clone(),
        formats: formats.iter().map(|f| f.to_string()).collect(),
        analyses: vec![],
        bundle,
        max_samples: 100,
        max_kos: 500_000,
        delimiter: ";".to_string(),
        config: None,
        verbose: false,
        monitor: false,
        json_logs: false,
    }
}

fn read_output(fx: &Fixture, name: &str) -> String {
    std::fs::read_to_string(Path::new(&fx.output).join(name)).unwrap()
}

#[tokio::test]
async fn test_end_to_end_csv_and_json() {
    let fx = fixture(UPLOAD);
    let config = cli_config(&fx, &["csv", "json"], false);
    assert!(config.validate().is_ok());

    let storage = LocalStorage::new(fx.output.clone());
    let pipeline = BioremPipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    let report = engine.run().await.unwrap();

    // 4 個合併結果 + 6 個預設分析，各 2 種格式
    assert_eq!(report.written_files.len(), 20);
    assert_eq!(report.output_dir, fx.output);

    let biorempp = read_output(&fx, "biorempp_results.csv");
    let mut lines = biorempp.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Sample,KO,genesymbol,genename,cpd,compoundclass,referenceAG,compoundname,enzyme_activity"
    );
    // GenomeA 有兩次 K00001，各展開為 2 列；GenomeB 的 K00003 1 列
    assert_eq!(lines.count(), 5);

    let toxcsm = read_output(&fx, "toxcsm_results.csv");
    assert!(toxcsm.contains("Low Safety"));
    assert!(!toxcsm.contains("C01319"));

    let summary: serde_json::Value =
        serde_json::from_str(&read_output(&fx, "sample_summary.json")).unwrap();
    assert_eq!(summary[0]["Sample"], "GenomeA");
    assert_eq!(summary[0]["total_kos"], "3");
    assert_eq!(summary[0]["unique_kos"], "2");
    assert_eq!(summary[1]["biorempp_matched_kos"], "1");

    let hadeg = read_output(&fx, "hadeg_pathways.csv");
    assert!(hadeg.contains("GenomeB,A_Subterminal_oxidation,1"));
}

#[tokio::test]
async fn test_end_to_end_bundle_with_excel() {
    let fx = fixture(UPLOAD);
    let mut config = cli_config(&fx, &["xlsx"], true);
    config.analyses = vec!["toxicity:label_NR_AR".to_string()];
    assert!(config.validate().is_ok());

    let pipeline = BioremPipeline::new(LocalStorage::new(fx.output.clone()), config);
    let report = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(report.written_files, vec!["biorempp_results.zip".to_string()]);

    let bytes = std::fs::read(Path::new(&fx.output).join("biorempp_results.zip")).unwrap();
    let mut bundle = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(bundle.len(), 5);

    let mut workbook_bytes = Vec::new();
    bundle
        .by_name("toxicity_label_NR_AR.xlsx")
        .unwrap()
        .read_to_end(&mut workbook_bytes)
        .unwrap();

    let mut workbook = zip::ZipArchive::new(std::io::Cursor::new(workbook_bytes)).unwrap();
    let mut sheet = String::new();
    workbook
        .by_name("xl/worksheets/sheet1.xml")
        .unwrap()
        .read_to_string(&mut sheet)
        .unwrap();
    assert!(sheet.contains("label_NR_AR"));
    assert!(sheet.contains("High Safety"));
}

#[tokio::test]
async fn test_invalid_upload_is_reported() {
    let fx = fixture(">GenomeA\nK00001\nnot-a-ko\n");
    let config = cli_config(&fx, &["csv"], false);

    let pipeline = BioremPipeline::new(LocalStorage::new(fx.output.clone()), config);
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, BioremError::Upload { line: 3, .. }));
    assert!(!Path::new(&fx.output).join("biorempp_results.csv").exists());
}

#[tokio::test]
async fn test_sample_limit_from_config() {
    let fx = fixture(UPLOAD);
    let mut config = cli_config(&fx, &["csv"], false);
    config.max_samples = 1;

    let pipeline = BioremPipeline::new(LocalStorage::new(fx.output.clone()), config);
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();
    assert!(matches!(err, BioremError::LimitExceeded { limit: 1, .. }));
}

#[tokio::test]
async fn test_toml_config_drives_pipeline() {
    let fx = fixture(UPLOAD);
    let content = format!(
        r#"
[input]
file = "{}"

[references]
dir = "{}"

[output]
path = "{}"
formats = ["csv"]

[analysis]
enabled = ["compounds_per_sample"]
"#,
        fx.input, fx.refs, fx.output
    );

    let config = TomlConfig::from_toml_str(&content).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.analyses().len(), 1);

    let pipeline = BioremPipeline::new(LocalStorage::new(fx.output.clone()), config);
    let report = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(report.written_files.len(), 5);
    let ranking = read_output(&fx, "compounds_per_sample.csv");
    assert_eq!(
        ranking,
        "Sample,compound_count\nGenomeA,2\nGenomeB,1\n"
    );
}

#[tokio::test]
async fn test_progress_reaches_done() {
    let fx = fixture(UPLOAD);
    let config = cli_config(&fx, &["csv"], false);

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let mut tracker = ProgressTracker::new();
    tracker.subscribe(move |update| sink.lock().unwrap().push(update.stage));

    let pipeline =
        BioremPipeline::with_tracker(LocalStorage::new(fx.output.clone()), config, tracker);
    EtlEngine::new(pipeline).run().await.unwrap();

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&ProcessingStage::Validating));
    assert_eq!(stages.last(), Some(&ProcessingStage::Done));
    assert!(stages.contains(&ProcessingStage::MergingToxcsm));
    assert!(stages.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_results_can_be_cached_per_session() {
    use biorempp::core::Pipeline;

    let fx = fixture(UPLOAD);
    let config = cli_config(&fx, &["csv"], false);
    let pipeline = BioremPipeline::new(LocalStorage::new(fx.output.clone()), config);

    let dataset = pipeline.extract().await.unwrap();
    let results = pipeline.transform(dataset.clone()).await.unwrap();

    let store = SessionStore::default();
    let session_id = store.insert(&dataset, results).unwrap();

    let entry = store.get(&session_id).unwrap().unwrap();
    assert_eq!(entry.dataset().unwrap(), dataset);
    assert_eq!(
        entry
            .results
            .merge(ReferenceKind::Kegg)
            .unwrap()
            .stats
            .matched_keys,
        2
    );
}

#[tokio::test]
async fn test_engine_can_run_twice() {
    let fx = fixture(UPLOAD);
    let config = cli_config(&fx, &["csv"], false);

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let mut tracker = ProgressTracker::new();
    tracker.subscribe(move |update| sink.lock().unwrap().push(update.stage));

    let pipeline =
        BioremPipeline::with_tracker(LocalStorage::new(fx.output.clone()), config, tracker);
    let engine = EtlEngine::new(pipeline);

    let first = engine.run().await.unwrap();
    let second = engine.run().await.unwrap();
    assert_eq!(first.written_files, second.written_files);

    let stages = stages.lock().unwrap();
    let done = stages
        .iter()
        .filter(|s| **s == ProcessingStage::Done)
        .count();
    assert_eq!(done, 2);
}

#[tokio::test]
async fn test_repeated_analysis_is_bundled_once() {
    let fx = fixture(UPLOAD);
    let mut config = cli_config(&fx, &["csv"], true);
    config.analyses = vec!["kegg_pathways".to_string(), "kegg_pathways".to_string()];
    assert!(config.validate().is_ok());

    let pipeline = BioremPipeline::new(LocalStorage::new(fx.output.clone()), config);
    let report = EtlEngine::new(pipeline).run().await.unwrap();
    assert_eq!(report.written_files, vec!["biorempp_results.zip".to_string()]);

    let bytes = std::fs::read(Path::new(&fx.output).join("biorempp_results.zip")).unwrap();
    let bundle = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    // 4 個合併結果 + 1 個分析
    assert_eq!(bundle.len(), 5);
}
