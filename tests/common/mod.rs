#![allow(dead_code)]

use concepts::SyncConfig;
use serde_json::{json, Value};
use std::path::Path;

pub fn concept_json(id: &str, label: &str, parents: &[&str], related: &[&str]) -> Value {
    json!({
        "wikibase_id": id,
        "preferred_label": label,
        "alternative_labels": [format!("{label} (alt)")],
        "negative_labels": [],
        "description": format!("Description of {label}"),
        "definition": null,
        "labelled_passages": [{"text": format!("a passage about {label}"), "spans": []}],
        "subconcept_of": parents,
        "related_concepts": related,
        "has_subconcept": []
    })
}

/// Writes a small bucket layout under `root/concepts/`.
pub fn seed_bucket(root: &Path) {
    let dir = root.join("concepts");
    std::fs::create_dir_all(&dir).unwrap();

    let documents = [
        concept_json("Q1", "Extreme weather", &[], &["Q4"]),
        concept_json("Q2", "Flood", &["Q1"], &["Q3"]),
        concept_json("Q3", "Flood risk", &["Q2"], &["Q2"]),
        concept_json("Q4", "Drought", &["Q1", "Q999"], &["Q1", "Q998"]),
    ];
    for document in documents {
        let id = document["wikibase_id"].as_str().unwrap().to_string();
        std::fs::write(
            dir.join(format!("{id}.json")),
            serde_json::to_vec_pretty(&document).unwrap(),
        )
        .unwrap();
    }
}

pub fn sync_config(download_dir: &Path, database: &Path) -> SyncConfig {
    SyncConfig {
        bucket: "test-bucket".to_string(),
        prefix: "concepts".to_string(),
        region: "eu-west-1".to_string(),
        endpoint_url: None,
        download_dir: download_dir.to_str().unwrap().to_string(),
        database_path: database.to_str().unwrap().to_string(),
        concurrent_downloads: 2,
    }
}
