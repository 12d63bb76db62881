mod helpers;

use helpers::{atom_path, ingest, test_store};

use aku::aku::{serialize_aku, AkuFilter, IngestInput, KnowledgeType, SourceKind, Volatility};
use aku::hash::{is_valid_hash, ContentHash};

#[test]
fn ingest_returns_valid_hash_and_persists_atom() {
    let (dir, substrate, _) = test_store();

    let hash = ingest(&substrate, "Persistent knowledge", "test/write");

    assert!(is_valid_hash(hash.as_str()));
    assert!(atom_path(dir.path(), &hash).exists());
    assert!(substrate.exists(&hash));
}

#[test]
fn ingest_twice_stores_one_file() {
    let (dir, substrate, _) = test_store();

    let first = ingest(&substrate, "Duplicate knowledge", "test/dedup");
    let second = ingest(&substrate, "Duplicate knowledge", "test/dedup");

    assert_eq!(first, second);

    // Exactly one file under atoms/, regardless of how often it was ingested.
    let mut atom_files = 0usize;
    for shard in std::fs::read_dir(dir.path().join("atoms")).unwrap() {
        let shard = shard.unwrap();
        if shard.file_type().unwrap().is_dir() {
            atom_files += std::fs::read_dir(shard.path()).unwrap().count();
        }
    }
    assert_eq!(atom_files, 1);
}

#[test]
fn stored_atom_round_trips_exactly() {
    let (dir, substrate, _) = test_store();

    let hash = substrate
        .ingest(IngestInput {
            body: "# Title\n\nBody with trailing spaces   \r\nand CRLF endings\r\n".to_string(),
            domain: "test/roundtrip".to_string(),
            knowledge_type: Some(KnowledgeType::Procedure),
            tags: Some(vec!["b-tag".to_string(), "a-tag".to_string()]),
            confidence: Some(0.65),
            volatility: Some(Volatility::Stable),
            ..Default::default()
        })
        .unwrap();

    let atom = substrate.get(&hash).unwrap().unwrap();
    assert_eq!(atom.id, hash);
    assert_eq!(atom.meta.knowledge_type, KnowledgeType::Procedure);
    assert_eq!(atom.meta.volatility, Volatility::Stable);
    assert!((atom.meta.confidence - 0.65).abs() < f64::EPSILON);
    // Body was normalized before hashing and storage.
    assert_eq!(atom.body, "# Title\n\nBody with trailing spaces\nand CRLF endings");

    // The file on disk is exactly the serialized form of what get() returns.
    let on_disk = std::fs::read_to_string(atom_path(dir.path(), &hash)).unwrap();
    assert_eq!(on_disk, serialize_aku(&atom).unwrap());
}

#[test]
fn defaults_come_from_config() {
    let (_dir, substrate, _) = test_store();

    let hash = ingest(&substrate, "Uses every default", "test/defaults");
    let atom = substrate.get(&hash).unwrap().unwrap();

    assert_eq!(atom.meta.knowledge_type, KnowledgeType::Fact);
    assert!((atom.meta.confidence - 0.8).abs() < f64::EPSILON);
    assert_eq!(atom.meta.volatility, Volatility::Evolving);
    assert_eq!(atom.meta.source.kind, SourceKind::User);
    assert!(!atom.meta.created.is_empty());
    assert!(!atom.meta.source.timestamp.is_empty());
}

#[test]
fn malformed_hash_strings_are_rejected() {
    for bad in [
        "not-a-hash",
        "ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789",
        "abc123",
        "",
    ] {
        assert!(ContentHash::parse(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn get_absent_hash_returns_none() {
    let (_dir, substrate, _) = test_store();
    let absent = aku::hash::hash_string("nothing stored under this");
    assert!(substrate.get(&absent).unwrap().is_none());
}

#[test]
fn latest_head_and_domain_log_are_written() {
    let (dir, substrate, _) = test_store();

    let hash = ingest(&substrate, "head pointer test", "physics/thermo");

    let latest = std::fs::read_to_string(dir.path().join("heads").join("latest")).unwrap();
    assert_eq!(latest.trim(), hash.as_str());

    let domain_log =
        std::fs::read_to_string(dir.path().join("heads").join("domains").join("physics")).unwrap();
    assert_eq!(domain_log.trim(), hash.as_str());

    assert_eq!(substrate.head("latest").unwrap(), Some(hash));
}

#[test]
fn wal_records_pending_then_committed() {
    let (dir, substrate, _) = test_store();

    let hash = ingest(&substrate, "wal test", "test/wal");

    let wal = std::fs::read_to_string(dir.path().join("WAL").join("pending.jsonl")).unwrap();
    let lines: Vec<&str> = wal.lines().collect();
    assert_eq!(lines.len(), 2);

    let pending: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    let committed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(pending["status"], "pending");
    assert_eq!(committed["status"], "committed");
    assert_eq!(pending["hash"], hash.as_str());
    assert_eq!(committed["hash"], hash.as_str());
}

#[test]
fn store_skeleton_is_created() {
    let (dir, _substrate, _) = test_store();

    let version = std::fs::read_to_string(dir.path().join(".aku").join("version")).unwrap();
    assert_eq!(version.trim(), "1");
    assert!(dir.path().join(".aku").join("config.yaml").exists());

    let gitignore =
        std::fs::read_to_string(dir.path().join("indexes").join(".gitignore")).unwrap();
    assert_eq!(gitignore, "*\n!.gitignore\n");
}

#[test]
fn list_filters_and_pages() {
    let (_dir, substrate, _) = test_store();

    let mut hashes = Vec::new();
    for i in 0..4 {
        hashes.push(ingest(&substrate, &format!("fact {i}"), "test/list"));
    }
    ingest(&substrate, "other domain", "elsewhere/list");

    let in_domain = substrate
        .list(AkuFilter {
            domain_prefix: Some("test".to_string()),
            ..Default::default()
        })
        .count();
    assert_eq!(in_domain, 4);

    let paged: Vec<ContentHash> = substrate
        .list(AkuFilter {
            domain_prefix: Some("test".to_string()),
            offset: Some(2),
            limit: Some(10),
            ..Default::default()
        })
        .collect();
    assert_eq!(paged.len(), 2);

    let confident = substrate
        .list(AkuFilter {
            min_confidence: Some(0.9),
            ..Default::default()
        })
        .count();
    assert_eq!(confident, 0, "default confidence 0.8 is below the 0.9 floor");
}

#[test]
fn reopen_preserves_store() {
    let (dir, substrate, _) = test_store();
    let hash = ingest(&substrate, "survives reopen", "test/reopen");
    drop(substrate);

    let reopened = aku::substrate::Substrate::open(dir.path()).unwrap();
    let atom = reopened.get(&hash).unwrap().unwrap();
    assert_eq!(atom.body, "survives reopen");
}
