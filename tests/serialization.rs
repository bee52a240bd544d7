//! Round-trip persistence tests against real files (the in-module tests in
//! `src/serialize.rs` exercise the format against in-memory buffers; these
//! exercise the same code path through actual file I/O via `tempfile`).

use std::io::{BufRead, BufReader, BufWriter, Cursor};

use schema_rec::builder::{build_tree, BuildOptions};
use schema_rec::recommend::recommend;
use schema_rec::serialize::{load, save};
use schema_rec::transactions::LineDelimitedReaderSource;
use schema_rec::tree::SchemaTree;

mod common {
    pub fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

fn corpus_tree() -> SchemaTree {
    let source = LineDelimitedReaderSource::new(|| {
        let data: Box<dyn BufRead> = Box::new(Cursor::new(
            b"a b c d\na b c e\na b c\na b d\nb e\na b c\n".to_vec(),
        ));
        data
    });
    build_tree(&source, BuildOptions::default()).unwrap()
}

#[test]
fn round_trip_through_a_real_file_preserves_recommendations() {
    common::init();
    let tree = corpus_tree();
    let original = recommend(&tree, &[tree.dictionary().get("a").unwrap()], false);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corpus.schematree");

    {
        let file = std::fs::File::create(&path).unwrap();
        save(&tree, &mut BufWriter::new(file)).unwrap();
    }

    let file = std::fs::File::open(&path).unwrap();
    let loaded = load(&mut BufReader::new(file)).unwrap();
    let reloaded = recommend(&loaded, &[loaded.dictionary().get("a").unwrap()], false);

    assert_eq!(original.len(), reloaded.len());
    for (a, b) in original.iter().zip(reloaded.iter()) {
        assert_eq!(
            tree.dictionary().record(a.pid).name(),
            loaded.dictionary().record(b.pid).name()
        );
        assert!((a.probability - b.probability).abs() < 1e-9);
    }
}

#[test]
fn node_and_dictionary_sizes_survive_the_round_trip() {
    common::init();
    let tree = corpus_tree();
    let mut buf = Vec::new();
    save(&tree, &mut buf).unwrap();
    let loaded = load(&mut Cursor::new(buf)).unwrap();

    assert_eq!(tree.node_count(), loaded.node_count());
    assert_eq!(tree.dictionary().len(), loaded.dictionary().len());
}
