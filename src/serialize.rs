//! Portable binary persistence: a tag–length–value framing with
//! a dictionary header (ordered PIDs, root last), `minSup`/option flags, and
//! a pre-order tree stream. Fixed-width fields use `zerocopy`-derived
//! little-endian header structs, the same pattern `types/prefix_id.rs` and
//! `lsm_tree/mod.rs` use for their own on-disk records (`PrefixId`,
//! `ZeroCopyRecord`), with length-prefixed UTF-8 bytes for the one
//! variable-length field (property names).

use std::collections::HashMap;
use std::io::{Read, Write};

use zerocopy::byteorder::little_endian::U32 as LeU32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::builder::TYPE_PREFIX;
use crate::dictionary::{Pid, PropertyDictionary};
use crate::errors::{FatalError, PropertyStoreError};
use crate::tree::{NodeId, SchemaTree};

/// Rejects the legacy format (no sentinel root, no magic/version prefix)
///
const MAGIC: [u8; 8] = *b"SCHTREE1";
const FORMAT_VERSION: u32 = 1;
const TYPED_FLAG: u32 = 1 << 0;

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy)]
#[repr(C)]
struct FileHeader {
    magic: [u8; 8],
    version: LeU32,
    dict_len: LeU32,
    min_sup: LeU32,
    flags: LeU32,
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy)]
#[repr(C)]
struct DictRecordHeader {
    name_len: LeU32,
    total_count: LeU32,
    sort_order: LeU32,
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy)]
#[repr(C)]
struct NodeHeader {
    sort_order: LeU32,
    support: LeU32,
    child_count: LeU32,
}

fn io_err(context: &str, err: std::io::Error) -> FatalError {
    FatalError(PropertyStoreError::SerializationCorrupt(format!(
        "{context}: {err}"
    )))
}

/// Writes `tree` to `writer` in the persisted format.
pub fn save(tree: &SchemaTree, writer: &mut impl Write) -> Result<(), FatalError> {
    let dict = tree.dictionary();
    let all_pids = dict.list();
    let root_pid = tree.root_pid();
    let ordered: Vec<Pid> = all_pids
        .iter()
        .copied()
        .filter(|&p| p != root_pid)
        .chain(std::iter::once(root_pid))
        .collect();

    let header = FileHeader {
        magic: MAGIC,
        version: LeU32::new(FORMAT_VERSION),
        dict_len: LeU32::new(ordered.len() as u32),
        min_sup: LeU32::new(tree.min_sup()),
        flags: LeU32::new(if tree.typed() { TYPED_FLAG } else { 0 }),
    };
    writer
        .write_all(header.as_bytes())
        .map_err(|e| io_err("writing file header", e))?;

    for pid in &ordered {
        let record = dict.record(*pid);
        let name = record.name().as_bytes();
        let record_header = DictRecordHeader {
            name_len: LeU32::new(name.len() as u32),
            total_count: LeU32::new(record.total_count()),
            sort_order: LeU32::new(record.sort_order()),
        };
        writer
            .write_all(record_header.as_bytes())
            .map_err(|e| io_err("writing dictionary record header", e))?;
        writer
            .write_all(name)
            .map_err(|e| io_err("writing property name", e))?;
    }

    write_node(tree, tree.root(), writer)?;
    Ok(())
}

fn write_node(tree: &SchemaTree, node: NodeId, writer: &mut impl Write) -> Result<(), FatalError> {
    let data = tree.node(node);
    let sort_order = tree.dictionary().record(data.pid()).sort_order();
    let children = data.children();
    let node_header = NodeHeader {
        sort_order: LeU32::new(sort_order),
        support: LeU32::new(data.support()),
        child_count: LeU32::new(children.len() as u32),
    };
    writer
        .write_all(node_header.as_bytes())
        .map_err(|e| io_err("writing node header", e))?;
    for child in children {
        write_node(tree, child, writer)?;
    }
    Ok(())
}

/// Reads a tree previously written by [`save`]. Rejects files whose magic or
/// version doesn't match (including any legacy format without this
/// sentinel).
pub fn load(reader: &mut impl Read) -> Result<SchemaTree, FatalError> {
    let header = read_struct::<FileHeader>(reader, "file header")?;
    if header.magic != MAGIC {
        return Err(FatalError(PropertyStoreError::SerializationCorrupt(
            "missing magic/sentinel root — legacy or foreign format".to_string(),
        )));
    }
    if header.version.get() != FORMAT_VERSION {
        return Err(FatalError(PropertyStoreError::SerializationCorrupt(
            format!("unsupported format version {}", header.version.get()),
        )));
    }

    let dict = PropertyDictionary::new();
    let dict_len = header.dict_len.get() as usize;
    let mut sort_order_to_pid: HashMap<u32, Pid> = HashMap::with_capacity(dict_len);
    let mut root_pid = Pid::NONE;

    for i in 0..dict_len {
        let record_header = read_struct::<DictRecordHeader>(reader, "dictionary record header")?;
        let mut name_bytes = vec![0u8; record_header.name_len.get() as usize];
        reader
            .read_exact(&mut name_bytes)
            .map_err(|e| io_err("reading property name", e))?;
        let name = String::from_utf8(name_bytes).map_err(|e| {
            FatalError(PropertyStoreError::SerializationCorrupt(format!(
                "property name is not valid UTF-8: {e}"
            )))
        })?;

        let is_type = name.starts_with(TYPE_PREFIX);
        let pid = dict.get_or_create(&name, is_type);
        dict.record(pid).set_total_count(record_header.total_count.get());
        dict.record(pid).set_sort_order(record_header.sort_order.get());
        sort_order_to_pid.insert(record_header.sort_order.get(), pid);

        if i == dict_len - 1 {
            root_pid = pid;
        }
    }
    if root_pid.is_none() {
        return Err(FatalError(PropertyStoreError::SerializationCorrupt(
            "empty dictionary header has no sentinel root".to_string(),
        )));
    }

    let typed = header.flags.get() & TYPED_FLAG != 0;
    let tree = SchemaTree::from_decoded_dictionary(dict, root_pid, header.min_sup.get(), typed);

    let root_header = read_struct::<NodeHeader>(reader, "root node header")?;
    tree.set_node_support(tree.root(), root_header.support.get());
    read_children(&tree, tree.root(), root_header.child_count.get(), reader, &sort_order_to_pid)?;

    Ok(tree)
}

fn read_children(
    tree: &SchemaTree,
    parent: NodeId,
    count: u32,
    reader: &mut impl Read,
    sort_order_to_pid: &HashMap<u32, Pid>,
) -> Result<(), FatalError> {
    for _ in 0..count {
        let node_header = read_struct::<NodeHeader>(reader, "node header")?;
        let pid = *sort_order_to_pid
            .get(&node_header.sort_order.get())
            .ok_or_else(|| {
                FatalError(PropertyStoreError::SerializationCorrupt(format!(
                    "node references unknown sort order {}",
                    node_header.sort_order.get()
                )))
            })?;
        let child = tree.insert_decoded_child(parent, pid, node_header.support.get());
        read_children(tree, child, node_header.child_count.get(), reader, sort_order_to_pid)?;
    }
    Ok(())
}

fn read_struct<T: FromBytes + KnownLayout + Immutable>(
    reader: &mut impl Read,
    context: &str,
) -> Result<T, FatalError> {
    let mut buf = vec![0u8; std::mem::size_of::<T>()];
    reader
        .read_exact(&mut buf)
        .map_err(|e| io_err(context, e))?;
    T::read_from_bytes(&buf).map_err(|_| {
        FatalError(PropertyStoreError::SerializationCorrupt(format!(
            "malformed {context}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_tree, BuildOptions};
    use crate::recommend::recommend;
    use crate::transactions::LineDelimitedReaderSource;
    use std::io::{BufRead, Cursor};

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
    fn round_trip_preserves_recommendations() {
        let tree = corpus_tree();
        let mut buf = Vec::new();
        save(&tree, &mut buf).unwrap();

        let loaded = load(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded.support(), tree.support());
        assert_eq!(loaded.min_sup(), tree.min_sup());
        assert_eq!(loaded.typed(), tree.typed());

        for name in ["a", "b", "c", "d", "e"] {
            let original_pid = tree.dictionary().get(name).unwrap();
            let loaded_pid = loaded.dictionary().get(name).unwrap();
            assert_eq!(
                tree.dictionary().record(original_pid).total_count(),
                loaded.dictionary().record(loaded_pid).total_count()
            );
        }

        let query = vec![loaded.dictionary().get("a").unwrap(), loaded.dictionary().get("b").unwrap()];
        let recs = recommend(&loaded, &query, false);
        assert!(!recs.is_empty());
    }

    #[test]
    fn rejects_missing_magic() {
        let garbage = vec![0u8; 64];
        let err = load(&mut Cursor::new(garbage)).unwrap_err();
        assert!(matches!(err.0, PropertyStoreError::SerializationCorrupt(_)));
    }
}
