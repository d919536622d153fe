use crate::byte_supplier::{ByteSupplier, FileByteSupplier, MemoryByteSupplier};
use crate::error::Error;

#[test]
fn test_memory_supplier_returns_stored_bytes() {
    let supplier = MemoryByteSupplier::new().with("shaders/a.spv", vec![1, 2, 3, 4]);
    assert_eq!(supplier.load_bytes("shaders/a.spv").unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_memory_supplier_missing_path_is_not_found() {
    let supplier = MemoryByteSupplier::new();
    assert_eq!(
        supplier.load_bytes("nope.spv"),
        Err(Error::NotFound("nope.spv".to_string()))
    );
}

#[test]
fn test_memory_supplier_remove() {
    let supplier = MemoryByteSupplier::new();
    supplier.insert("a", vec![0]);
    assert!(supplier.remove("a"));
    assert!(!supplier.remove("a"));
    assert!(supplier.load_bytes("a").is_err());
}

#[test]
fn test_file_supplier_reads_relative_to_root() {
    let dir = std::env::temp_dir().join(format!("thinframe_bytes_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("shader.spv"), [3u8, 2, 35, 7]).unwrap();

    let supplier = FileByteSupplier::new(&dir);
    assert_eq!(supplier.root(), dir.as_path());
    assert_eq!(supplier.load_bytes("shader.spv").unwrap(), vec![3, 2, 35, 7]);
    assert!(matches!(supplier.load_bytes("missing.spv"), Err(Error::NotFound(_))));

    std::fs::remove_dir_all(&dir).unwrap();
}
