use bot_core::{WalletRecord, WalletStore};
use tempfile::tempdir;

fn record(n: usize) -> WalletRecord {
    WalletRecord {
        address: format!("0x{:040x}", n),
        private_key: format!("0x{:064x}", n),
        session_id: Some(format!("sess-{}", n)),
    }
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempdir().unwrap();
    let store = WalletStore::new(dir.path().join("wallets.json"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn append_preserves_existing_entries() {
    let dir = tempdir().unwrap();
    let store = WalletStore::new(dir.path().join("wallets.json"));

    for n in 0..3 {
        store.append(record(n)).unwrap();
    }
    assert_eq!(store.load().unwrap().len(), 3);

    store.append(record(3)).unwrap();

    let records = store.load().unwrap();
    assert_eq!(records.len(), 4);
    for (n, rec) in records.iter().enumerate() {
        assert_eq!(rec.address, format!("0x{:040x}", n));
        assert_eq!(rec.session_id.as_deref(), Some(format!("sess-{}", n).as_str()));
    }
}

#[test]
fn on_disk_format_uses_camel_case() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wallets.json");
    let store = WalletStore::new(&path);
    store.append(record(1)).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"privateKey\""));
    assert!(raw.contains("\"sessionId\""));
}

#[test]
fn debug_redacts_private_key() {
    let printed = format!("{:?}", record(7));
    assert!(!printed.contains(&format!("0x{:064x}", 7)));
    assert!(printed.contains("REDACTED"));
}
