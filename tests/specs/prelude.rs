//! Shared rig pieces for the behavioral specs.

use medulla_adapters::FakeProbe;
use medulla_core::{FakeClock, MemoryRecord, SequentialIdGen};
use medulla_storage::{run_migrations, Store};
use std::sync::Arc;

pub fn store() -> Store {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    store
}

pub fn clock() -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_755_000_000_000);
    clock
}

pub fn idgen(prefix: &str) -> SequentialIdGen {
    SequentialIdGen::new(prefix)
}

pub fn probe(source_id: &str) -> Arc<FakeProbe> {
    Arc::new(FakeProbe::new(source_id, 30_000))
}

pub fn memory(id: &str, content: &str, categories: &[&str], importance: f64) -> MemoryRecord {
    MemoryRecord {
        id: id.into(),
        content: content.into(),
        categories: categories.iter().map(|s| s.to_string()).collect(),
        importance,
        timestamp: 1_000,
        compressed_from: None,
        archived_by: None,
    }
}
