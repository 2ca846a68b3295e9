use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, Default)]
pub struct StatsSnapshot {
    pub write_calls: u64,
    pub write_bytes: u64,
    pub load_calls: u64,
    pub load_bytes: u64,
    pub flush_calls: u64,
    pub flush_bytes: u64,
    pub flush_ns: u64,
    pub flush_errors: u64,
}

struct IoStats {
    write_calls: AtomicU64,
    write_bytes: AtomicU64,
    load_calls: AtomicU64,
    load_bytes: AtomicU64,
    flush_calls: AtomicU64,
    flush_bytes: AtomicU64,
    flush_ns: AtomicU64,
    flush_errors: AtomicU64,
}

impl IoStats {
    const fn new() -> Self {
        Self {
            write_calls: AtomicU64::new(0),
            write_bytes: AtomicU64::new(0),
            load_calls: AtomicU64::new(0),
            load_bytes: AtomicU64::new(0),
            flush_calls: AtomicU64::new(0),
            flush_bytes: AtomicU64::new(0),
            flush_ns: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
        }
    }
}

static IO_STATS: IoStats = IoStats::new();

pub(crate) fn record_write(bytes: usize) {
    if bytes == 0 {
        return;
    }
    IO_STATS.write_calls.fetch_add(1, Ordering::Relaxed);
    IO_STATS.write_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub(crate) fn record_load(bytes: usize) {
    IO_STATS.load_calls.fetch_add(1, Ordering::Relaxed);
    IO_STATS.load_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub(crate) fn record_flush(bytes: u64, ns: u64, ok: bool) {
    IO_STATS.flush_calls.fetch_add(1, Ordering::Relaxed);
    IO_STATS.flush_bytes.fetch_add(bytes, Ordering::Relaxed);
    IO_STATS.flush_ns.fetch_add(ns, Ordering::Relaxed);
    if !ok {
        IO_STATS.flush_errors.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn snapshot() -> StatsSnapshot {
    StatsSnapshot {
        write_calls: IO_STATS.write_calls.load(Ordering::Relaxed),
        write_bytes: IO_STATS.write_bytes.load(Ordering::Relaxed),
        load_calls: IO_STATS.load_calls.load(Ordering::Relaxed),
        load_bytes: IO_STATS.load_bytes.load(Ordering::Relaxed),
        flush_calls: IO_STATS.flush_calls.load(Ordering::Relaxed),
        flush_bytes: IO_STATS.flush_bytes.load(Ordering::Relaxed),
        flush_ns: IO_STATS.flush_ns.load(Ordering::Relaxed),
        flush_errors: IO_STATS.flush_errors.load(Ordering::Relaxed),
    }
}
