use chrono::{Local, SecondsFormat};
use log::{Log, Metadata, Record};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;

enum Sink {
    Console,
    File(File),
}

/// process wide `log` backend, sinks can be added at any time
pub struct Logger {
    sinks: Mutex<Vec<Sink>>,
}

static G_LOGGER: Lazy<Logger> = Lazy::new(|| Logger {
    sinks: Mutex::new(Vec::new()),
});

impl Logger {
    /// register the backend, calling it more than once is harmless
    pub fn init() -> &'static Logger {
        let l: &'static Logger = &G_LOGGER;
        let _ = log::set_logger(l);
        l
    }

    pub fn add_console(&self) -> &Self {
        self.sinks.lock().push(Sink::Console);
        self
    }

    /// append to `path`, or start it over when `trunc` is set
    pub fn add_file(&self, path: &str, trunc: bool) -> &Self {
        let f = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!trunc)
            .truncate(trunc)
            .open(path);
        match f {
            Ok(f) => self.sinks.lock().push(Sink::File(f)),
            Err(e) => eprintln!("can't open log file {} error {}", path, e),
        }
        self
    }

    fn format(record: &Record<'_>) -> String {
        format!(
            "{} {:<5} {} {}\n",
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        let mut sinks = self.sinks.lock();
        for s in sinks.iter_mut() {
            match s {
                Sink::Console => {
                    let _ = std::io::stderr().write_all(line.as_bytes());
                }
                Sink::File(f) => {
                    let _ = f.write_all(line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        let mut sinks = self.sinks.lock();
        for s in sinks.iter_mut() {
            if let Sink::File(f) = s {
                let _ = f.flush();
            }
        }
    }
}
