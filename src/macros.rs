// src/macros.rs

/// Emit one status line through the `log` facade.
///
/// The component doubles as the record target, and the message is prefixed
/// with `[timestamp][LEVEL][component][pid=..][tid=..]` so every line in a run
/// can be correlated without a custom formatter. The expansion is an
/// expression, so it can stand alone in a `match` arm.
///
/// ```ignore
/// use log::Level;
/// svcguard::svcguard_log!(Level::Info, "enumerator", "Found {} service(s)", 12);
/// ```
///
/// `[2026-10-18T16:32:10+02:00][INFO][enumerator][pid=4568][tid=ThreadId(1)] Found 12 service(s)`
#[macro_export]
macro_rules! svcguard_log {
    ($level:expr, $component:expr, $fmt:expr $(, $($arg:tt)+)?) => {
        log::log!(
            target: $component,
            $level,
            concat!("[{}][{}][", $component, "][pid={}][tid={:?}] ", $fmt),
            chrono::Local::now().to_rfc3339(),
            $level,
            std::process::id(),
            std::thread::current().id()
            $(, $($arg)+)?
        )
    };
}

#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;

    /// Keeps `target|message` lines in memory.
    struct CaptureLog {
        lines: Mutex<Vec<String>>,
    }

    static CAPTURE: CaptureLog = CaptureLog { lines: Mutex::new(Vec::new()) };

    impl Log for CaptureLog {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Debug
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                self.lines
                    .lock()
                    .unwrap()
                    .push(format!("{}|{}", record.target(), record.args()));
            }
        }

        fn flush(&self) {}
    }

    fn state_line(failed: bool) {
        match failed {
            true => svcguard_log!(Level::Error, "corrector", "{} failure(s)", 1),
            false => svcguard_log!(Level::Info, "corrector", "[OK] secured"),
        }
    }

    #[test]
    fn lines_carry_prefix_and_component_target() {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(LevelFilter::Debug);

        svcguard_log!(Level::Warn, "corrector", "Everyone holds {}", "Modify");
        state_line(true);
        state_line(false);

        let lines = std::mem::take(&mut *CAPTURE.lines.lock().unwrap());
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert!(lines[0].starts_with("corrector|["), "{}", lines[0]);
        assert!(lines[0].contains("[WARN][corrector][pid="), "{}", lines[0]);
        assert!(lines[0].ends_with("Everyone holds Modify"), "{}", lines[0]);
        assert!(lines[1].contains("[ERROR][corrector]"), "{}", lines[1]);
        assert!(lines[2].ends_with("[OK] secured"), "{}", lines[2]);
    }
}
