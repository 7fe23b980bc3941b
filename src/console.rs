use std::{fmt, io::Write};

use tracing_subscriber::fmt::{writer::BoxMakeWriter, MakeWriter};

use crate::{
    error::{LogError, Result},
    level::{LogRecord, SeverityLevel},
};

/// `LEVEL message`形式で、ログをすぐに標準出力に書き込むシンク
pub struct ConsoleSink {
    min_level: SeverityLevel,
    make_writer: BoxMakeWriter,
}

impl ConsoleSink {
    /// 標準出力に書き込む`ConsoleSink`を作成する。
    pub fn new(min_level: SeverityLevel) -> Self {
        Self::with_writer(min_level, BoxMakeWriter::new(std::io::stdout))
    }

    /// 任意のライターに書き込む`ConsoleSink`を作成する。
    pub fn with_writer(min_level: SeverityLevel, make_writer: BoxMakeWriter) -> Self {
        Self {
            min_level,
            make_writer,
        }
    }

    pub fn setup(&mut self, min_level: SeverityLevel) {
        self.min_level = min_level;
    }

    pub fn write(&self, record: &LogRecord) -> Result<()> {
        if !record.is_admitted_by(self.min_level) {
            return Ok(());
        }

        let mut writer = self.make_writer.make_writer();
        writeln!(writer, "{} {}", record.level, record.message)
            .and_then(|_| writer.flush())
            .map_err(LogError::Console)
    }

    pub fn min_level(&self) -> SeverityLevel {
        self.min_level
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::*;

    /// 書き込まれた内容をメモリに保持するライター
    #[derive(Clone, Default)]
    pub(crate) struct Captured(pub Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        pub fn make_writer(&self) -> BoxMakeWriter {
            let captured = self.clone();
            BoxMakeWriter::new(move || captured.clone())
        }

        pub fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_write_formats_level_and_message() {
        let captured = Captured::default();
        let sink = ConsoleSink::with_writer(SeverityLevel::Info, captured.make_writer());

        sink.write(&LogRecord::new(SeverityLevel::Error, "disk full")).unwrap();

        assert_eq!("ERROR disk full\n", captured.contents());
    }

    #[test]
    fn test_setup_changes_threshold() {
        let captured = Captured::default();
        let mut sink = ConsoleSink::with_writer(SeverityLevel::Info, captured.make_writer());

        sink.write(&LogRecord::new(SeverityLevel::Debug, "x")).unwrap();
        sink.setup(SeverityLevel::Debug);
        sink.write(&LogRecord::new(SeverityLevel::Debug, "y")).unwrap();

        assert_eq!("DEBUG y\n", captured.contents());
    }
}
