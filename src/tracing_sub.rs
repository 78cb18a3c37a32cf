use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;

use crate::debug_log::{DebugLogWriter, global_debug_log};

pub struct DelegatingWriter {
    inner: DelegatingInner,
}

enum DelegatingInner {
    File(Arc<File>),
    Debug(DebugLogWriter),
    Stderr(io::Stderr),
}

impl DelegatingWriter {
    fn new(file: Option<&Arc<File>>) -> Self {
        let inner = if let Some(file) = file {
            DelegatingInner::File(Arc::clone(file))
        } else if let Some(handle) = global_debug_log() {
            DelegatingInner::Debug(handle.writer())
        } else {
            DelegatingInner::Stderr(io::stderr())
        };
        DelegatingWriter { inner }
    }
}

impl Write for DelegatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            DelegatingInner::File(f) => (&**f).write(buf),
            DelegatingInner::Debug(w) => w.write(buf),
            DelegatingInner::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            DelegatingInner::File(f) => (&**f).flush(),
            DelegatingInner::Debug(w) => w.flush(),
            DelegatingInner::Stderr(s) => s.flush(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SubscriberMakeWriter {
    file: Option<Arc<File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DelegatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DelegatingWriter::new(self.file.as_ref())
    }
}

/// Initialize the tracing subscriber. Output goes to `log_file` when given,
/// else to the global debug log buffer when one is installed, else to
/// stderr. Safe to call multiple times; later calls leave the global
/// subscriber as it is.
pub fn init_default(log_file: Option<&Path>) -> io::Result<()> {
    let file = log_file
        .map(|path| OpenOptions::new().create(true).append(true).open(path))
        .transpose()?
        .map(Arc::new);
    let ansi = file.is_none() && global_debug_log().is_none();
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(SubscriberMakeWriter { file })
        .with_target(false)
        .with_thread_names(false)
        .with_ansi(ansi)
        .try_init();
    Ok(())
}
