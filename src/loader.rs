//! Document/file orchestration
//!
//! A [`Loader`] drives one load session: it parses the root document,
//! then every document referenced from it, runs the post-pass over
//! whatever could not be resolved while reading, and tells the writer how
//! it ended. Each call starts from a fresh registry and store, so one
//! session never sees ids or objects of another.
//!
//! # Example
//!
//! ```no_run
//! use collada_loader::{DocumentCollector, ErrorCollector, Loader, LoaderConfig};
//!
//! let mut loader = Loader::new(LoaderConfig::new());
//! let mut document = DocumentCollector::new();
//! let mut errors = ErrorCollector::new();
//! if loader.load_document("scene.dae", &mut document, &mut errors) {
//!     println!("{} geometries", document.geometries.len());
//! }
//! ```

use crate::config::LoaderConfig;
use crate::error::{Error, ErrorHandler, Result, Severity};
use crate::model::FileId;
use crate::parser::{Dispatcher, LoadContext};
use crate::post_process;
use crate::registry::path_to_uri;
use crate::sax::parse_reader;
use crate::writer::Writer;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use url::Url;

#[cfg(feature = "zae")]
use crate::archive::{Archive, archive_base, is_archive_path};

/// Where a [`Loader`] stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet
    Init,
    /// Reading a document
    Parsing(FileId),
    /// Resolving deferred references
    PostResolving,
    /// Last load succeeded
    Done,
    /// Last load failed
    Failed,
}

/// Where documents of a session are read from
enum Documents {
    /// Plain files
    Files,
    /// Entries of an archive, addressed below `base`; other URIs are files
    #[cfg(feature = "zae")]
    Archive { base: Url, archive: Archive<File> },
}

impl Documents {
    fn open(&mut self, uri: &Url) -> Result<Box<dyn BufRead>> {
        #[cfg(feature = "zae")]
        if let Documents::Archive { base, archive } = self
            && let Some(content) = archive.read_document(base, uri)
        {
            return Ok(Box::new(std::io::Cursor::new(content?)));
        }

        if uri.scheme() != "file" {
            return Err(Error::Unsupported(format!("cannot read documents from '{}'", uri)));
        }
        let path = uri
            .to_file_path()
            .map_err(|_| Error::InvalidUri(format!("'{}' is not a local path", uri)))?;
        let file = File::open(&path)
            .map_err(|err| Error::MissingFile(format!("{}: {}", path.display(), err)))?;
        tracing::debug!(path = %path.display(), "opened document");
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Loads COLLADA documents into a [`Writer`]
#[derive(Debug)]
pub struct Loader {
    config: LoaderConfig,
    state: LoadState,
}

impl Loader {
    /// Create a loader
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            state: LoadState::Init,
        }
    }

    /// The configuration every load uses
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// State of the last (or current) load
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Load a `.dae` document, or a `.zae` archive, and what it references
    ///
    /// Returns `false` if loading failed; the writer's `cancel` has been
    /// called then, and every problem went to `handler`.
    pub fn load_document(
        &mut self,
        path: impl AsRef<Path>,
        writer: &mut dyn Writer,
        handler: &mut dyn ErrorHandler,
    ) -> bool {
        let path = path.as_ref();
        let config = self.config.clone();
        let mut ctx = LoadContext::new(&config, writer, handler);

        let opened = path_to_uri(path).and_then(|uri| open_root(path, uri));
        let (root_uri, mut documents) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                ctx.report(Severity::Critical, &err);
                // Every session the writer sees opens with `start`
                let _ = ctx.writer.start();
                return self.fail(&mut ctx, &err);
            }
        };
        let root = ctx.registry.get_or_create_file_id(&root_uri);
        self.run(&mut ctx, root, None, &mut documents)
    }

    /// Load a document from a reader
    ///
    /// `base_uri` is the document's own URI; relative references in it
    /// are resolved against it.
    pub fn load_from_reader<R: BufRead + 'static>(
        &mut self,
        reader: R,
        base_uri: &Url,
        writer: &mut dyn Writer,
        handler: &mut dyn ErrorHandler,
    ) -> bool {
        let config = self.config.clone();
        let mut ctx = LoadContext::new(&config, writer, handler);
        let root = ctx.registry.get_or_create_file_id(base_uri);
        self.run(&mut ctx, root, Some(Box::new(reader)), &mut Documents::Files)
    }

    fn run(
        &mut self,
        ctx: &mut LoadContext<'_>,
        root: FileId,
        root_reader: Option<Box<dyn BufRead>>,
        documents: &mut Documents,
    ) -> bool {
        self.state = LoadState::Init;
        if !ctx.writer.start() {
            return self.writer_failed(ctx, "start");
        }

        if let Err(err) = self.parse_document(ctx, root, true, root_reader, documents) {
            return self.fail(ctx, &err);
        }
        while let Some(file_id) = ctx.next_pending_file() {
            if let Err(err) = self.parse_document(ctx, file_id, false, None, documents) {
                return self.fail(ctx, &err);
            }
        }

        self.state = LoadState::PostResolving;
        tracing::debug!("resolving deferred references");
        if let Err(err) = post_process::run(ctx) {
            if let Error::WriterFailed(_) = err {
                ctx.report(Severity::Critical, &err);
            }
            return self.fail(ctx, &err);
        }

        if !ctx.writer.finish() {
            return self.writer_failed(ctx, "finish");
        }
        self.state = LoadState::Done;
        tracing::info!(
            documents = ctx.registry.file_count(),
            objects = ctx.objects_written,
            "loaded COLLADA document"
        );
        true
    }

    /// Parse one document of the session
    ///
    /// A document that cannot be opened fails the load if it is the root;
    /// a referenced one is reported and skipped unless the handler says
    /// stop.
    fn parse_document(
        &mut self,
        ctx: &mut LoadContext<'_>,
        file_id: FileId,
        is_root: bool,
        reader: Option<Box<dyn BufRead>>,
        documents: &mut Documents,
    ) -> Result<()> {
        self.state = LoadState::Parsing(file_id);
        ctx.begin_file(file_id, is_root);
        let uri = ctx
            .registry
            .file_uri(file_id)
            .cloned()
            .ok_or_else(|| Error::InvalidUri(format!("unknown document {}", file_id)))?;
        tracing::debug!(%uri, is_root, "parsing document");

        let reader = match reader {
            Some(reader) => reader,
            None => match documents.open(&uri) {
                Ok(reader) => reader,
                Err(err) if is_root => {
                    ctx.report(Severity::Critical, &err);
                    return Err(err);
                }
                Err(err) => {
                    return ctx.report_or_abort(Severity::Error, &err);
                }
            },
        };
        ctx.mark_loaded();

        let mut dispatcher = Dispatcher::new(ctx);
        parse_reader(reader, &mut dispatcher);
        match dispatcher.finish() {
            Some(err) => Err(err),
            None => {
                tracing::debug!(%uri, "finished document");
                Ok(())
            }
        }
    }

    /// A writer call outside the element parsers returned `false`
    fn writer_failed(&mut self, ctx: &mut LoadContext<'_>, call: &str) -> bool {
        let err = Error::WriterFailed(call.to_string());
        ctx.report(Severity::Critical, &err);
        self.fail(ctx, &err)
    }

    fn fail(&mut self, ctx: &mut LoadContext<'_>, err: &Error) -> bool {
        self.state = LoadState::Failed;
        tracing::debug!(%err, "load failed");
        ctx.writer.cancel(&err.to_string());
        false
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// URI of the root document and the source of every document
fn open_root(path: &Path, uri: Url) -> Result<(Url, Documents)> {
    #[cfg(feature = "zae")]
    if is_archive_path(path) {
        let file = File::open(path)
            .map_err(|err| Error::MissingFile(format!("{}: {}", path.display(), err)))?;
        let mut archive = Archive::open(file)?;
        let base = archive_base(&uri)?;
        let root = base.join(&archive.root_document()?)?;
        tracing::debug!(%root, "archive root document");
        return Ok((root, Documents::Archive { base, archive }));
    }
    #[cfg(not(feature = "zae"))]
    let _ = path;
    Ok((uri, Documents::Files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCollector;
    use crate::writer::DocumentCollector;

    const MINIMAL: &str = r#"<COLLADA version="1.5.0"><asset><up_axis>Z_UP</up_axis></asset></COLLADA>"#;

    fn base() -> Url {
        Url::parse("file:///memory/doc.dae").unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let mut loader = Loader::default();
        assert_eq!(loader.state(), LoadState::Init);
        let mut writer = DocumentCollector::new();
        let mut errors = ErrorCollector::new();
        assert!(loader.load_from_reader(MINIMAL.as_bytes(), &base(), &mut writer, &mut errors));
        assert_eq!(loader.state(), LoadState::Done);
        assert!(writer.finished);

        let mut writer = DocumentCollector::new();
        assert!(!loader.load_from_reader("<COLLADA>".as_bytes(), &base(), &mut writer, &mut errors));
        assert_eq!(loader.state(), LoadState::Failed);
        assert!(writer.cancelled.is_some());
        assert!(!writer.finished);
    }

    #[test]
    fn test_missing_root_file() {
        let mut loader = Loader::default();
        let mut writer = DocumentCollector::new();
        let mut errors = ErrorCollector::new();
        assert!(!loader.load_document("/nonexistent/scene.dae", &mut writer, &mut errors));
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].severity, Severity::Critical);
        assert!(writer.cancelled.is_some());
    }

    #[test]
    fn test_writer_refusing_start() {
        struct Refuse;
        impl Writer for Refuse {
            fn start(&mut self) -> bool {
                false
            }
        }
        let mut loader = Loader::default();
        let mut errors = ErrorCollector::new();
        assert!(!loader.load_from_reader(MINIMAL.as_bytes(), &base(), &mut Refuse, &mut errors));
        assert_eq!(loader.state(), LoadState::Failed);
    }
}
