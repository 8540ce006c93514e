//! PDF engine: the seam between the extractor and the PDF library.
//!
//! The extractor only sees two blocking traits, [`PdfBackend`] (open a
//! document from bytes) and [`LoadedPdf`] (count pages, read one page's text).
//! Tests plug in fakes; production uses [`PdfiumBackend`].
//!
//! ## One engine thread
//!
//! pdfium keeps global state and must not be driven from several threads at
//! once. [`PdfiumBackend::start`] binds the library once, on a dedicated
//! thread that owns every open document, and all calls travel to it over a
//! channel. Callers block on the reply, so they must run inside
//! `spawn_blocking`. A page that timed out keeps running on the engine thread
//! and later commands queue behind it. The engine acknowledges each page
//! command when it starts working on it, so the extractor's page clock
//! measures the page itself and not the time spent waiting in the queue.

use crate::error::Pdf2CardsError;
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use tracing::{debug, info, warn};

/// Opens PDF documents. All methods block.
pub trait PdfBackend: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &str;

    /// Parse a document from raw bytes.
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn LoadedPdf>, Pdf2CardsError>;

    /// `Ok` when documents can be opened, otherwise the reason they cannot.
    fn probe(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A parsed document. All methods block.
pub trait LoadedPdf: Send + Sync {
    fn page_count(&self) -> usize;

    /// Plain text of the page at 0-based `index`.
    fn page_text(&self, index: usize) -> Result<String, String>;

    /// Like [`LoadedPdf::page_text`], calling `on_start` once the backend
    /// actually begins on the page. Backends that queue work override this.
    fn page_text_with_start(
        &self,
        index: usize,
        on_start: &mut dyn FnMut(),
    ) -> Result<String, String> {
        on_start();
        self.page_text(index)
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

type DocumentId = u64;

enum EngineCommand {
    Open {
        bytes: Vec<u8>,
        reply: SyncSender<Result<(DocumentId, usize), String>>,
    },
    PageText {
        document: DocumentId,
        index: usize,
        started: SyncSender<()>,
        reply: SyncSender<Result<String, String>>,
    },
    Close {
        document: DocumentId,
    },
}

enum EngineState {
    Running(Sender<EngineCommand>),
    Unavailable(String),
}

/// [`PdfBackend`] backed by pdfium, running on its own thread.
pub struct PdfiumBackend {
    state: EngineState,
}

impl PdfiumBackend {
    /// Start the engine thread and bind pdfium.
    ///
    /// Library lookup order: `library_path` (a file, or a directory holding
    /// the platform library), the working directory, the system library.
    /// A failed bind does not fail here: the backend reports itself
    /// unavailable and every `open` returns
    /// [`Pdf2CardsError::EngineUnavailable`].
    pub fn start(library_path: Option<PathBuf>) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let spawned = std::thread::Builder::new()
            .name("pdfium-engine".into())
            .spawn(move || run_engine(library_path, ready_tx, commands_rx));

        let state = match spawned {
            Err(e) => EngineState::Unavailable(format!("could not start engine thread: {e}")),
            Ok(_) => match ready_rx.recv() {
                Ok(Ok(())) => EngineState::Running(commands_tx),
                Ok(Err(reason)) => EngineState::Unavailable(reason),
                Err(_) => EngineState::Unavailable("engine thread exited during startup".into()),
            },
        };

        match &state {
            EngineState::Running(_) => info!("pdfium engine ready"),
            EngineState::Unavailable(reason) => warn!("pdfium unavailable: {}", reason),
        }

        Self { state }
    }

    fn commands(&self) -> Result<&Sender<EngineCommand>, Pdf2CardsError> {
        match &self.state {
            EngineState::Running(tx) => Ok(tx),
            EngineState::Unavailable(reason) => {
                Err(Pdf2CardsError::EngineUnavailable(reason.clone()))
            }
        }
    }
}

impl PdfBackend for PdfiumBackend {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn LoadedPdf>, Pdf2CardsError> {
        let commands = self.commands()?;
        let (reply, answer) = mpsc::sync_channel(1);
        commands
            .send(EngineCommand::Open { bytes, reply })
            .map_err(|_| engine_stopped())?;

        let (id, page_count) = answer
            .recv()
            .map_err(|_| engine_stopped())?
            .map_err(|detail| Pdf2CardsError::ExtractionFailed { detail })?;

        Ok(Box::new(PdfiumDocument {
            id,
            page_count,
            commands: commands.clone(),
        }))
    }

    fn probe(&self) -> Result<(), String> {
        match &self.state {
            EngineState::Running(_) => Ok(()),
            EngineState::Unavailable(reason) => Err(reason.clone()),
        }
    }
}

fn engine_stopped() -> Pdf2CardsError {
    Pdf2CardsError::EngineUnavailable("PDF engine thread stopped".into())
}

/// Handle to a document held by the engine thread. Closed on drop.
struct PdfiumDocument {
    id: DocumentId,
    page_count: usize,
    commands: Sender<EngineCommand>,
}

impl LoadedPdf for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        self.page_text_with_start(index, &mut || {})
    }

    fn page_text_with_start(
        &self,
        index: usize,
        on_start: &mut dyn FnMut(),
    ) -> Result<String, String> {
        let (started, ack) = mpsc::sync_channel(1);
        let (reply, answer) = mpsc::sync_channel(1);
        self.commands
            .send(EngineCommand::PageText {
                document: self.id,
                index,
                started,
                reply,
            })
            .map_err(|_| "PDF engine thread stopped".to_string())?;

        ack.recv()
            .map_err(|_| "PDF engine thread stopped".to_string())?;
        on_start();

        answer
            .recv()
            .map_err(|_| "PDF engine thread stopped".to_string())?
    }
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        let _ = self.commands.send(EngineCommand::Close { document: self.id });
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match library_path {
        Some(path) => {
            let path = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(path)
            } else {
                path.to_path_buf()
            };
            Pdfium::bind_to_library(&path)
                .map_err(|e| format!("cannot load {}: {e}", path.display()))?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| format!("pdfium library not found: {e}"))?,
    };
    Ok(Pdfium::new(bindings))
}

fn run_engine(
    library_path: Option<PathBuf>,
    ready: SyncSender<Result<(), String>>,
    commands: Receiver<EngineCommand>,
) {
    let pdfium = match bind_pdfium(library_path.as_deref()) {
        Ok(pdfium) => {
            let _ = ready.send(Ok(()));
            pdfium
        }
        Err(reason) => {
            let _ = ready.send(Err(reason));
            return;
        }
    };

    let mut documents: HashMap<DocumentId, PdfDocument<'_>> = HashMap::new();
    let mut next_id: DocumentId = 0;

    // Ends once every sender (backend and document handles) is dropped.
    for command in commands {
        match command {
            EngineCommand::Open { bytes, reply } => {
                let outcome = pdfium
                    .load_pdf_from_byte_vec(bytes, None)
                    .map_err(|e| e.to_string())
                    .map(|document| {
                        next_id += 1;
                        let page_count = document.pages().len() as usize;
                        documents.insert(next_id, document);
                        debug!("engine: opened document {} ({} pages)", next_id, page_count);
                        (next_id, page_count)
                    });
                let _ = reply.send(outcome);
            }
            EngineCommand::PageText {
                document,
                index,
                started,
                reply,
            } => {
                let _ = started.send(());
                let outcome = match documents.get(&document) {
                    Some(doc) => read_page_text(doc, index),
                    None => Err(format!("document {document} is not open")),
                };
                let _ = reply.send(outcome);
            }
            EngineCommand::Close { document } => {
                documents.remove(&document);
                debug!("engine: closed document {}", document);
            }
        }
    }
}

fn read_page_text(document: &PdfDocument<'_>, index: usize) -> Result<String, String> {
    let index = u16::try_from(index).map_err(|_| format!("page index {index} out of range"))?;
    let page = document.pages().get(index).map_err(|e| e.to_string())?;
    let text = page.text().map_err(|e| e.to_string())?;
    Ok(text.all())
}
