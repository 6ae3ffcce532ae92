use crate::*;
use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider answering from a fixed family table; listed families fail instead.
pub(crate) struct ScriptedProvider {
    pub name: &'static str,
    pub families: Vec<(&'static str, Vec<FontFaceData>)>,
    pub failing: Vec<&'static str>,
    pub fallbacks: Option<Vec<String>>,
    pub calls: AtomicUsize,
    pub setups: AtomicUsize,
    pub seen: Mutex<Vec<(String, ResolveFontFacesOptions)>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            families: Vec::new(),
            failing: Vec::new(),
            fallbacks: None,
            calls: AtomicUsize::new(0),
            setups: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_family(mut self, family: &'static str, url: &str) -> Self {
        self.families
            .push((family, vec![FontFaceData::new(FontSource::from(url))]));
        self
    }

    pub fn failing(mut self, family: &'static str) -> Self {
        self.failing.push(family);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, ResolveFontFacesOptions)> {
        self.seen.lock().unwrap().clone()
    }
}

impl FontProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn setup<'a>(&'a self, _options: &'a FontOptions) -> BoxFuture<'a, Result<()>> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        Box::pin(futures::future::ready(Ok(())))
    }

    fn resolve_font_faces<'a>(
        &'a self,
        family: &'a str,
        options: &'a ResolveFontFacesOptions,
    ) -> BoxFuture<'a, Result<Option<ProviderResolution>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((family.to_string(), options.clone()));
        let result = if self.failing.contains(&family) {
            Err(Error::Provider {
                provider: self.name.to_string(),
                message: format!("catalog lookup for {family} failed"),
            })
        } else {
            Ok(self
                .families
                .iter()
                .find(|(name, _)| *name == family)
                .map(|(_, fonts)| ProviderResolution {
                    fonts: fonts.clone(),
                    fallbacks: self.fallbacks.clone(),
                }))
        };
        Box::pin(futures::future::ready(result))
    }
}

/// Fetcher serving `bytes:<url>` and counting every call.
#[derive(Default)]
pub(crate) struct CountingFetcher {
    pub calls: AtomicUsize,
    pub failing: Vec<String>,
    /// Number of leading calls that fail regardless of the url.
    pub fail_first: AtomicUsize,
}

impl CountingFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FontFetcher for CountingFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let flaky = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Box::pin(async move {
            YieldNow(false).await;
            if flaky || self.failing.iter().any(|u| u == url) {
                return Err(Error::Fetch {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(format!("bytes:{url}").into_bytes())
        })
    }
}

pub(crate) fn remote_face(url: &str) -> FontFaceData {
    FontFaceData::new(FontSource::from(url))
}

/// Suspends once so concurrently joined futures interleave.
pub(crate) struct YieldNow(pub bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber recording `warn` and above; returns `f`'s value and the log text.
pub(crate) fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .without_time()
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(
        &buffer.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
    )
    .into_owned();
    (value, logs)
}
