//! Convenience types handed out instead of substitutes outside strict mode:
//! an in-memory file system and an HTTP client answering from a fake
//! transport.
//!
//! The shared instances belong to one session and are configured through
//! [`MockerBuilder`](crate::MockerBuilder).

use crate::catalog::Catalog;
use crate::helpers::{AnyRef, Named, TypeKey};
use futures::future::{self, BoxFuture, FutureExt};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileSystemError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("file is not valid UTF-8: {}", .0.display())]
    InvalidUtf8(PathBuf),
}

/// File system access code under test can depend on.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: PathBuf) -> bool;
    fn read(&self, path: PathBuf) -> Result<Vec<u8>, FileSystemError>;
    fn read_to_string(&self, path: PathBuf) -> Result<String, FileSystemError>;
    fn write(&self, path: PathBuf, contents: Vec<u8>) -> Result<(), FileSystemError>;
    fn remove(&self, path: PathBuf) -> Result<(), FileSystemError>;
    fn list(&self, dir: PathBuf) -> Vec<PathBuf>;
}

crate::substitute! {
    pub struct FileSystemSubstitute for dyn FileSystem {
        fn exists(&self, path: PathBuf) -> bool;
        fn read(&self, path: PathBuf) -> Result<Vec<u8>, FileSystemError> = Ok(Vec::new());
        fn read_to_string(&self, path: PathBuf) -> Result<String, FileSystemError> = Ok(String::new());
        fn write(&self, path: PathBuf, contents: Vec<u8>) -> Result<(), FileSystemError> = Ok(());
        fn remove(&self, path: PathBuf) -> Result<(), FileSystemError> = Ok(());
        fn list(&self, dir: PathBuf) -> Vec<PathBuf>;
    }
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        MemoryFileSystem::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> &Self {
        lock(&self.files).insert(path.into(), contents.into());
        self
    }

    pub fn files(&self) -> Vec<PathBuf> {
        lock(&self.files).keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: PathBuf) -> bool {
        lock(&self.files).contains_key(&path)
    }

    fn read(&self, path: PathBuf) -> Result<Vec<u8>, FileSystemError> {
        lock(&self.files)
            .get(&path)
            .cloned()
            .ok_or(FileSystemError::NotFound(path))
    }

    fn read_to_string(&self, path: PathBuf) -> Result<String, FileSystemError> {
        let contents = self.read(path.clone())?;
        String::from_utf8(contents).map_err(|_| FileSystemError::InvalidUtf8(path))
    }

    fn write(&self, path: PathBuf, contents: Vec<u8>) -> Result<(), FileSystemError> {
        lock(&self.files).insert(path, contents);
        Ok(())
    }

    fn remove(&self, path: PathBuf) -> Result<(), FileSystemError> {
        match lock(&self.files).remove(&path) {
            Some(_) => Ok(()),
            None => Err(FileSystemError::NotFound(path)),
        }
    }

    fn list(&self, dir: PathBuf) -> Vec<PathBuf> {
        lock(&self.files)
            .keys()
            .filter(|path| path.parent() == Some(dir.as_path()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        HttpResponse::new(200)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("no response configured for {method} {url}")]
    NoRoute { method: Method, url: String },
    #[error("transport: {0}")]
    Transport(String),
}

pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

crate::substitute! {
    pub struct HttpTransportSubstitute for dyn HttpTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> = Ok(HttpResponse::ok());
    }
}

struct Route {
    method: Method,
    url: String,
    response: HttpResponse,
}

/// An in-process transport answering from configured routes.
///
/// Unknown routes get the fallback response, `200 OK` with an empty body
/// unless changed with [`FakeTransport::set_fallback`].
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        FakeTransport::new()
    }
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("routes", &lock(&self.routes).len())
            .field("requests", &lock(&self.requests).len())
            .finish()
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport {
            routes: Mutex::new(Vec::new()),
            fallback: Mutex::new(Some(HttpResponse::ok())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `method url` with `response`. Later routes win.
    pub fn respond(&self, method: Method, url: impl Into<String>, response: HttpResponse) -> &Self {
        lock(&self.routes).push(Route {
            method,
            url: url.into(),
            response,
        });
        self
    }

    /// Sets the response for unknown routes; `None` makes them fail.
    pub fn set_fallback(&self, response: Option<HttpResponse>) -> &Self {
        *lock(&self.fallback) = response;
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }
}

impl HttpTransport for FakeTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        lock(&self.requests).push(request.clone());

        let routed = lock(&self.routes)
            .iter()
            .rev()
            .find(|route| route.method == request.method && route.url == request.url)
            .map(|route| route.response.clone());

        match routed.or_else(|| lock(&self.fallback).clone()) {
            Some(response) => Ok(response),
            None => Err(HttpError::NoRoute {
                method: request.method,
                url: request.url,
            }),
        }
    }
}

/// An HTTP client whose calls complete immediately through its transport.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Option<String>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        HttpClient {
            transport,
            base_url: None,
        }
    }

    /// Prefixes relative request URLs with `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn send(&self, mut request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, HttpError>> {
        if let Some(base_url) = &self.base_url {
            if !request.url.contains("://") {
                request.url = format!("{}/{}", base_url.trim_end_matches('/'), request.url.trim_start_matches('/'));
            }
        }
        future::ready(self.transport.send(request)).boxed()
    }

    pub fn get(&self, url: impl Into<String>) -> BoxFuture<'static, Result<HttpResponse, HttpError>> {
        self.send(HttpRequest::new(Method::Get, url))
    }

    pub fn post(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> BoxFuture<'static, Result<HttpResponse, HttpError>> {
        self.send(HttpRequest::new(Method::Post, url).body(body))
    }

    pub fn delete(&self, url: impl Into<String>) -> BoxFuture<'static, Result<HttpResponse, HttpError>> {
        self.send(HttpRequest::new(Method::Delete, url))
    }
}

/// Adds the convenience types to a catalog so they stay resolvable, as
/// substitutes or built instances, when conveniences are bypassed.
pub(crate) fn register(catalog: &mut Catalog) {
    catalog
        .interface::<dyn FileSystem>()
        .interface::<dyn HttpTransport>();

    catalog
        .class::<MemoryFileSystem>()
        .constructor(|()| MemoryFileSystem::new())
        .implements::<dyn FileSystem, _>(|fs| fs as Arc<dyn FileSystem>);

    catalog
        .class::<FakeTransport>()
        .constructor(|()| FakeTransport::new())
        .implements::<dyn HttpTransport, _>(|transport| transport as Arc<dyn HttpTransport>);

    catalog
        .class::<HttpClient>()
        .constructor(|(transport,): (Arc<dyn HttpTransport>,)| HttpClient::new(transport));
}

pub(crate) struct WellKnown {
    instances: BTreeMap<TypeId, Named<AnyRef>>,
    file_system: Arc<MemoryFileSystem>,
    transport: Arc<FakeTransport>,
}

impl WellKnown {
    pub fn new(
        enabled: bool,
        file_system: Arc<MemoryFileSystem>,
        transport: Arc<FakeTransport>,
        extra: Vec<(TypeKey, AnyRef)>,
    ) -> Self {
        let mut well_known = WellKnown {
            instances: BTreeMap::new(),
            file_system,
            transport,
        };
        if enabled {
            let file_system: Arc<dyn FileSystem> = well_known.file_system.clone();
            let transport: Arc<dyn HttpTransport> = well_known.transport.clone();
            let client = Arc::new(HttpClient::new(transport.clone()));
            well_known.insert(TypeKey::of::<Arc<dyn FileSystem>>(), Arc::new(file_system));
            well_known.insert(TypeKey::of::<Arc<dyn HttpTransport>>(), Arc::new(transport));
            well_known.insert(TypeKey::of::<Arc<HttpClient>>(), Arc::new(client));
        }
        for (key, value) in extra {
            well_known.insert(key, value);
        }
        well_known
    }

    fn insert(&mut self, key: TypeKey, value: AnyRef) {
        self.instances.insert(key.id, key.named(value));
    }

    pub fn get(&self, key: &TypeKey) -> Option<AnyRef> {
        self.instances.get(&key.id).map(|named| named.value.clone())
    }

    pub fn file_system(&self) -> Arc<MemoryFileSystem> {
        self.file_system.clone()
    }

    pub fn transport(&self) -> Arc<FakeTransport> {
        self.transport.clone()
    }
}
