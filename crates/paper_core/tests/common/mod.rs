//! In-memory stand-ins for every port the coordinator talks to.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

use paper_core::domain::{
    AccountDocument, Coordinates, Course, DocumentKind, DocumentSummary, Location, Meeting,
    Section, Weekdays,
};
use paper_core::ports::{
    AccountStore, Catalog, ExportFile, Exporter, LocalStorage, PortError, PortResult, UrlStore,
};
use paper_core::schedule::Schedule;
use paper_core::sync::SyncCoordinator;

// ===========================================================================
// Builders
// ===========================================================================

pub fn course(id: &str, units: f32) -> Course {
    Course {
        id: id.to_string(),
        name: format!("{} name", id),
        description: String::new(),
        prereqs: None,
        units,
        distros: None,
    }
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

pub fn meeting(room: Option<&str>, days: &[Weekday], start: (u32, u32), end: (u32, u32)) -> Meeting {
    Meeting {
        room: room.map(str::to_string),
        days: Weekdays::of(days),
        start: Some(time(start.0, start.1)),
        end: Some(time(end.0, end.1)),
    }
}

pub fn section(id: &str, subject: &str, meetings: Vec<Meeting>) -> Section {
    Section {
        section_id: id.to_string(),
        subject: subject.to_string(),
        number: "211-0".to_string(),
        section: "20".to_string(),
        component: "LEC".to_string(),
        title: format!("{} title", id),
        topic: None,
        meetings,
        start_date: NaiveDate::from_ymd_opt(2024, 9, 24),
        end_date: NaiveDate::from_ymd_opt(2024, 12, 7),
        instructors: Vec::new(),
        capacity: Some(40),
        enrollment_requirements: None,
        distros: None,
        descriptions: Vec::new(),
    }
}

// ===========================================================================
// Client-side ports
// ===========================================================================

#[derive(Default)]
pub struct MemoryUrl {
    value: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryUrl {
    pub fn with(value: &str) -> Self {
        Self {
            value: Mutex::new(Some(value.to_string())),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl UrlStore for MemoryUrl {
    fn read(&self) -> Option<String> {
        self.current()
    }

    fn replace(&self, encoded: &str) {
        *self.value.lock().unwrap() = Some(encoded.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    pub fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("quota exceeded".to_string()));
        }
        self.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub courses: HashMap<String, Course>,
    pub sections: HashMap<String, Section>,
    pub locations: HashMap<String, Location>,
    pub colors: HashMap<String, String>,
}

impl FakeCatalog {
    pub fn with_sections(sections: Vec<Section>) -> Self {
        Self {
            sections: sections
                .into_iter()
                .map(|s| (s.section_id.clone(), s))
                .collect(),
            ..Self::default()
        }
    }

    pub fn add_room(&mut self, room: &str, lat: f64, lon: f64) {
        self.locations.insert(
            room.to_string(),
            Location {
                coordinates: Coordinates { lat, lon },
                room_finder_url: Some(format!("https://rooms.example.edu/{}", room)),
            },
        );
    }
}

impl Catalog for FakeCatalog {
    fn course(&self, id: &str) -> Option<Course> {
        self.courses.get(id).cloned()
    }

    fn section(&self, section_id: &str) -> Option<Section> {
        self.sections.get(section_id).cloned()
    }

    fn location(&self, room: &str) -> Option<Location> {
        self.locations.get(room).cloned()
    }

    fn color(&self, subject: &str) -> Option<String> {
        self.colors.get(subject).cloned()
    }
}

// ===========================================================================
// Async ports
// ===========================================================================

#[derive(Default)]
pub struct FakeAccounts {
    documents: Mutex<HashMap<Uuid, AccountDocument>>,
    /// Delays applied to successive `save` calls, in call order.
    save_delays: Mutex<VecDeque<Duration>>,
    pub fail_saves: AtomicBool,
    pub saves: AtomicUsize,
}

impl FakeAccounts {
    pub fn seed(&self, kind: DocumentKind, name: &str, content: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.documents.lock().unwrap().insert(
            id,
            AccountDocument {
                id,
                kind,
                name: name.to_string(),
                content: content.to_string(),
                notes: Some(format!("{} notes", name)),
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub fn document(&self, id: Uuid) -> Option<AccountDocument> {
        self.documents.lock().unwrap().get(&id).cloned()
    }

    pub fn delay_saves(&self, delays: &[Duration]) {
        self.save_delays.lock().unwrap().extend(delays.iter().copied());
    }

    fn find(&self, kind: DocumentKind, id: Uuid) -> PortResult<AccountDocument> {
        self.documents
            .lock()
            .unwrap()
            .get(&id)
            .filter(|d| d.kind == kind)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("{} {}", kind, id)))
    }
}

#[async_trait]
impl AccountStore for FakeAccounts {
    async fn list(&self, kind: DocumentKind) -> PortResult<Vec<DocumentSummary>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.kind == kind)
            .map(AccountDocument::summary)
            .collect())
    }

    async fn name(&self, kind: DocumentKind, id: Uuid) -> PortResult<Option<String>> {
        Ok(self.find(kind, id).ok().map(|d| d.name))
    }

    async fn load(&self, kind: DocumentKind, id: Uuid) -> PortResult<AccountDocument> {
        self.find(kind, id)
    }

    async fn create(
        &self,
        kind: DocumentKind,
        name: &str,
        content: &str,
    ) -> PortResult<AccountDocument> {
        let id = self.seed(kind, name, content);
        let mut document = self.find(kind, id)?;
        document.notes = None;
        self.documents.lock().unwrap().insert(id, document.clone());
        Ok(document)
    }

    async fn save(&self, document: &AccountDocument) -> PortResult<()> {
        let delay = self.save_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("network unreachable".to_string()));
        }
        self.find(document.kind, document.id)?;
        self.documents
            .lock()
            .unwrap()
            .insert(document.id, document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, kind: DocumentKind, id: Uuid) -> PortResult<()> {
        self.find(kind, id)?;
        self.documents.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeExporter {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

#[async_trait]
impl Exporter for FakeExporter {
    async fn export_calendar(&self, sections: &[Section]) -> PortResult<ExportFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ExportFile {
            file_name: "schedule.ics".to_string(),
            mime_type: "text/calendar".to_string(),
            bytes: sections
                .iter()
                .map(|s| s.section_id.as_str())
                .collect::<Vec<_>>()
                .join("\n")
                .into_bytes(),
        })
    }

    async fn export_image(&self, schedule: &Schedule) -> PortResult<ExportFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ExportFile {
            file_name: "schedule.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0; schedule.len()],
        })
    }
}

// ===========================================================================
// Harness
// ===========================================================================

pub struct Harness {
    pub url: Arc<MemoryUrl>,
    pub storage: Arc<MemoryStorage>,
    pub accounts: Arc<FakeAccounts>,
    pub exporter: Arc<FakeExporter>,
    pub coordinator: SyncCoordinator,
}

impl Harness {
    pub fn new(url: MemoryUrl, storage: MemoryStorage, catalog: FakeCatalog) -> Self {
        Self::with_exporter(url, storage, catalog, FakeExporter::default())
    }

    pub fn with_exporter(
        url: MemoryUrl,
        storage: MemoryStorage,
        catalog: FakeCatalog,
        exporter: FakeExporter,
    ) -> Self {
        let url = Arc::new(url);
        let storage = Arc::new(storage);
        let accounts = Arc::new(FakeAccounts::default());
        let exporter = Arc::new(exporter);
        let coordinator = SyncCoordinator::new(
            url.clone(),
            storage.clone(),
            accounts.clone(),
            Arc::new(catalog),
            exporter.clone(),
        );
        Self {
            url,
            storage,
            accounts,
            exporter,
            coordinator,
        }
    }

    pub fn empty() -> Self {
        Self::new(MemoryUrl::default(), MemoryStorage::default(), FakeCatalog::default())
    }
}
